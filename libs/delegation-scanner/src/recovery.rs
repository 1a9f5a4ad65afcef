//! Authority recovery for set-code authorizations
//!
//! The signed message of an authorization is
//! `keccak256(0x05 || rlp([chain_id, address, nonce]))`. The signer recovered
//! from that digest is the authority: the account whose code gets delegated.
//!
//! Recovery runs through a fixed chain of attempts:
//! 1. canonical digest with the supplied recovery id (`v`, or `yParity` as 27/28)
//! 2. digest without the magic byte, recovery id defaulting to 27
//! 3. the caller attributes the authorization to the transaction sender
//!
//! Only the first step is part of the signing scheme. The outcome of every step
//! is tagged with an [`AuthoritySource`] so consumers can tell them apart.

use crate::error::ChainError;
use crate::types::{Authorization, AuthoritySource};
use alloy_primitives::{keccak256, Address, Signature, B256, U256};
use alloy_rlp::RlpEncodable;

/// Leading byte of the authorization signing payload
pub const AUTHORIZATION_MAGIC: u8 = 0x05;

/// Recovery id assumed by the unprefixed attempt when none was supplied
const DEFAULT_RECOVERY_V: u64 = 27;

#[derive(RlpEncodable)]
struct AuthorizationTuple {
    chain_id: U256,
    address: Address,
    nonce: u64,
}

/// RLP encoding of `[chain_id, address, nonce]`.
///
/// Integers use minimal big-endian encoding, so a zero nonce or chain id is the
/// empty string (`0x80`), never a zero byte.
pub fn encode_authorization_tuple(chain_id: U256, address: Address, nonce: u64) -> Vec<u8> {
    alloy_rlp::encode(AuthorizationTuple {
        chain_id,
        address,
        nonce,
    })
}

/// Canonical signing digest: `keccak256(0x05 || rlp)`.
pub fn authorization_digest(chain_id: U256, address: Address, nonce: u64) -> B256 {
    prefixed_digest(&encode_authorization_tuple(chain_id, address, nonce))
}

fn prefixed_digest(encoded: &[u8]) -> B256 {
    let mut payload = Vec::with_capacity(encoded.len() + 1);
    payload.push(AUTHORIZATION_MAGIC);
    payload.extend_from_slice(encoded);
    keccak256(&payload)
}

/// Map a recovery parameter onto the y-parity bit.
///
/// Accepts raw parity (0/1), the legacy 27/28 form and EIP-155 style values.
pub fn parity_from_v(v: u64) -> Option<bool> {
    match v {
        0 | 27 => Some(false),
        1 | 28 => Some(true),
        v if v >= 35 => Some((v - 35) % 2 == 1),
        _ => None,
    }
}

/// Recover the signer address of `digest` from `(r, s, v)`.
pub fn recover_signer(digest: B256, r: U256, s: U256, v: u64) -> Result<Address, ChainError> {
    let parity = parity_from_v(v)
        .ok_or_else(|| ChainError::Recovery(format!("unusable recovery id {}", v)))?;

    Signature::new(r, s, parity)
        .recover_address_from_prehash(&digest)
        .map_err(|e| ChainError::Recovery(e.to_string()))
}

/// Outcome of a successful recovery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveredAuthority {
    pub address: Address,
    pub source: AuthoritySource,
}

/// Recover the authority of one authorization.
///
/// `fallback_chain_id` is used when the entry carries no chain id. Returns
/// `None` when neither digest yields a signer.
pub fn recover_authority(
    authorization: &Authorization,
    fallback_chain_id: u64,
) -> Option<RecoveredAuthority> {
    let chain_id = authorization
        .chain_id
        .unwrap_or(U256::from(fallback_chain_id));
    let encoded =
        encode_authorization_tuple(chain_id, authorization.address, authorization.nonce);
    let signature = &authorization.signature;

    if let Some(v) = signature.v {
        match recover_signer(prefixed_digest(&encoded), signature.r, signature.s, v) {
            Ok(address) => {
                return Some(RecoveredAuthority {
                    address,
                    source: AuthoritySource::Signature,
                })
            }
            Err(e) => {
                tracing::debug!(error = %e, chain_id = %chain_id, "Canonical authority recovery failed");
            }
        }
    }

    let v = signature.v.unwrap_or(DEFAULT_RECOVERY_V);
    match recover_signer(keccak256(&encoded), signature.r, signature.s, v) {
        Ok(address) => {
            tracing::debug!(
                authority = %address,
                chain_id = %chain_id,
                "Authority recovered from unprefixed digest"
            );
            Some(RecoveredAuthority {
                address,
                source: AuthoritySource::Unprefixed,
            })
        }
        Err(e) => {
            tracing::debug!(error = %e, chain_id = %chain_id, "Unprefixed authority recovery failed");
            None
        }
    }
}

/// Recover the authority, or attribute the authorization to `tx_sender`.
pub fn resolve_authority(
    authorization: &Authorization,
    fallback_chain_id: u64,
    tx_sender: Address,
) -> RecoveredAuthority {
    recover_authority(authorization, fallback_chain_id).unwrap_or(RecoveredAuthority {
        address: tx_sender,
        source: AuthoritySource::Sender,
    })
}
