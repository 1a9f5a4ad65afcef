//! Wire and record types
//!
//! Ingestion types (`RpcBlock`, `RpcTransaction`, `RawAuthorization`) decode the
//! loosely-typed JSON-RPC payloads nodes return; everything after the
//! normalisation step works on the strict types (`Authorization`,
//! `DelegationRecord`).

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Deserializer, Serialize};

/// Transaction type discriminator of a delegation setup (set-code) transaction
pub const SET_CODE_TX_TYPE: u64 = 4;

/// Integer quantity accepted as a JSON number, a `0x` hex string or a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Quantity(pub u64);

impl Quantity {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(u64),
            Str(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(n) => Ok(Quantity(n)),
            Repr::Str(s) => parse_quantity(&s)
                .map(Quantity)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Quantity that may exceed 64 bits (authorization chain ids are uint256).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct WideQuantity(pub U256);

impl WideQuantity {
    pub fn value(self) -> U256 {
        self.0
    }
}

impl<'de> Deserialize<'de> for WideQuantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(u64),
            Str(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(n) => Ok(WideQuantity(U256::from(n))),
            Repr::Str(s) => parse_wide_quantity(&s)
                .map(WideQuantity)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Parse a hex (`0x`-prefixed) or decimal quantity string.
pub fn parse_quantity(raw: &str) -> Result<u64, String> {
    let s = raw.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some("") => Ok(0),
        Some(hex) => u64::from_str_radix(hex, 16)
            .map_err(|e| format!("invalid hex quantity {}: {}", raw, e)),
        None => s
            .parse::<u64>()
            .map_err(|e| format!("invalid quantity {}: {}", raw, e)),
    }
}

/// Like [`parse_quantity`], up to 256 bits.
pub fn parse_wide_quantity(raw: &str) -> Result<U256, String> {
    let s = raw.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some("") => Ok(U256::ZERO),
        Some(hex) => U256::from_str_radix(hex, 16)
            .map_err(|e| format!("invalid hex quantity {}: {}", raw, e)),
        None => U256::from_str_radix(s, 10)
            .map_err(|e| format!("invalid quantity {}: {}", raw, e)),
    }
}

/// Lowercase `0x`-prefixed hex rendering of an address.
pub fn lowercase_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Lowercase `0x`-prefixed hex rendering of a hash.
pub fn lowercase_hash(hash: &B256) -> String {
    format!("0x{}", hex::encode(hash))
}

// =============================================================================
// Ingestion (JSON-RPC) types
// =============================================================================

/// A block as returned by `eth_getBlockByNumber`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    pub number: Quantity,
    #[serde(default)]
    pub hash: Option<B256>,
    pub timestamp: Quantity,
    #[serde(default)]
    pub transactions: Vec<BlockTransaction>,
}

/// Block body entry: a bare hash, or the full transaction when the block
/// was requested with full bodies.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BlockTransaction {
    Hash(B256),
    Full(Box<RpcTransaction>),
}

impl BlockTransaction {
    pub fn hash(&self) -> B256 {
        match self {
            BlockTransaction::Hash(hash) => *hash,
            BlockTransaction::Full(tx) => tx.hash,
        }
    }
}

/// A transaction as returned by `eth_getTransactionByHash`.
///
/// Authorization entries stay undecoded until a transaction is selected, so a
/// malformed entry only affects the transaction carrying it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub hash: B256,
    pub from: Address,
    #[serde(rename = "type", default)]
    pub tx_type: Option<Quantity>,
    #[serde(default)]
    pub authorization_list: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub block_number: Option<Quantity>,
}

impl RpcTransaction {
    pub fn authorizations(&self) -> &[serde_json::Value] {
        self.authorization_list.as_deref().unwrap_or_default()
    }

    /// Type 4 with a non-empty authorization list.
    pub fn is_delegation_setup(&self) -> bool {
        self.tx_type.map(Quantity::value) == Some(SET_CODE_TX_TYPE)
            && !self.authorizations().is_empty()
    }
}

/// One authorization entry exactly as a node (or indexer) reports it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAuthorization {
    #[serde(default)]
    pub chain_id: Option<WideQuantity>,
    #[serde(alias = "delegateAddress")]
    pub address: Address,
    #[serde(default)]
    pub nonce: Option<Quantity>,
    #[serde(flatten)]
    pub signature: SignatureEnvelope,
}

/// The two shapes signature material arrives in.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignatureEnvelope {
    /// `{ ..., "signature": { "r", "s", "v" | "yParity" } }`
    Nested { signature: RawSignature },
    /// `{ ..., "r", "s", "v" | "yParity" }`
    Flat(RawSignature),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSignature {
    pub r: U256,
    pub s: U256,
    #[serde(default)]
    pub v: Option<Quantity>,
    #[serde(default)]
    pub y_parity: Option<Quantity>,
}

impl RawAuthorization {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Collapse either signature shape into flat `r`, `s` and a recovery id.
    pub fn normalize(self) -> Authorization {
        let signature = match self.signature {
            SignatureEnvelope::Nested { signature } => signature,
            SignatureEnvelope::Flat(signature) => signature,
        };

        let v = match (signature.v, signature.y_parity) {
            (Some(v), _) => Some(v.value()),
            (None, Some(parity)) => y_parity_to_v(parity.value()),
            (None, None) => None,
        };

        Authorization {
            chain_id: self.chain_id.map(WideQuantity::value),
            address: self.address,
            nonce: self.nonce.map(Quantity::value).unwrap_or(0),
            signature: SignatureMaterial {
                r: signature.r,
                s: signature.s,
                v,
            },
        }
    }
}

/// `0 -> 27`, `1 -> 28`; anything else is not a parity bit.
pub fn y_parity_to_v(parity: u64) -> Option<u64> {
    match parity {
        0 | 1 => Some(27 + parity),
        _ => None,
    }
}

// =============================================================================
// Normalised types
// =============================================================================

/// Flat signature material of one authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureMaterial {
    pub r: U256,
    pub s: U256,
    /// Explicit `v`, or `yParity` mapped onto 27/28. `None` when neither was supplied.
    pub v: Option<u64>,
}

/// One normalised authorization entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorization {
    /// `None` means "not supplied"; callers fall back to the network chain id.
    pub chain_id: Option<U256>,
    /// Implementation the authority delegates to.
    pub address: Address,
    pub nonce: u64,
    pub signature: SignatureMaterial,
}

/// How the `authority` of a record was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthoritySource {
    /// Recovered from the canonical `0x05 || rlp(...)` digest.
    Signature,
    /// Recovered from the digest without the magic byte. Not part of the signing scheme.
    Unprefixed,
    /// Recovery failed; the transaction sender is reported instead. Not verified.
    Sender,
}

impl AuthoritySource {
    pub fn is_verified(self) -> bool {
        matches!(self, AuthoritySource::Signature)
    }
}

/// One detected delegation, as handed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationRecord {
    pub tx_hash: String,
    pub block_number: u64,
    /// ISO-8601, UTC, millisecond precision.
    pub timestamp: String,
    pub tx_sender: String,
    pub authority: String,
    pub delegated_to: String,
    pub nonce: String,
    pub chain_id: u64,
    pub network: String,
    pub authority_source: AuthoritySource,
}

impl DelegationRecord {
    /// A delegation to the zero address clears any previous delegation.
    pub fn is_revocation(&self) -> bool {
        self.delegated_to == lowercase_address(&Address::ZERO)
    }
}

/// Current on-chain delegation of an account, read from its code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationDesignator {
    pub address: String,
    pub delegated_to: String,
    pub network: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelegationStatus {
    Active,
    Revoked,
}

/// A delegation record found while walking an account's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationHistoryEntry {
    #[serde(flatten)]
    pub record: DelegationRecord,
    pub status: DelegationStatus,
}

impl From<DelegationRecord> for DelegationHistoryEntry {
    fn from(record: DelegationRecord) -> Self {
        let status = if record.is_revocation() {
            DelegationStatus::Revoked
        } else {
            DelegationStatus::Active
        };
        Self { record, status }
    }
}
