//! Event boundary between scanners, the monitor and consumers
//!
//! Scanners report through an [`EventSink`]. The monitor hands every scanner a
//! [`TaggingSink`] that attaches the network name and forwards into the
//! consumer-facing [`MonitorEvent`] sink.

use crate::types::DelegationRecord;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Events a single network scanner produces
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ScannerEvent {
    Delegation(DelegationRecord),
    Error { error: String },
    Connected,
    Disconnected,
}

/// Events the multi-network monitor produces, always tagged with a network
/// when one is known
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MonitorEvent {
    /// The record already carries its network
    Delegation(DelegationRecord),
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        network: Option<String>,
        error: String,
    },
    Connected { network: String },
    Disconnected { network: String },
}

impl MonitorEvent {
    pub fn network(&self) -> Option<&str> {
        match self {
            MonitorEvent::Delegation(record) => Some(&record.network),
            MonitorEvent::Error { network, .. } => network.as_deref(),
            MonitorEvent::Connected { network } | MonitorEvent::Disconnected { network } => {
                Some(network)
            }
        }
    }
}

/// Observer receiving events as they are produced.
///
/// `emit` is called from whichever task produced the event and must not block.
pub trait EventSink<E>: Send + Sync {
    fn emit(&self, event: E);
}

impl<E: Send> EventSink<E> for mpsc::UnboundedSender<E> {
    fn emit(&self, event: E) {
        if self.send(event).is_err() {
            tracing::trace!("Event dropped (receiver closed)");
        }
    }
}

impl<E, T: EventSink<E> + ?Sized> EventSink<E> for Arc<T> {
    fn emit(&self, event: E) {
        (**self).emit(event)
    }
}

/// Sink that discards everything
pub struct NullSink;

impl<E> EventSink<E> for NullSink {
    fn emit(&self, _event: E) {}
}

/// Attaches a network name to scanner events and forwards them as monitor events
pub struct TaggingSink<S> {
    network: String,
    inner: S,
}

impl<S> TaggingSink<S> {
    pub fn new(network: impl Into<String>, inner: S) -> Self {
        Self {
            network: network.into(),
            inner,
        }
    }
}

impl<S: EventSink<MonitorEvent>> EventSink<ScannerEvent> for TaggingSink<S> {
    fn emit(&self, event: ScannerEvent) {
        let network = self.network.clone();
        let tagged = match event {
            ScannerEvent::Delegation(mut record) => {
                if record.network.is_empty() {
                    record.network = network;
                }
                MonitorEvent::Delegation(record)
            }
            ScannerEvent::Error { error } => MonitorEvent::Error {
                network: Some(network),
                error,
            },
            ScannerEvent::Connected => MonitorEvent::Connected { network },
            ScannerEvent::Disconnected => MonitorEvent::Disconnected { network },
        };
        self.inner.emit(tagged);
    }
}
