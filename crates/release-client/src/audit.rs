//! Audit trail of request attempts.
//!
//! Each attempted operation hands exactly one [`AuditEvent`] to the
//! client's [`Auditor`]: `RequestCompleted` when a full HTTP response was
//! received (whatever its status or payload), `RequestFailed` otherwise.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{info, warn};
use url::Url;

use crate::outcome::TransportError;
use crate::types::ResponseHeaders;

/// One attempted exchange.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    /// A complete response was received, whatever its status.
    ///
    /// `body` is the response body decoded as UTF-8; invalid sequences are
    /// replaced with U+FFFD.
    RequestCompleted {
        uri: Url,
        status: u16,
        headers: ResponseHeaders,
        body: String,
    },
    RequestFailed {
        uri: Url,
        cause: TransportError,
    },
}

impl AuditEvent {
    pub fn uri(&self) -> &Url {
        match self {
            Self::RequestCompleted { uri, .. } | Self::RequestFailed { uri, .. } => uri,
        }
    }
}

/// Write-only observer of attempts.
///
/// `record` runs on the request path: it must return promptly and must not
/// panic. Sinks that persist events should buffer or hand off, as
/// [`ChannelAuditor`] does.
pub trait Auditor: Send + Sync {
    fn record(&self, event: AuditEvent);
}

impl<F> Auditor for F
where
    F: Fn(AuditEvent) + Send + Sync,
{
    fn record(&self, event: AuditEvent) {
        self(event)
    }
}

/// Emits events as `tracing` records under the `release_client::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditor;

impl Auditor for TracingAuditor {
    fn record(&self, event: AuditEvent) {
        match event {
            AuditEvent::RequestCompleted {
                uri, status, body, ..
            } => {
                info!(
                    target: "release_client::audit",
                    uri = %uri,
                    status,
                    body_len = body.len(),
                    "request completed"
                );
            }
            AuditEvent::RequestFailed { uri, cause } => {
                warn!(
                    target: "release_client::audit",
                    uri = %uri,
                    error = %cause,
                    "request failed"
                );
            }
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RecordingAuditor {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl RecordingAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Auditor for RecordingAuditor {
    fn record(&self, event: AuditEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event);
    }
}

/// Forwards events to an unbounded channel; the receiver does the slow work.
///
/// Events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelAuditor {
    sender: mpsc::UnboundedSender<AuditEvent>,
}

impl ChannelAuditor {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Auditor for ChannelAuditor {
    fn record(&self, event: AuditEvent) {
        let _ = self.sender.send(event);
    }
}
