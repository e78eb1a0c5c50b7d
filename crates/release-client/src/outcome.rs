//! Outcome of a release operation and the closed set of ways it can fail.
//!
//! Every public operation returns [`Outcome`]; network and protocol
//! conditions are never raised as panics.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::types::ResponseHeaders;

/// Result of one attempted operation.
pub type Outcome<T> = Result<T, Failure>;

/// Why an attempted operation did not succeed.
///
/// Response bodies carried by the variants are decoded as UTF-8 with invalid
/// sequences replaced by U+FFFD, exactly as recorded in the audit event.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    /// The exchange completed with a status code other than the expected one.
    #[error("{uri}: expected HTTP {expected}, got {actual}")]
    InvalidResponseCode {
        uri: Url,
        expected: u16,
        actual: u16,
        headers: ResponseHeaders,
        body: String,
    },

    /// The exchange completed with the expected status but the body could
    /// not be interpreted.
    #[error("{uri}: could not handle HTTP {status} response: {source}")]
    ResponseHandling {
        uri: Url,
        status: u16,
        headers: ResponseHeaders,
        body: String,
        #[source]
        source: InterpretError,
    },

    /// No response was received: DNS, TCP, TLS or stream failure.
    #[error("{uri}: request failed: {source}")]
    RequestSubmitting {
        uri: Url,
        #[source]
        source: TransportError,
    },

    /// Connection (including TLS handshake) not established in time.
    #[error("{uri}: connect timed out after {connect_timeout:?}")]
    ConnectTimeout {
        uri: Url,
        connect_timeout: Duration,
        #[source]
        source: TransportError,
    },

    /// No response byte arrived in time after the request was sent.
    #[error("{uri}: no response within {first_byte_timeout:?} of sending request")]
    FirstByteTimeout {
        uri: Url,
        first_byte_timeout: Duration,
        #[source]
        source: TransportError,
    },

    /// The whole exchange did not finish in time.
    #[error("{uri}: exchange did not complete within {end_to_end_timeout:?}")]
    EndToEndTimeout {
        uri: Url,
        end_to_end_timeout: Duration,
        #[source]
        source: TransportError,
    },
}

impl Failure {
    /// Request target of the failed attempt.
    pub fn uri(&self) -> &Url {
        match self {
            Self::InvalidResponseCode { uri, .. }
            | Self::ResponseHandling { uri, .. }
            | Self::RequestSubmitting { uri, .. }
            | Self::ConnectTimeout { uri, .. }
            | Self::FirstByteTimeout { uri, .. }
            | Self::EndToEndTimeout { uri, .. } => uri,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout { .. }
                | Self::FirstByteTimeout { .. }
                | Self::EndToEndTimeout { .. }
        )
    }

    /// Whether a complete HTTP response was received.
    pub fn exchange_completed(&self) -> bool {
        matches!(
            self,
            Self::InvalidResponseCode { .. } | Self::ResponseHandling { .. }
        )
    }
}

/// Timing phase of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    Connect,
    FirstByte,
    EndToEnd,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::FirstByte => "first byte",
            Self::EndToEnd => "end-to-end",
        })
    }
}

/// Cause of an attempt that produced no complete response.
///
/// Cloneable so the same cause can be handed to the auditor and returned to
/// the caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Error reported by the HTTP stack.
    #[error(transparent)]
    Http(Arc<reqwest::Error>),

    /// The request body source could not be read.
    #[error("failed to read request body: {0}")]
    Source(Arc<std::io::Error>),

    /// One of the client's own deadlines fired.
    #[error("{phase} deadline of {limit:?} elapsed")]
    Elapsed { phase: TimeoutPhase, limit: Duration },
}

impl TransportError {
    pub(crate) fn elapsed(phase: TimeoutPhase, limit: Duration) -> Self {
        Self::Elapsed { phase, limit }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout(),
            Self::Source(e) => e.kind() == std::io::ErrorKind::TimedOut,
            Self::Elapsed { .. } => true,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Arc::new(err))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Source(Arc::new(err))
    }
}

/// Why a response body with the expected status was rejected.
#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    /// Body is not well-formed JSON.
    #[error("invalid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    /// Body is JSON but not of the expected shape.
    #[error("unexpected response shape: {message}")]
    Shape { message: String },
}

impl InterpretError {
    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }
}
