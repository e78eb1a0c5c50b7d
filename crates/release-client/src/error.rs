//! Error types for client construction.
//!
//! Operation failures are not errors in this sense: they are returned as
//! [`crate::Failure`] values inside an [`crate::Outcome`].

/// Errors raised while building authorities, trust stores or clients.
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    /// Host/port pair does not form a valid HTTPS origin.
    #[error("invalid authority {authority}: {reason}")]
    InvalidAuthority { authority: String, reason: String },

    /// Trust anchor material could not be loaded.
    #[error("tls configuration error: {message}")]
    Tls { message: String },

    /// The underlying HTTP client could not be created.
    #[error("failed to create HTTP client: {message}")]
    Client { message: String },
}

impl From<rustls::Error> for ReleaseError {
    fn from(err: rustls::Error) -> Self {
        Self::Tls {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ReleaseError {
    fn from(err: reqwest::Error) -> Self {
        Self::Client {
            message: err.to_string(),
        }
    }
}

/// Result type for construction.
pub type ReleaseResult<T> = Result<T, ReleaseError>;
