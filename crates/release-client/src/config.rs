//! Client configuration.

use std::time::Duration;

use crate::authority::{ApiAuthority, Repository};

/// Default bound on TCP connect plus TLS handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on waiting for the response after the request is sent.
pub const DEFAULT_FIRST_BYTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on a whole exchange, sized for artifact uploads.
pub const DEFAULT_END_TO_END_TIMEOUT: Duration = Duration::from_secs(300);

/// The three independently configured timing bounds of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub first_byte: Duration,
    pub end_to_end: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            first_byte: DEFAULT_FIRST_BYTE_TIMEOUT,
            end_to_end: DEFAULT_END_TO_END_TIMEOUT,
        }
    }
}

/// Configuration for [`crate::ReleaseClient`].
#[derive(Debug, Clone)]
pub struct ReleaseClientConfig {
    /// Authority serving the releases API.
    pub api_authority: ApiAuthority,

    /// Repository whose releases are managed.
    pub repository: Repository,

    /// Timing bounds applied to every attempt.
    pub timeouts: Timeouts,
}

impl ReleaseClientConfig {
    pub fn new(api_authority: ApiAuthority, repository: Repository) -> Self {
        Self {
            api_authority,
            repository,
            timeouts: Timeouts::default(),
        }
    }

    /// Replace all timeouts.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect = timeout;
        self
    }

    pub fn with_first_byte_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.first_byte = timeout;
        self
    }

    pub fn with_end_to_end_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.end_to_end = timeout;
        self
    }
}
