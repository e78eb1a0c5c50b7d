//! Release publishing client.
//!
//! Talks to a GitHub-style releases API over TLS anchored on an explicit
//! trust store:
//!
//! - query the latest release version
//! - create a release (privileged)
//! - upload a release artifact to the upload host (privileged)
//!
//! Every operation makes exactly one attempt and returns an [`Outcome`]:
//! either the decoded value or a [`Failure`] naming why the attempt failed.
//! Each attempt reports exactly one [`AuditEvent`] to the client's
//! [`Auditor`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use release_client::{
//!     ApiAuthority, ReleaseClient, ReleaseClientConfig, ReleaseToken, Repository,
//!     TracingAuditor, TrustStore, UploadAuthority,
//! };
//!
//! # async fn example(ca_pem: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let trust_store = TrustStore::from_pem(ca_pem)?;
//! let repository = Repository::new("argo-json", "argo");
//! let config = ReleaseClientConfig::new(ApiAuthority::github()?, repository);
//! let client = ReleaseClient::new(config, &trust_store, Arc::new(TracingAuditor))?;
//!
//! let latest = client.latest_release_version().await?;
//! let Some(next) = latest.next_minor() else { return Ok(()) };
//!
//! let publisher = client.privileged(UploadAuthority::github()?, ReleaseToken::new("token"))?;
//! let release_id = publisher.release(&next).await?;
//! publisher
//!     .upload_artifact(&release_id, "argo.jar", "Jar", Path::new("build/argo.jar"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Timeouts
//!
//! | Bound | Covers | Default |
//! |-------|--------|---------|
//! | connect | TCP connect and TLS handshake | 10 s |
//! | first byte | request sent until response head | 30 s |
//! | end-to-end | dispatch until the response body is complete | 300 s |

pub mod audit;
pub mod authority;
pub mod client;
pub mod config;
pub mod error;
pub mod outcome;
pub mod trust;
pub mod types;

// Re-export main types
pub use audit::{AuditEvent, Auditor, ChannelAuditor, RecordingAuditor, TracingAuditor};
pub use authority::{
    ApiAuthority, Authority, Repository, UploadAuthority, GITHUB_API_HOST, GITHUB_UPLOAD_HOST,
};
pub use client::{PrivilegedReleaseClient, ReleaseClient};
pub use config::{
    ReleaseClientConfig, Timeouts, DEFAULT_CONNECT_TIMEOUT, DEFAULT_END_TO_END_TIMEOUT,
    DEFAULT_FIRST_BYTE_TIMEOUT,
};
pub use error::{ReleaseError, ReleaseResult};
pub use outcome::{Failure, InterpretError, Outcome, TimeoutPhase, TransportError};
pub use trust::TrustStore;
pub use types::{
    media_type_for, ParseVersionError, ReleaseId, ReleaseToken, ResponseHeaders, VersionNumber,
};
