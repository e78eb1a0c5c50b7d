//! Release API client.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::sync::Arc;

use reqwest::header::HeaderValue;
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::audit::Auditor;
use crate::authority::{ApiAuthority, Repository, UploadAuthority};
use crate::config::{ReleaseClientConfig, Timeouts};
use crate::error::{ReleaseError, ReleaseResult};
use crate::outcome::Outcome;
use crate::trust::TrustStore;
use crate::types::{ReleaseToken, VersionNumber};

mod helpers;
mod http;
mod privileged;

use http::{Exchange, HttpBackend};
pub use privileged::PrivilegedReleaseClient;

/// Read-only release client.
///
/// Cheap to clone; clones share one connection pool, trust configuration and
/// auditor.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    http: HttpBackend,
    config: Arc<ReleaseClientConfig>,
}

impl ReleaseClient {
    pub fn new(
        config: ReleaseClientConfig,
        trust_store: &TrustStore,
        auditor: Arc<dyn Auditor>,
    ) -> ReleaseResult<Self> {
        let http = HttpBackend::new(trust_store, config.timeouts, auditor)?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Version of the most recent release.
    pub async fn latest_release_version(&self) -> Outcome<VersionNumber> {
        let uri = self
            .config
            .api_authority
            .0
            .https_url(self.config.repository.releases_path(), &[("per_page", "1")]);
        debug!(repository = %self.config.repository, "querying latest release");

        self.http
            .execute(
                Exchange::new(Method::GET, uri, StatusCode::OK),
                helpers::latest_version,
            )
            .await
    }

    /// Client for mutating operations, authenticated with `token`.
    pub fn privileged(
        &self,
        upload_authority: UploadAuthority,
        token: ReleaseToken,
    ) -> ReleaseResult<PrivilegedReleaseClient> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| ReleaseError::Client {
                message: "token contains characters not allowed in a header".to_string(),
            })?;
        authorization.set_sensitive(true);

        Ok(PrivilegedReleaseClient::new(
            self.clone(),
            upload_authority,
            authorization,
        ))
    }

    pub fn api_authority(&self) -> &ApiAuthority {
        &self.config.api_authority
    }

    pub fn repository(&self) -> &Repository {
        &self.config.repository
    }

    pub fn timeouts(&self) -> &Timeouts {
        self.http.timeouts()
    }
}
