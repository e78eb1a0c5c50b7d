//! Mutating operations: create release, upload artifact.

use std::path::Path;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde_json::json;
use tracing::debug;

use super::helpers;
use super::http::{Exchange, RequestBody};
use super::ReleaseClient;
use crate::authority::UploadAuthority;
use crate::outcome::Outcome;
use crate::types::{media_type_for, ReleaseId, VersionNumber};

/// A [`ReleaseClient`] plus the credential and upload authority needed to
/// publish.
///
/// `Debug` output never contains the token: the header value is marked
/// sensitive.
#[derive(Debug, Clone)]
pub struct PrivilegedReleaseClient {
    base: ReleaseClient,
    upload_authority: UploadAuthority,
    authorization: HeaderValue,
}

impl PrivilegedReleaseClient {
    pub(super) fn new(
        base: ReleaseClient,
        upload_authority: UploadAuthority,
        authorization: HeaderValue,
    ) -> Self {
        Self {
            base,
            upload_authority,
            authorization,
        }
    }

    /// The unprivileged client this one decorates.
    pub fn base(&self) -> &ReleaseClient {
        &self.base
    }

    pub fn upload_authority(&self) -> &UploadAuthority {
        &self.upload_authority
    }

    /// Create a release tagged with `version`.
    pub async fn release(&self, version: &VersionNumber) -> Outcome<ReleaseId> {
        let config = &self.base.config;
        let uri = config
            .api_authority
            .0
            .https_url(config.repository.releases_path(), &[]);
        debug!(repository = %config.repository, version = %version, "creating release");

        let exchange = Exchange::new(Method::POST, uri, StatusCode::CREATED)
            .header(AUTHORIZATION, self.authorization.clone())
            .body(RequestBody::Json(json!({ "tag_name": version.to_string() })));

        self.base
            .http
            .execute(exchange, helpers::created_release_id)
            .await
    }

    /// Upload the file at `path` as asset `target_name` of release `release_id`.
    pub async fn upload_artifact(
        &self,
        release_id: &ReleaseId,
        target_name: &str,
        label: &str,
        path: &Path,
    ) -> Outcome<()> {
        let config = &self.base.config;
        let segments = config
            .repository
            .releases_path()
            .into_iter()
            .chain([release_id.as_str(), "assets"]);
        let uri = self
            .upload_authority
            .0
            .https_url(segments, &[("name", target_name), ("label", label)]);
        debug!(
            repository = %config.repository,
            release_id = %release_id,
            target_name,
            "uploading artifact"
        );

        let exchange = Exchange::new(Method::POST, uri, StatusCode::CREATED)
            .header(AUTHORIZATION, self.authorization.clone())
            .body(RequestBody::File {
                path: path.to_path_buf(),
                media_type: media_type_for(target_name),
            });

        self.base.http.execute(exchange, |_| Ok(())).await
    }
}
