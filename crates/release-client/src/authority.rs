//! Network identities the client talks to.

use std::fmt;

use url::Url;

use crate::error::{ReleaseError, ReleaseResult};

/// Host serving the public GitHub REST API.
pub const GITHUB_API_HOST: &str = "api.github.com";

/// Host receiving GitHub release assets.
pub const GITHUB_UPLOAD_HOST: &str = "uploads.github.com";

/// A hostname and optional port, validated as an HTTPS origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    host: String,
    port: Option<u16>,
    origin: Url,
}

impl Authority {
    /// Authority on the default HTTPS port.
    pub fn new(host: impl Into<String>) -> ReleaseResult<Self> {
        Self::build(host.into(), None)
    }

    /// Authority on an explicit port.
    pub fn with_port(host: impl Into<String>, port: u16) -> ReleaseResult<Self> {
        Self::build(host.into(), Some(port))
    }

    fn build(host: String, port: Option<u16>) -> ReleaseResult<Self> {
        let invalid = |reason: String| ReleaseError::InvalidAuthority {
            authority: match port {
                Some(port) => format!("{}:{}", host, port),
                None => host.clone(),
            },
            reason,
        };

        if host.is_empty() {
            return Err(invalid("empty host".to_string()));
        }
        if host.contains(['/', '?', '#', '@']) {
            return Err(invalid(
                "host must not contain a path, query or userinfo".to_string(),
            ));
        }

        let spelled = match port {
            Some(port) => format!("https://{}:{}/", host, port),
            None => format!("https://{}/", host),
        };
        let origin = Url::parse(&spelled).map_err(|e| invalid(e.to_string()))?;

        Ok(Self { host, port, origin })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// `https://host[:port]/` with the given path segments and query pairs.
    pub(crate) fn https_url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
        query: &[(&str, &str)],
    ) -> Url {
        let mut url = self.origin.clone();
        // An https origin is always a base URL.
        if let Ok(mut path) = url.path_segments_mut() {
            path.clear().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().copied());
        }
        url
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => f.write_str(&self.host),
        }
    }
}

/// Authority serving release queries and release creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiAuthority(pub Authority);

impl ApiAuthority {
    /// `api.github.com` on the default port.
    pub fn github() -> ReleaseResult<Self> {
        Authority::new(GITHUB_API_HOST).map(Self)
    }
}

/// Authority receiving artifact bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAuthority(pub Authority);

impl UploadAuthority {
    /// `uploads.github.com` on the default port.
    pub fn github() -> ReleaseResult<Self> {
        Authority::new(GITHUB_UPLOAD_HOST).map(Self)
    }
}

/// Owner and name of the repository whose releases are managed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Path segments of the releases collection.
    pub(crate) fn releases_path(&self) -> [&str; 4] {
        ["repos", self.owner.as_str(), self.name.as_str(), "releases"]
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
