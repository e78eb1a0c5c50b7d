//! Domain values and API wire types.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// A `major.minor` release version, ordered numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionNumber {
    pub major: u32,
    pub minor: u32,
}

impl VersionNumber {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The version the next release after this one takes.
    pub fn next_minor(self) -> Option<Self> {
        self.minor.checked_add(1).map(|minor| Self::new(self.major, minor))
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Tag name that is not of the form `major.minor`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version number {input:?}: expected <major>.<minor>")]
pub struct ParseVersionError {
    pub input: String,
}

impl FromStr for VersionNumber {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseVersionError {
            input: s.to_string(),
        };

        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        let component = |part: &str| -> Result<u32, ParseVersionError> {
            // u32::from_str accepts a leading '+'
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };

        Ok(Self::new(component(major)?, component(minor)?))
    }
}

/// Identifier the API assigned to a release.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseId(pub String);

impl ReleaseId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bearer token for mutating operations. `Debug` never shows the value.
#[derive(Clone)]
pub struct ReleaseToken(String);

impl ReleaseToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ReleaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReleaseToken(***)")
    }
}

/// Response headers as received, names lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders(Vec<(String, String)>);

impl ResponseHeaders {
    pub(crate) fn from_header_map(headers: &reqwest::header::HeaderMap) -> Self {
        Self(
            headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
        )
    }

    /// First value of a header, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str, value: &str) -> bool {
        self.0
            .iter()
            .any(|(key, v)| key.eq_ignore_ascii_case(name) && v == value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<(String, String)>> for ResponseHeaders {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

/// Element of `GET /repos/{owner}/{repo}/releases`; only the fields we read.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ReleaseSummary {
    pub tag_name: String,
}

/// Response of `POST /repos/{owner}/{repo}/releases`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreatedRelease {
    pub id: WireId,
}

/// GitHub returns numeric ids; string ids are accepted as-is.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireId {
    Number(u64),
    Text(String),
}

impl From<WireId> for ReleaseId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Number(n) => ReleaseId(n.to_string()),
            WireId::Text(s) => ReleaseId(s),
        }
    }
}

/// Media type sent as `Content-Type` for an uploaded artifact.
pub fn media_type_for(target_name: &str) -> &'static str {
    let extension = target_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jar" => "application/java-archive",
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "tar" => "application/x-tar",
        "json" => "application/json",
        "pom" | "xml" => "application/xml",
        "asc" => "application/pgp-signature",
        "txt" | "md5" | "sha1" | "sha256" | "sha512" => "text/plain",
        _ => "application/octet-stream",
    }
}
