//! Pure helpers: response interpreters (no HTTP, no status logic).

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::outcome::InterpretError;
use crate::types::{CreatedRelease, ReleaseId, ReleaseSummary, VersionNumber};

fn parse_document(body: &[u8]) -> Result<Value, InterpretError> {
    serde_json::from_slice(body).map_err(InterpretError::Syntax)
}

fn read_shape<T: DeserializeOwned>(document: Value, what: &str) -> Result<T, InterpretError> {
    serde_json::from_value(document)
        .map_err(|e| InterpretError::shape(format!("{}: {}", what, e)))
}

/// Version of the first release in a `per_page=1` listing.
///
/// Releases are listed most recent first, so only the first element is read.
pub(crate) fn latest_version(body: &[u8]) -> Result<VersionNumber, InterpretError> {
    let document = parse_document(body)?;

    let first = match document {
        Value::Array(releases) => releases
            .into_iter()
            .next()
            .ok_or_else(|| InterpretError::shape("release list is empty"))?,
        other => {
            return Err(InterpretError::shape(format!(
                "expected an array of releases, got {}",
                json_kind(&other)
            )))
        }
    };

    let summary: ReleaseSummary = read_shape(first, "release entry")?;
    summary
        .tag_name
        .parse()
        .map_err(|e| InterpretError::shape(format!("tag_name: {}", e)))
}

/// Id of a freshly created release.
pub(crate) fn created_release_id(body: &[u8]) -> Result<ReleaseId, InterpretError> {
    let document = parse_document(body)?;
    let created: CreatedRelease = read_shape(document, "created release")?;
    Ok(created.id.into())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
