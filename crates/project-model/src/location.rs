//! Source locations: local files or remote URIs.
//!
//! Projects store locations as plain strings. They are parsed lazily, at the
//! point a source is consumed, so one malformed entry never prevents the rest
//! of a project from loading.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Schemes that are handed to the media toolkit as-is.
const REMOTE_SCHEMES: &[&str] = &["http", "https", "rtmp", "rtsp", "s3"];

/// A parsed, readable media location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SourceLocation {
    /// A file on the local filesystem.
    Local(PathBuf),
    /// A remote stream or object URI.
    Remote(String),
}

/// Reasons a location string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("location is empty")]
    Empty,

    #[error("unsupported URI scheme `{scheme}`")]
    UnsupportedScheme { scheme: String },

    #[error("malformed URI `{raw}`: {reason}")]
    Malformed { raw: String, reason: String },
}

impl SourceLocation {
    /// Parse a raw location string.
    ///
    /// Accepts bare paths (absolute or relative), `file://` URIs with
    /// percent-encoded paths, and remote URIs for known streaming schemes.
    pub fn parse(raw: &str) -> Result<Self, LocationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LocationError::Empty);
        }
        if raw.contains('\0') {
            return Err(malformed(raw, "contains a NUL byte"));
        }

        let Some((scheme, rest)) = raw.split_once("://") else {
            return Ok(Self::Local(PathBuf::from(raw)));
        };

        if !is_valid_scheme(scheme) {
            return Err(malformed(raw, "invalid scheme"));
        }
        let scheme_lower = scheme.to_ascii_lowercase();

        if scheme_lower == "file" {
            let path = match rest.find('/') {
                Some(0) => rest,
                Some(idx) if rest[..idx].eq_ignore_ascii_case("localhost") => &rest[idx..],
                Some(_) => return Err(malformed(raw, "file URIs must not name a remote host")),
                None => return Err(malformed(raw, "file URI has no path")),
            };
            let decoded = percent_decode(path).ok_or_else(|| malformed(raw, "bad percent escape"))?;
            return Ok(Self::Local(PathBuf::from(decoded)));
        }

        if !REMOTE_SCHEMES.contains(&scheme_lower.as_str()) {
            return Err(LocationError::UnsupportedScheme {
                scheme: scheme.to_string(),
            });
        }

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(malformed(raw, "missing host"));
        }
        if rest.chars().any(char::is_whitespace) {
            return Err(malformed(raw, "contains whitespace"));
        }

        Ok(Self::Remote(raw.to_string()))
    }

    /// Join a relative local path onto `root`. Absolute paths and remote
    /// locations are returned unchanged.
    pub fn resolved_against(self, root: Option<&Path>) -> Self {
        match (self, root) {
            (Self::Local(path), Some(root)) if path.is_relative() => Self::Local(root.join(path)),
            (other, _) => other,
        }
    }

    /// The filesystem path, for local locations.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Remote(_) => None,
        }
    }

    /// Whether this location is a remote URI.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(uri) => f.write_str(uri),
        }
    }
}

fn malformed(raw: &str, reason: &str) -> LocationError {
    LocationError::Malformed {
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}

/// RFC 3986: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let hex = input.get(idx + 1..idx + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            idx += 3;
        } else {
            out.push(bytes[idx]);
            idx += 1;
        }
    }
    String::from_utf8(out).ok()
}
