//! Error types shared across Reelsmith crates.

use std::path::PathBuf;

/// Top-level error type for media collaborator operations.
///
/// Probe and encoder backends report through this type; the composer
/// translates it into its own typed taxonomy at the call site.
#[derive(Debug, thiserror::Error)]
pub enum ReelsmithError {
    #[error("Probe error: {message}")]
    Probe { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelsmithError.
pub type ReelsmithResult<T> = Result<T, ReelsmithError>;

impl ReelsmithError {
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error means the referenced file does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::FileNotFound { .. } => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let missing = ReelsmithError::FileNotFound {
            path: PathBuf::from("/nope.mp4"),
        };
        assert!(missing.is_not_found());

        let io = ReelsmithError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(io.is_not_found());

        assert!(!ReelsmithError::probe("bad header").is_not_found());
    }

    #[test]
    fn test_messages_carry_context() {
        let err = ReelsmithError::encode("ffmpeg exited with status 1");
        assert_eq!(err.to_string(), "Encode error: ffmpeg exited with status 1");
    }
}
