//! Composer error taxonomy.

use std::path::PathBuf;

use crate::composition::CompositionError;

/// Fatal errors from building or exporting a timeline.
///
/// Optional inputs (overlays, narration, clip audio) never produce these;
/// they are logged and skipped instead.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("timeline has no video clips")]
    NoTimelineClips,

    #[error("timeline references unknown media source `{source_id}`")]
    MissingSource { source_id: String },

    #[error("media source `{source_id}` has an invalid location `{location}`: {reason}")]
    InvalidSourceLocation {
        source_id: String,
        location: String,
        reason: String,
    },

    #[error("source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("media source `{source_id}` ({location}) has no video track")]
    SourceHasNoVideo { source_id: String, location: String },

    #[error("cannot read {location}: {message}")]
    SourceUnreadable { location: String, message: String },

    #[error("cannot create export session: {reason}")]
    CannotCreateExportSession { reason: String },

    #[error("export failed: {message}")]
    ExportFailed { message: String },

    #[error("operation cancelled")]
    Cancelled,
}

/// Result type alias using ComposeError.
pub type ComposeResult<T> = Result<T, ComposeError>;

impl ComposeError {
    pub fn export_failed(msg: impl Into<String>) -> Self {
        Self::ExportFailed {
            message: msg.into(),
        }
    }

    pub fn cannot_create_session(reason: impl Into<String>) -> Self {
        Self::CannotCreateExportSession {
            reason: reason.into(),
        }
    }

    /// Whether the error came from user cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<CompositionError> for ComposeError {
    fn from(err: CompositionError) -> Self {
        Self::cannot_create_session(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ComposeError::MissingSource {
            source_id: "clip-7".into(),
        };
        assert_eq!(
            err.to_string(),
            "timeline references unknown media source `clip-7`"
        );

        let err = ComposeError::export_failed("encoder exited with status 1");
        assert_eq!(err.to_string(), "export failed: encoder exited with status 1");
    }

    #[test]
    fn test_composition_errors_become_session_errors() {
        let err: ComposeError = CompositionError::TooManyTracks { limit: 64 }.into();
        assert!(matches!(err, ComposeError::CannotCreateExportSession { .. }));
        assert!(err.to_string().contains("64 tracks"));
        assert!(!err.is_cancelled());
        assert!(ComposeError::Cancelled.is_cancelled());
    }
}
