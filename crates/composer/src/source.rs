//! Resolving project location strings to readable sources.

use std::path::PathBuf;

use reelsmith_project_model::location::{LocationError, SourceLocation};
use reelsmith_project_model::project::TimelineProject;

/// Why a location cannot be consumed.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Invalid(#[from] LocationError),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Parse `raw`, resolve it against the project root, and make sure a local
/// file exists. Remote locations are accepted as-is; the probe decides
/// whether they can be read.
pub async fn resolve_readable(
    project: &TimelineProject,
    raw: &str,
) -> Result<SourceLocation, ResolveError> {
    let location = project.resolve_location(raw)?;
    ensure_exists(&location).await?;
    Ok(location)
}

/// Fail with [`ResolveError::NotFound`] if a local location has no file.
pub async fn ensure_exists(location: &SourceLocation) -> Result<(), ResolveError> {
    if let SourceLocation::Local(path) = location {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ResolveError::NotFound(path.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolution_outcomes() {
        let dir = std::env::temp_dir().join("reelsmith_test_resolve_readable");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("clip.mp4"), b"stub").unwrap();

        let mut project = TimelineProject::new("resolve");
        project.root = Some(dir.clone());

        let found = resolve_readable(&project, "clip.mp4").await.unwrap();
        assert_eq!(found, SourceLocation::Local(dir.join("clip.mp4")));

        assert!(matches!(
            resolve_readable(&project, "gone.mp4").await,
            Err(ResolveError::NotFound(_))
        ));
        assert!(matches!(
            resolve_readable(&project, "gopher://x/y").await,
            Err(ResolveError::Invalid(_))
        ));
        assert!(resolve_readable(&project, "https://cdn.test/v.mp4")
            .await
            .unwrap()
            .is_remote());

        std::fs::remove_dir_all(&dir).ok();
    }
}
