//! Export a project to video.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reelsmith_common::config::AppConfig;
use reelsmith_composer::{
    CancelToken, ComposeError, Composer, ExportProgress, ExportQuality, ProgressCallback,
};
use reelsmith_project_model::project::TimelineProject;

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    output: PathBuf,
    quality: Option<String>,
) -> anyhow::Result<()> {
    println!("Exporting project at: {}", path.display());

    let project =
        TimelineProject::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    let quality: ExportQuality = quality
        .as_deref()
        .unwrap_or(config.composer.default_quality.as_str())
        .parse()?;

    println!("  Output: {}", output.display());
    println!("  Quality: {quality}");

    let progress: ProgressCallback = Arc::new(|p: ExportProgress| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        );
        let _ = std::io::stdout().flush();
    });

    let cancel = CancelToken::new();
    let on_interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, cancelling export");
                cancel.cancel();
            }
        })
    };

    let composer = Composer::from_config(&config.composer);
    let outcome = composer
        .export_with(&project, &output, quality, Some(progress), &cancel)
        .await;
    on_interrupt.abort();

    report_outcome(outcome, &output)
}

/// Map an export outcome to the command's result. Cancellation is an error
/// so the process exits non-zero.
fn report_outcome(outcome: Result<(), ComposeError>, output: &Path) -> anyhow::Result<()> {
    match outcome {
        Ok(()) => {
            println!("\nExport complete: {}", output.display());
            Ok(())
        }
        Err(ComposeError::Cancelled) => {
            println!("\nExport cancelled.");
            Err(anyhow::anyhow!("Export cancelled before completion"))
        }
        Err(e) => Err(anyhow::anyhow!("Export failed: {e}")),
    }
}
