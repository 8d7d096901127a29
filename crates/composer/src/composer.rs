//! Composer facade: `build` for preview, `export` for render-to-file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use reelsmith_common::config::ComposerConfig;
use reelsmith_common::error::ReelsmithError;
use reelsmith_project_model::project::TimelineProject;
use serde::Serialize;

use crate::audio_mix::{assemble_mix, lay_overlays, probe_overlays, AudioMix};
use crate::cancel::CancelToken;
use crate::composition::Composition;
use crate::encode::{ExportProgress, ExportQuality, ExportStage, MediaEncoder, ProgressCallback};
use crate::error::{ComposeError, ComposeResult};
use crate::ffmpeg::{FfmpegEncoder, FfmpegSettings};
use crate::frame_plan::{plan_frames, FramePlan, DEFAULT_MIN_RENDER_DIMENSION};
use crate::probe::{FfprobeProbe, MediaProbe};
use crate::time::MediaTime;
use crate::track_builder::{build_video_tracks, PlacedSegment};

/// Everything a player or encoder needs. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct CompositionResult {
    pub composition: Composition,
    /// `None` when no track carries audio.
    pub audio_mix: Option<AudioMix>,
    /// `None` only for an empty video timeline.
    pub frame_plan: Option<FramePlan>,
    /// End of the video timeline. Overlays running past it are cut.
    pub duration: MediaTime,
    pub placed_segments: Vec<PlacedSegment>,
}

/// Builds compositions from timeline projects and renders them.
#[derive(Clone)]
pub struct Composer {
    probe: Arc<dyn MediaProbe>,
    encoder: Arc<dyn MediaEncoder>,
    min_render_dimension: u32,
}

impl Composer {
    pub fn new(probe: Arc<dyn MediaProbe>, encoder: Arc<dyn MediaEncoder>) -> Self {
        Self {
            probe,
            encoder,
            min_render_dimension: DEFAULT_MIN_RENDER_DIMENSION,
        }
    }

    /// A composer backed by `ffprobe` and `ffmpeg`.
    pub fn from_config(config: &ComposerConfig) -> Self {
        Self::new(
            Arc::new(FfprobeProbe::new(config.ffprobe_path.clone())),
            Arc::new(FfmpegEncoder::new(FfmpegSettings::from(config))),
        )
        .with_min_render_dimension(config.min_render_dimension)
    }

    pub fn with_min_render_dimension(mut self, min_render_dimension: u32) -> Self {
        self.min_render_dimension = min_render_dimension;
        self
    }

    /// Build a playable composition. Touches no output files.
    pub async fn build(&self, project: &TimelineProject) -> ComposeResult<CompositionResult> {
        self.build_with(project, &CancelToken::new()).await
    }

    /// [`build`](Self::build), abandoned with [`ComposeError::Cancelled`]
    /// once `cancel` fires.
    pub async fn build_with(
        &self,
        project: &TimelineProject,
        cancel: &CancelToken,
    ) -> ComposeResult<CompositionResult> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ComposeError::Cancelled),
            result = self.build_inner(project) => result,
        }
    }

    async fn build_inner(&self, project: &TimelineProject) -> ComposeResult<CompositionResult> {
        if project.video_entries.is_empty() {
            return Err(ComposeError::NoTimelineClips);
        }

        let started = Instant::now();
        tracing::info!(
            project = %project.name,
            video_entries = project.video_entries.len(),
            audio_entries = project.audio_entries.len(),
            narration_entries = project.narration_entries.len(),
            probe = self.probe.name(),
            "Building composition"
        );

        let mut composition = Composition::new();
        let (video, overlays) = tokio::join!(
            build_video_tracks(project, &mut composition, self.probe.as_ref()),
            probe_overlays(project, Arc::clone(&self.probe)),
        );
        let video = video?;

        let overlay_gains = lay_overlays(&mut composition, overlays)?;
        let audio_mix = assemble_mix(video.audio_track, overlay_gains);
        let frame_plan = plan_frames(
            &video.placed,
            project.output_shape.aspect_ratio(),
            self.min_render_dimension,
        );

        tracing::info!(
            duration = %video.end,
            segments = video.placed.len(),
            tracks = composition.tracks().len(),
            render_width = frame_plan.as_ref().map(|p| p.render_size.width),
            render_height = frame_plan.as_ref().map(|p| p.render_size.height),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Composition built"
        );

        Ok(CompositionResult {
            composition,
            audio_mix,
            frame_plan,
            duration: video.end,
            placed_segments: video.placed,
        })
    }

    /// Render `project` to `destination`, replacing any existing file.
    pub async fn export(
        &self,
        project: &TimelineProject,
        destination: &Path,
        quality: ExportQuality,
    ) -> ComposeResult<()> {
        self.export_with(project, destination, quality, None, &CancelToken::new())
            .await
    }

    /// [`export`](Self::export) with progress reporting and cancellation.
    ///
    /// On failure or cancellation the partial destination file is removed.
    pub async fn export_with(
        &self,
        project: &TimelineProject,
        destination: &Path,
        quality: ExportQuality,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ComposeResult<()> {
        tracing::info!(
            output = %destination.display(),
            %quality,
            encoder = self.encoder.name(),
            "Starting export"
        );
        report(&progress, ExportProgress::stage(ExportStage::Preparing, 0));

        let result = self.build_with(project, cancel).await?;

        if !self.encoder.is_available().await {
            return Err(ComposeError::cannot_create_session(format!(
                "encoder `{}` is not available",
                self.encoder.name()
            )));
        }
        if result.frame_plan.is_none() {
            return Err(ComposeError::cannot_create_session("composition has no frame plan"));
        }
        let preset = quality
            .preset_chain()
            .iter()
            .copied()
            .find(|preset| {
                let supported = self.encoder.supports(*preset, &result);
                if !supported {
                    tracing::debug!(%preset, "Encoder does not support preset, falling back");
                }
                supported
            })
            .ok_or_else(|| {
                ComposeError::cannot_create_session(format!(
                    "no {quality} preset is supported by `{}`",
                    self.encoder.name()
                ))
            })?;

        prepare_destination(destination).await?;
        let guard = PartialOutputGuard::new(destination);

        tracing::info!(%preset, "Encoding with preset");
        let encoded = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ReelsmithError::Cancelled),
            encoded = self.encoder.encode(&result, destination, preset, progress.clone(), cancel) => encoded,
        };

        match encoded {
            Ok(()) => {
                guard.disarm();
                report(
                    &progress,
                    ExportProgress::stage(ExportStage::Complete, 0),
                );
                tracing::info!(output = %destination.display(), "Export finished");
                Ok(())
            }
            Err(ReelsmithError::Cancelled) => {
                tracing::info!(output = %destination.display(), "Export cancelled");
                Err(ComposeError::Cancelled)
            }
            Err(e) => {
                tracing::warn!(error = %e, output = %destination.display(), "Export failed");
                report(&progress, ExportProgress::stage(ExportStage::Failed, 0));
                Err(ComposeError::export_failed(e.to_string()))
            }
        }
    }
}

fn report(progress: &Option<ProgressCallback>, update: ExportProgress) {
    if let Some(cb) = progress {
        cb(update);
    }
}

/// Create the parent directory and remove any previous output.
async fn prepare_destination(destination: &Path) -> ComposeResult<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            ComposeError::cannot_create_session(format!(
                "cannot create {}: {e}",
                parent.display()
            ))
        })?;
    }
    match tokio::fs::remove_file(destination).await {
        Ok(()) => {
            tracing::debug!(output = %destination.display(), "Removed previous export");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ComposeError::cannot_create_session(format!(
            "cannot replace {}: {e}",
            destination.display()
        ))),
    }
}

/// Removes the destination on drop unless the export completed.
struct PartialOutputGuard {
    path: Option<PathBuf>,
}

impl PartialOutputGuard {
    fn new(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
        }
    }

    fn disarm(mut self) {
        self.path = None;
    }
}

impl Drop for PartialOutputGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed partial export"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial export")
                }
            }
        }
    }
}
