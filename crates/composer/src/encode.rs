//! Export presets, progress reporting, and the encoder seam.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use reelsmith_common::error::{ReelsmithError, ReelsmithResult};
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::composer::CompositionResult;
use crate::frame_plan::RenderSize;

/// Requested export quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportQuality {
    /// Up to 720p.
    Standard,
    /// Up to 1080p.
    #[default]
    High,
    /// Up to 4K.
    Ultra,
}

impl ExportQuality {
    /// Presets to try, best first.
    pub fn preset_chain(&self) -> &'static [ExportPreset] {
        use ExportPreset::*;
        match self {
            ExportQuality::Ultra => &[Uhd3840x2160, HighestQuality, Hd1920x1080, Hd1280x720, MediumQuality],
            ExportQuality::High => &[Hd1920x1080, HighestQuality, Hd1280x720, MediumQuality],
            ExportQuality::Standard => &[Hd1280x720, HighestQuality, MediumQuality],
        }
    }
}

impl fmt::Display for ExportQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportQuality::Standard => "standard",
            ExportQuality::High => "high",
            ExportQuality::Ultra => "ultra",
        })
    }
}

impl FromStr for ExportQuality {
    type Err = ReelsmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "720p" => Ok(ExportQuality::Standard),
            "high" | "1080p" => Ok(ExportQuality::High),
            "ultra" | "4k" | "2160p" => Ok(ExportQuality::Ultra),
            other => Err(ReelsmithError::config(format!(
                "unknown export quality `{other}` (expected standard, high, or ultra)"
            ))),
        }
    }
}

/// An encoder output preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPreset {
    Uhd3840x2160,
    Hd1920x1080,
    Hd1280x720,
    /// Render size, no downscale.
    HighestQuality,
    /// Adaptive, bounded to 960x540.
    MediumQuality,
}

impl ExportPreset {
    /// Landscape bounding box of the output; `None` keeps the render size.
    pub fn bounding_box(&self) -> Option<(u32, u32)> {
        match self {
            ExportPreset::Uhd3840x2160 => Some((3840, 2160)),
            ExportPreset::Hd1920x1080 => Some((1920, 1080)),
            ExportPreset::Hd1280x720 => Some((1280, 720)),
            ExportPreset::MediumQuality => Some((960, 540)),
            ExportPreset::HighestQuality => None,
        }
    }

    /// Output frame size for a render canvas.
    ///
    /// The box is oriented to match the canvas, the canvas is fitted inside
    /// it without upscaling, and both dimensions stay even.
    pub fn output_size(&self, render: RenderSize) -> RenderSize {
        let Some((long, short)) = self.bounding_box() else {
            return render;
        };
        let (box_w, box_h) = if render.is_portrait() {
            (short, long)
        } else {
            (long, short)
        };

        let scale = (box_w as f64 / render.width.max(1) as f64)
            .min(box_h as f64 / render.height.max(1) as f64)
            .min(1.0);
        RenderSize {
            width: even_floor(render.width as f64 * scale),
            height: even_floor(render.height as f64 * scale),
        }
    }

    /// x264/x265 constant rate factor.
    pub fn crf(&self) -> u8 {
        match self {
            ExportPreset::Uhd3840x2160 | ExportPreset::HighestQuality => 18,
            ExportPreset::Hd1920x1080 => 20,
            ExportPreset::Hd1280x720 => 23,
            ExportPreset::MediumQuality => 26,
        }
    }
}

impl fmt::Display for ExportPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportPreset::Uhd3840x2160 => "3840x2160",
            ExportPreset::Hd1920x1080 => "1920x1080",
            ExportPreset::Hd1280x720 => "1280x720",
            ExportPreset::HighestQuality => "highest",
            ExportPreset::MediumQuality => "medium",
        })
    }
}

fn even_floor(value: f64) -> u32 {
    (((value + 1e-6) / 2.0).floor() * 2.0).max(2.0) as u32
}

/// Progress callback for export rendering.
pub type ProgressCallback = Arc<dyn Fn(ExportProgress) + Send + Sync>;

/// Export progress report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames rendered so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

impl ExportProgress {
    pub fn stage(stage: ExportStage, total_frames: u64) -> Self {
        let done = matches!(stage, ExportStage::Complete);
        Self {
            progress: if done { 1.0 } else { 0.0 },
            frames_rendered: if done { total_frames } else { 0 },
            total_frames,
            eta_secs: 0.0,
            stage,
        }
    }
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// Renders a composition result to a file.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    /// Encoder name, for logs.
    fn name(&self) -> &str;

    /// Check if this encoder can run on the system.
    async fn is_available(&self) -> bool;

    /// Whether `preset` can be produced for `result`.
    fn supports(&self, preset: ExportPreset, result: &CompositionResult) -> bool;

    /// Write `result` to `destination`, which does not exist on entry.
    /// Return [`ReelsmithError::Cancelled`] if `cancel` fires first.
    async fn encode(
        &self,
        result: &CompositionResult,
        destination: &Path,
        preset: ExportPreset,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ReelsmithResult<()>;
}
