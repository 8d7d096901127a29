//! Frame composition planning.
//!
//! Picks one render size that can hold every segment at full resolution in
//! the target aspect ratio, then fits and centres each segment inside it.

use kurbo::{Affine, Point, Rect, Size};
use reelsmith_project_model::shape::AspectRatio;
use serde::{Deserialize, Serialize};

use crate::time::{MediaTime, TimeRange};
use crate::track_builder::PlacedSegment;

/// Default floor for either render dimension.
pub const DEFAULT_MIN_RENDER_DIMENSION: u32 = 240;

/// Render canvas size in pixels. Both dimensions are even.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub fn long_edge(&self) -> u32 {
        self.width.max(self.height)
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

/// How one segment is drawn during its time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInstruction {
    pub time_range: TimeRange,
    pub source_id: String,
    /// Raw source pixels to render-space pixels.
    pub transform: Affine,
    /// Where the scaled frame lands on the canvas.
    pub content_rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePlan {
    pub render_size: RenderSize,
    /// Ordered and contiguous from zero.
    pub instructions: Vec<LayerInstruction>,
}

impl FramePlan {
    pub fn instruction_at(&self, t: MediaTime) -> Option<&LayerInstruction> {
        self.instructions.iter().find(|i| i.time_range.contains(t))
    }

    /// End of the last instruction.
    pub fn duration(&self) -> MediaTime {
        self.instructions
            .last()
            .map(|i| i.time_range.end())
            .unwrap_or(MediaTime::ZERO)
    }
}

/// Build the frame plan for placed video segments. No segments, no plan.
pub fn plan_frames(
    segments: &[PlacedSegment],
    aspect: AspectRatio,
    min_dimension: u32,
) -> Option<FramePlan> {
    if segments.is_empty() {
        return None;
    }

    let ratio = aspect.ratio();
    let min_dimension = min_dimension.max(2) as f64;

    let required_height = segments
        .iter()
        .map(|s| {
            let Size { width, height } = s.display_size;
            if width / height > ratio {
                width / ratio
            } else {
                height
            }
        })
        .fold(0.0, f64::max);

    let height = even_ceil(required_height.max(min_dimension));
    let width = even_ceil((height as f64 * ratio).max(min_dimension));
    let render_size = RenderSize { width, height };
    let canvas = Size::new(width as f64, height as f64);

    let instructions = segments
        .iter()
        .map(|segment| {
            let display = segment.display_size;
            let fit = (canvas.width / display.width).min(canvas.height / display.height);
            let content = Size::new(display.width * fit, display.height * fit);
            let origin = Point::new(
                (canvas.width - content.width) / 2.0,
                (canvas.height - content.height) / 2.0,
            );

            LayerInstruction {
                time_range: segment.time_range,
                source_id: segment.source_id.clone(),
                transform: Affine::translate(origin.to_vec2())
                    * Affine::scale(fit)
                    * segment.transform,
                content_rect: Rect::from_origin_size(origin, content),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        width,
        height,
        segments = instructions.len(),
        "Planned frame composition"
    );

    Some(FramePlan {
        render_size,
        instructions,
    })
}

/// Round up to the next even integer, tolerating float noise just above an
/// even value.
fn even_ceil(value: f64) -> u32 {
    (((value - 1e-6) / 2.0).ceil() * 2.0).max(2.0) as u32
}
