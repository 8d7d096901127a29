//! Output shape: the aspect ratio the rendered frame must have.

use serde::{Deserialize, Serialize};

/// An aspect ratio expressed as `width:height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const LANDSCAPE: AspectRatio = AspectRatio::new(16, 9);
    pub const PORTRAIT: AspectRatio = AspectRatio::new(9, 16);
    pub const SQUARE: AspectRatio = AspectRatio::new(1, 1);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height. Degenerate ratios fall back to 16:9.
    pub fn ratio(&self) -> f64 {
        if self.width == 0 || self.height == 0 {
            return Self::LANDSCAPE.ratio();
        }
        self.width as f64 / self.height as f64
    }

    /// Whether the frame is taller than it is wide.
    pub fn is_portrait(&self) -> bool {
        self.ratio() < 1.0
    }
}

/// Target framing for the rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    /// 9:16 vertical (short-form social).
    #[default]
    Portrait,
    /// 16:9 widescreen.
    Landscape,
    /// 1:1 square.
    Square,
    /// 4:5 feed portrait.
    Feed,
    /// Any other ratio.
    Custom { width: u32, height: u32 },
}

impl OutputShape {
    /// The aspect ratio this shape renders at.
    pub fn aspect_ratio(&self) -> AspectRatio {
        match *self {
            OutputShape::Portrait => AspectRatio::PORTRAIT,
            OutputShape::Landscape => AspectRatio::LANDSCAPE,
            OutputShape::Square => AspectRatio::SQUARE,
            OutputShape::Feed => AspectRatio::new(4, 5),
            OutputShape::Custom { width, height } => AspectRatio::new(width, height),
        }
    }
}
