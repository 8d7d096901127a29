//! Source geometry normalization.
//!
//! Sources carry a raw pixel size plus an orientation (phone footage is
//! usually stored landscape with a 90° rotation flag). Everything downstream
//! works in display space: the upright size and a transform whose output
//! starts at the origin.

use kurbo::{Affine, Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Orientation metadata of a video track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orientation {
    /// Clockwise rotation: 0, 90, 180 or 270.
    pub rotation_degrees: u16,
    /// Horizontal flip, applied before rotation.
    #[serde(default)]
    pub mirrored: bool,
}

impl Orientation {
    pub const UPRIGHT: Orientation = Orientation {
        rotation_degrees: 0,
        mirrored: false,
    };

    /// Snap an arbitrary clockwise angle to the nearest quarter turn.
    pub fn from_degrees(degrees: f64, mirrored: bool) -> Self {
        let quarter_turns = if degrees.is_finite() {
            ((degrees / 90.0).round() as i64).rem_euclid(4)
        } else {
            0
        };
        Self {
            rotation_degrees: (quarter_turns * 90) as u16,
            mirrored,
        }
    }

    /// The preferred transform for this orientation, before re-origining.
    ///
    /// Quarter turns are built from exact coefficients; in y-down pixel space
    /// a clockwise turn of 90° maps `(x, y)` to `(-y, x)`.
    pub fn transform(&self) -> Affine {
        let rotation = match self.rotation_degrees {
            90 => Affine::new([0.0, 1.0, -1.0, 0.0, 0.0, 0.0]),
            180 => Affine::new([-1.0, 0.0, 0.0, -1.0, 0.0, 0.0]),
            270 => Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, 0.0]),
            _ => Affine::IDENTITY,
        };
        if self.mirrored {
            rotation * Affine::scale_non_uniform(-1.0, 1.0)
        } else {
            rotation
        }
    }

    /// Whether the display size swaps width and height.
    pub fn is_quarter_turn(&self) -> bool {
        matches!(self.rotation_degrees, 90 | 270)
    }
}

/// A source frame expressed in display space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedGeometry {
    /// Upright size, at least one pixel in each dimension.
    pub display_size: Size,
    /// Maps raw frame pixels into `[0, display_size]`.
    pub transform: Affine,
}

/// Normalize a raw frame size under its preferred transform.
pub fn normalize(natural_size: Size, preferred: Affine) -> NormalizedGeometry {
    let bbox = preferred.transform_rect_bbox(Rect::from_origin_size(Point::ORIGIN, natural_size));
    let display_size = Size::new(bbox.width().abs().max(1.0), bbox.height().abs().max(1.0));
    let origin = Point::new(bbox.x0.min(bbox.x1), bbox.y0.min(bbox.y1));

    NormalizedGeometry {
        display_size,
        transform: preferred.then_translate(-origin.to_vec2()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point(actual: Point, expected: (f64, f64)) {
        assert!(
            (actual.x - expected.0).abs() < 1e-9 && (actual.y - expected.1).abs() < 1e-9,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn test_upright_source_is_unchanged() {
        let geometry = normalize(Size::new(1920.0, 1080.0), Orientation::UPRIGHT.transform());
        assert_eq!(geometry.display_size, Size::new(1920.0, 1080.0));
        assert_eq!(geometry.transform, Affine::IDENTITY);
    }

    #[test]
    fn test_quarter_turn_swaps_dimensions_and_reorigins() {
        let orientation = Orientation::from_degrees(90.0, false);
        let geometry = normalize(Size::new(1920.0, 1080.0), orientation.transform());

        assert_eq!(geometry.display_size, Size::new(1080.0, 1920.0));
        assert_point(geometry.transform * Point::ORIGIN, (1080.0, 0.0));
        assert_point(geometry.transform * Point::new(1920.0, 1080.0), (0.0, 1920.0));
    }

    #[test]
    fn test_half_turn_keeps_frame_in_positive_quadrant() {
        let geometry = normalize(
            Size::new(640.0, 480.0),
            Orientation::from_degrees(180.0, false).transform(),
        );
        assert_eq!(geometry.display_size, Size::new(640.0, 480.0));
        assert_point(geometry.transform * Point::ORIGIN, (640.0, 480.0));
        assert_point(geometry.transform * Point::new(640.0, 480.0), (0.0, 0.0));
    }

    #[test]
    fn test_mirror_flips_horizontally() {
        let geometry = normalize(
            Size::new(100.0, 50.0),
            Orientation::from_degrees(0.0, true).transform(),
        );
        assert_eq!(geometry.display_size, Size::new(100.0, 50.0));
        assert_point(geometry.transform * Point::ORIGIN, (100.0, 0.0));
    }

    #[test]
    fn test_degenerate_size_is_at_least_one_pixel() {
        let geometry = normalize(Size::ZERO, Affine::IDENTITY);
        assert_eq!(geometry.display_size, Size::new(1.0, 1.0));
    }

    #[test]
    fn test_angles_snap_to_quarter_turns() {
        assert_eq!(Orientation::from_degrees(-90.0, false).rotation_degrees, 270);
        assert_eq!(Orientation::from_degrees(449.0, false).rotation_degrees, 90);
        assert_eq!(Orientation::from_degrees(44.0, false).rotation_degrees, 0);
        assert_eq!(Orientation::from_degrees(f64::NAN, false).rotation_degrees, 0);
        assert!(Orientation::from_degrees(270.0, false).is_quarter_turn());
    }
}
