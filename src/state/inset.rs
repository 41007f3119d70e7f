//! Archipelago inset placement.
//!
//! In the whole-country view the southern archipelago is drawn magnified in
//! the upper-left corner instead of at its true position.

use geo_types::Coord;

use crate::geo::{AffineTransform, Bounds, ProjectionConfig};

/// Region drawn as an inset.
pub const INSET_REGION: &str = "47";
/// Magnification relative to the main projection.
pub const INSET_SCALE: f64 = 2.0;
/// Geographic point placed at [`INSET_POSITION`].
pub const INSET_ANCHOR: Coord<f64> = Coord { x: 127.7, y: 26.3 };
/// Screen position of the anchor.
pub const INSET_POSITION: (f64, f64) = (100.0, 80.0);

const FRAME_PADDING: f64 = 20.0;
const FRAME_MARGIN: f64 = 10.0;
const FRAME_LABEL_SPACE: f64 = 15.0;

/// Screen rectangle framing the inset, with room for a label on top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsetFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Screen transform placing the inset region.
pub fn inset_transform(projection: &ProjectionConfig) -> AffineTransform {
    AffineTransform::inset(projection, INSET_ANCHOR, INSET_SCALE, INSET_POSITION)
}

/// Frame around the inset region's bounds.
pub fn inset_frame(bounds: &Bounds, projection: &ProjectionConfig) -> InsetFrame {
    let transform = inset_transform(projection);
    let (left, top) = transform.apply(projection.project_coord(Coord {
        x: bounds.min.x,
        y: bounds.max.y,
    }));
    let (right, bottom) = transform.apply(projection.project_coord(Coord {
        x: bounds.max.x,
        y: bounds.min.y,
    }));

    InsetFrame {
        x: left - FRAME_PADDING - FRAME_MARGIN,
        y: top - FRAME_PADDING - FRAME_MARGIN - FRAME_LABEL_SPACE,
        width: right - left + 2.0 * FRAME_PADDING,
        height: bottom - top + 2.0 * FRAME_PADDING + FRAME_LABEL_SPACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_lands_on_position() {
        let projection = ProjectionConfig::new(40.0, 400.0, 300.0, Coord { x: 137.0, y: 38.0 });
        let transform = inset_transform(&projection);
        let (x, y) = transform.apply(projection.project_coord(INSET_ANCHOR));
        assert!((x - 100.0).abs() < 1e-9);
        assert!((y - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_size() {
        let projection = ProjectionConfig::new(40.0, 400.0, 300.0, Coord { x: 137.0, y: 38.0 });
        let bounds = Bounds::new(127.0, 26.0, 128.0, 27.0);
        let frame = inset_frame(&bounds, &projection);

        // One degree at double scale is 80 px
        assert!((frame.width - (80.0 + 40.0)).abs() < 1e-9);
        assert!((frame.height - (80.0 + 40.0 + 15.0)).abs() < 1e-9);

        let (left, top) = inset_transform(&projection)
            .apply(projection.project_coord(Coord { x: 127.0, y: 27.0 }));
        assert!((frame.x - (left - 30.0)).abs() < 1e-9);
        assert!((frame.y - (top - 45.0)).abs() < 1e-9);
    }
}
