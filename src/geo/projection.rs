//! Map projection and coordinate transformation.
//!
//! Converts geographic coordinates (lng/lat) to planar screen coordinates
//! using a simple scaled equirectangular mapping with the y-axis pointing
//! down.

use geo_types::Coord;
use serde::{Deserialize, Serialize};

/// Projection parameters for converting geographic to planar coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Planar units per degree
    pub scale: f64,
    /// Planar x the center longitude maps to
    pub translate_x: f64,
    /// Planar y the center latitude maps to
    pub translate_y: f64,
    /// Geographic center of the view
    pub center: Coord<f64>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        // Whole-country view for an 800x600 viewport
        Self {
            scale: 30.0,
            translate_x: 400.0,
            translate_y: 300.0,
            center: Coord { x: 138.0, y: 38.0 },
        }
    }
}

impl ProjectionConfig {
    /// Creates a projection centered on `center`.
    pub fn new(scale: f64, translate_x: f64, translate_y: f64, center: Coord<f64>) -> Self {
        Self {
            scale,
            translate_x,
            translate_y,
            center,
        }
    }

    /// Projects a coordinate. See [`project`].
    pub fn project_coord(&self, coord: Coord<f64>) -> (f64, f64) {
        project(coord.x, coord.y, self)
    }

    /// True when every parameter is finite.
    pub fn is_finite(&self) -> bool {
        self.scale.is_finite()
            && self.translate_x.is_finite()
            && self.translate_y.is_finite()
            && self.center.x.is_finite()
            && self.center.y.is_finite()
    }
}

/// Converts a longitude/latitude pair to planar coordinates.
///
/// Non-finite input or output is replaced by `(0, 0)` after logging a
/// warning, so downstream drawing commands never carry NaN or infinity.
/// The substituted origin carries no meaning.
pub fn project(lng: f64, lat: f64, config: &ProjectionConfig) -> (f64, f64) {
    if !lng.is_finite() || !lat.is_finite() {
        log::warn!("Invalid coordinates for projection: lng={}, lat={}", lng, lat);
        return (0.0, 0.0);
    }

    let x = (lng - config.center.x) * config.scale + config.translate_x;
    let y = (config.center.y - lat) * config.scale + config.translate_y;

    if !x.is_finite() || !y.is_finite() {
        log::warn!(
            "Projection produced non-finite values: x={}, y={} (lng={}, lat={}, {:?})",
            x,
            y,
            lng,
            lat,
            config
        );
        return (0.0, 0.0);
    }

    (x, y)
}

/// Secondary scale/translate applied after projection.
///
/// Used to place an inset region at a fixed screen location distinct from
/// its geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl AffineTransform {
    /// Creates a uniform scale followed by a translation.
    pub fn new(scale: f64, translate_x: f64, translate_y: f64) -> Self {
        Self {
            scale,
            translate_x,
            translate_y,
        }
    }

    /// Transform that leaves points unchanged.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Applies the transform to a planar point.
    pub fn apply(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            x * self.scale + self.translate_x,
            y * self.scale + self.translate_y,
        )
    }

    /// Transform that magnifies the view around `anchor` by `scale` and
    /// moves the anchor to `target` on screen.
    pub fn inset(
        projection: &ProjectionConfig,
        anchor: Coord<f64>,
        scale: f64,
        target: (f64, f64),
    ) -> Self {
        let (ax, ay) = projection.project_coord(anchor);
        Self::new(scale, target.0 - ax * scale, target.1 - ay * scale)
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center_maps_to_translate() {
        let config = ProjectionConfig::new(50.0, 400.0, 300.0, Coord { x: 139.0, y: 35.0 });
        assert_eq!(project(139.0, 35.0, &config), (400.0, 300.0));
    }

    #[test]
    fn test_project_inverts_y_axis() {
        let config = ProjectionConfig::new(10.0, 0.0, 0.0, Coord { x: 0.0, y: 0.0 });
        let (x, y) = project(1.0, 1.0, &config);
        assert_eq!(x, 10.0);
        assert_eq!(y, -10.0);
    }

    #[test]
    fn test_project_finite_for_finite_input() {
        let config = ProjectionConfig::default();
        for lng in [-180.0, -12.5, 0.0, 127.7, 145.9, 180.0] {
            for lat in [-90.0, 0.0, 24.3, 45.5, 90.0] {
                let (x, y) = project(lng, lat, &config);
                assert!(x.is_finite() && y.is_finite());
            }
        }
    }

    #[test]
    fn test_project_non_finite_input_returns_origin() {
        let config = ProjectionConfig::default();
        assert_eq!(project(f64::NAN, 35.0, &config), (0.0, 0.0));
        assert_eq!(project(139.0, f64::INFINITY, &config), (0.0, 0.0));
    }

    #[test]
    fn test_project_non_finite_result_returns_origin() {
        let config = ProjectionConfig::new(f64::MAX, 0.0, 0.0, Coord { x: -1.0e308, y: 0.0 });
        assert_eq!(project(1.0e308, 0.0, &config), (0.0, 0.0));
    }

    #[test]
    fn test_inset_transform_places_anchor_at_target() {
        let projection = ProjectionConfig::default();
        let anchor = Coord { x: 127.7, y: 26.3 };
        let transform = AffineTransform::inset(&projection, anchor, 2.0, (100.0, 80.0));
        let (x, y) = transform.apply(projection.project_coord(anchor));
        assert!((x - 100.0).abs() < 1e-9);
        assert!((y - 80.0).abs() < 1e-9);

        // One degree east lands twice as far as in the base projection
        let (x1, _) = transform.apply(projection.project_coord(Coord { x: 128.7, y: 26.3 }));
        assert!((x1 - 100.0 - 2.0 * projection.scale).abs() < 1e-9);
    }
}
