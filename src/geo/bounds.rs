//! Bounding boxes and viewport fitting.

use geo_types::Coord;

use super::{Bounds, Geometry, ProjectionConfig, Region};

/// Region left out of the whole-country extent; it is drawn as an inset.
pub const ARCHIPELAGO_REGION: &str = "47";

/// Region whose remote islands stretch the extent east and south.
pub const METROPOLITAN_REGION: &str = "13";
/// Eastern limit of the metropolitan mainland in the whole-country fit.
pub const METROPOLITAN_MAX_LNG: f64 = 142.0;
/// Southern limit of the metropolitan mainland in the whole-country fit.
pub const METROPOLITAN_MIN_LAT: f64 = 34.5;

/// Large northern region whose outlying islands are clamped.
pub const NORTHERN_REGION: &str = "01";
/// Western longitude clamp for the northern region.
pub const NORTHERN_MIN_LNG: f64 = 139.5;
/// Eastern longitude clamp for the northern region.
pub const NORTHERN_MAX_LNG: f64 = 145.5;

/// Padding used when fitting the whole dataset.
pub const DATASET_PADDING: f64 = 40.0;
/// Degrees the whole-country center is moved north, lowering the map.
pub const DATASET_CENTER_LAT_SHIFT: f64 = 2.0;
/// Extra magnification of the whole-country fit.
pub const DATASET_SCALE_BOOST: f64 = 1.1;

/// Computes the bounding box of every coordinate in the geometry.
///
/// An empty geometry yields [`Bounds::empty`].
pub fn compute_bounds(geometry: &Geometry) -> Bounds {
    geometry.coords().fold(Bounds::empty(), |mut bounds, coord| {
        bounds.include(*coord);
        bounds
    })
}

/// Fits `bounds` into a `width` x `height` viewport with `padding` on every
/// side.
///
/// The bbox center maps to the viewport center and the scale is the smaller
/// of the two axis scales, so the whole box stays visible.
pub fn fit_viewport(bounds: &Bounds, width: f64, height: f64, padding: f64) -> ProjectionConfig {
    let scale_x = (width - 2.0 * padding) / bounds.width();
    let scale_y = (height - 2.0 * padding) / bounds.height();

    ProjectionConfig {
        scale: scale_x.min(scale_y),
        translate_x: width / 2.0,
        translate_y: height / 2.0,
        center: bounds.center(),
    }
}

/// Region bounds as they contribute to the whole-country extent.
///
/// Returns `None` for regions excluded from the extent.
pub fn mainland_bounds(region: &Region) -> Option<Bounds> {
    let bounds = region.bounds;
    match region.code.as_str() {
        ARCHIPELAGO_REGION => None,
        METROPOLITAN_REGION => Some(Bounds {
            min: Coord {
                x: bounds.min.x,
                y: bounds.min.y.max(METROPOLITAN_MIN_LAT),
            },
            max: Coord {
                x: bounds.max.x.min(METROPOLITAN_MAX_LNG),
                y: bounds.max.y,
            },
        }),
        NORTHERN_REGION => Some(Bounds {
            min: Coord {
                x: bounds.min.x.max(NORTHERN_MIN_LNG),
                y: bounds.min.y,
            },
            max: Coord {
                x: bounds.max.x.min(NORTHERN_MAX_LNG),
                y: bounds.max.y,
            },
        }),
        _ => Some(bounds),
    }
}

/// Fits the whole dataset into the viewport, ignoring outlying exclaves.
///
/// Falls back to the default projection when no region contributes.
pub fn fit_dataset(regions: &[Region], width: f64, height: f64) -> ProjectionConfig {
    let extent = regions
        .iter()
        .filter_map(mainland_bounds)
        .fold(Bounds::empty(), |acc, b| acc.union(&b));

    if extent.is_empty() {
        log::debug!("No regions to fit, using default projection");
        return ProjectionConfig::default();
    }

    let mut projection = fit_viewport(&extent, width, height, DATASET_PADDING);
    projection.scale *= DATASET_SCALE_BOOST;
    projection.center.y += DATASET_CENTER_LAT_SHIFT;

    log::debug!(
        "Dataset extent {:?} -> scale {:.3}, center ({:.3}, {:.3})",
        extent,
        projection.scale,
        projection.center.x,
        projection.center.y
    );

    projection
}
