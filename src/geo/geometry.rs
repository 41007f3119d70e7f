//! Boundary geometry data structures.
//!
//! Coordinates are `geo_types::Coord<f64>` with `x` = longitude and
//! `y` = latitude, both in degrees.

use geo_types::Coord;
use serde::{Deserialize, Serialize};

/// An ordered ring of coordinates. Closed rings repeat the first point last.
pub type Ring = Vec<Coord<f64>>;

/// A polygon as a list of rings; the first ring is the outer boundary.
pub type PolygonRings = Vec<Ring>;

/// Boundary geometry of a region or sub-region.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(PolygonRings),
    MultiPolygon(Vec<PolygonRings>),
}

impl Geometry {
    /// Iterates over every polygon in the geometry (one for `Polygon`).
    pub fn polygons(&self) -> impl Iterator<Item = &PolygonRings> {
        let slice: &[PolygonRings] = match self {
            Geometry::Polygon(rings) => std::slice::from_ref(rings),
            Geometry::MultiPolygon(polygons) => polygons,
        };
        slice.iter()
    }

    /// Iterates over every ring of every polygon in input order.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        self.polygons().flat_map(|polygon| polygon.iter())
    }

    /// Iterates over every coordinate of every ring.
    pub fn coords(&self) -> impl Iterator<Item = &Coord<f64>> {
        self.rings().flat_map(|ring| ring.iter())
    }

    /// Number of constituent polygons.
    pub fn polygon_count(&self) -> usize {
        match self {
            Geometry::Polygon(_) => 1,
            Geometry::MultiPolygon(polygons) => polygons.len(),
        }
    }
}

/// Axis-aligned bounding box in degrees.
///
/// Serializes as `[[west, south], [east, north]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 2]; 2]", into = "[[f64; 2]; 2]")]
pub struct Bounds {
    pub min: Coord<f64>,
    pub max: Coord<f64>,
}

impl Bounds {
    /// Creates bounds from west, south, east and north edges.
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            min: Coord { x: west, y: south },
            max: Coord { x: east, y: north },
        }
    }

    /// An inverted box that any `include` call will replace.
    pub const fn empty() -> Self {
        Self::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: (self.min.x + self.max.x) / 2.0,
            y: (self.min.y + self.max.y) / 2.0,
        }
    }

    /// Grows the box to contain `coord`.
    pub fn include(&mut self, coord: Coord<f64>) {
        self.min.x = self.min.x.min(coord.x);
        self.min.y = self.min.y.min(coord.y);
        self.max.x = self.max.x.max(coord.x);
        self.max.y = self.max.y.max(coord.y);
    }

    /// Smallest bounds covering both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        coord.x >= self.min.x
            && coord.x <= self.max.x
            && coord.y >= self.min.y
            && coord.y <= self.max.y
    }
}

impl From<[[f64; 2]; 2]> for Bounds {
    fn from([[west, south], [east, north]]: [[f64; 2]; 2]) -> Self {
        Bounds::new(west, south, east, north)
    }
}

impl From<Bounds> for [[f64; 2]; 2] {
    fn from(bounds: Bounds) -> Self {
        [[bounds.min.x, bounds.min.y], [bounds.max.x, bounds.max.y]]
    }
}

/// A top-level administrative region (prefecture).
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Two-digit zero-padded code, e.g. "13"
    pub code: String,
    pub name: String,
    pub bounds: Bounds,
    pub geometry: Geometry,
}

/// A second-level administrative unit (municipality) within a region.
#[derive(Debug, Clone, PartialEq)]
pub struct SubRegion {
    /// Administrative code, e.g. "13101"
    pub code: String,
    pub name: String,
    /// Code of the owning region
    pub region_code: String,
    pub geometry: Geometry,
}

/// Shoelace area of a ring (absolute value).
///
/// Expects a closed ring; the closing edge is not added implicitly.
pub fn ring_area(ring: &[Coord<f64>]) -> f64 {
    let sum: f64 = ring
        .windows(2)
        .map(|pair| pair[0].x * pair[1].y - pair[1].x * pair[0].y)
        .sum();
    (sum / 2.0).abs()
}

/// Mean of every ring vertex except the closing duplicate.
///
/// Returns `None` for rings with fewer than two points.
pub fn ring_center(ring: &[Coord<f64>]) -> Option<Coord<f64>> {
    let count = ring.len().checked_sub(1).filter(|&n| n > 0)?;
    let (sum_x, sum_y) = ring[..count]
        .iter()
        .fold((0.0, 0.0), |(sx, sy), c| (sx + c.x, sy + c.y));
    Some(Coord {
        x: sum_x / count as f64,
        y: sum_y / count as f64,
    })
}
