//! Lattice-snapped polygon deformation.
//!
//! Snaps boundary vertices onto a regular lattice to produce a stylized
//! version of each shape. A single [`GridDeformer`] handles both the square
//! grid and the hexagonal variant; the variants differ only in the lattice
//! snap, the duplicate-removal rule and what happens to rings that collapse.
//!
//! Collapsed rings never produce an error. Depending on the policy they
//! become a small synthetic square or stay as they were.

use std::collections::HashSet;
use std::fmt;

use geo_types::Coord;
use serde::{Deserialize, Serialize};

use super::geometry::{ring_area, ring_center};
use super::{Geometry, PolygonRings, Region, Ring, SubRegion};

/// Grid size used for regions without a tuned entry, in degrees.
pub const DEFAULT_GRID_SIZE: f64 = 0.1;

/// Per-region grid sizes: coarser for the large northern region, finer for
/// the dense island region and the metropolitan region.
pub const REGION_GRID_SIZES: &[(&str, f64)] = &[("01", 0.2), ("47", 0.05), ("13", 0.02)];

/// Collapsed rings larger than this fraction of a grid cell become a
/// synthetic square.
const SYNTHETIC_AREA_RATIO: f64 = 0.1;

/// Multi-polygon members smaller than this fraction of a grid cell are
/// dropped as noise.
const NOISE_AREA_RATIO: f64 = 0.01;

/// Returns the tuned grid size for a region code.
pub fn grid_size_for_region(region_code: &str) -> f64 {
    REGION_GRID_SIZES
        .iter()
        .find(|(code, _)| *code == region_code)
        .map(|(_, size)| *size)
        .unwrap_or(DEFAULT_GRID_SIZE)
}

/// A lattice that coordinates can be snapped onto.
pub trait Lattice: fmt::Debug {
    /// Returns the lattice point nearest to `coord` for cell size `size`.
    fn snap(&self, coord: Coord<f64>, size: f64) -> Coord<f64>;
}

/// Rounds half up, so `-0.5` goes to `0` and `0.5` goes to `1`.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Square grid with spacing `size` on both axes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquareLattice;

impl Lattice for SquareLattice {
    fn snap(&self, coord: Coord<f64>, size: f64) -> Coord<f64> {
        Coord {
            x: round_half_up(coord.x / size) * size,
            y: round_half_up(coord.y / size) * size,
        }
    }
}

/// Staggered ("brick") hexagonal lattice.
///
/// Columns are `2·size` apart and rows `size·√3` apart; odd rows are shifted
/// east by `size`. Row parity uses the Euclidean remainder, so negative odd
/// rows shift east as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct HexLattice;

impl Lattice for HexLattice {
    fn snap(&self, coord: Coord<f64>, size: f64) -> Coord<f64> {
        let a = size * 2.0;
        let b = size * 3f64.sqrt();

        let i = round_half_up(coord.x / a);
        let j = round_half_up(coord.y / b);

        let offset = if j.rem_euclid(2.0) == 1.0 { size } else { 0.0 };

        Coord {
            x: i * a + offset,
            y: j * b,
        }
    }
}

/// How repeated snapped points are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupRule {
    /// Drop any point already seen anywhere earlier in the ring.
    SeenSet,
    /// Drop a point only when it equals the one right before it.
    Consecutive,
}

/// What a ring with fewer than three distinct snapped points becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DegeneratePolicy {
    /// A square around the snapped centroid when the original is large
    /// enough, else the original ring.
    SyntheticSquare,
    /// Always the original ring.
    KeepOriginal,
}

/// Lattice family selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LatticeKind {
    #[default]
    Square,
    Hexagonal,
}

/// Deformer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeformerConfig {
    /// Lattice cell size in degrees
    pub grid_size: f64,
    /// Remove duplicate points and repair collapsed rings
    pub preserve_topology: bool,
    pub lattice: LatticeKind,
}

impl Default for DeformerConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            preserve_topology: true,
            lattice: LatticeKind::Square,
        }
    }
}

impl DeformerConfig {
    pub fn with_grid_size(mut self, grid_size: f64) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_preserve_topology(mut self, preserve_topology: bool) -> Self {
        self.preserve_topology = preserve_topology;
        self
    }

    pub fn with_lattice(mut self, lattice: LatticeKind) -> Self {
        self.lattice = lattice;
        self
    }
}

/// Snaps geometry onto a lattice.
#[derive(Debug)]
pub struct GridDeformer {
    lattice: Box<dyn Lattice>,
    grid_size: f64,
    preserve_topology: bool,
    dedup: DedupRule,
    degenerate: DegeneratePolicy,
}

impl Default for GridDeformer {
    fn default() -> Self {
        Self::new(&DeformerConfig::default())
    }
}

impl GridDeformer {
    /// Creates the deformer variant selected by `config.lattice`.
    pub fn new(config: &DeformerConfig) -> Self {
        match config.lattice {
            LatticeKind::Square => Self::square(config.grid_size, config.preserve_topology),
            LatticeKind::Hexagonal => {
                Self::hexagonal(config.grid_size, config.preserve_topology)
            }
        }
    }

    /// Square grid, full seen-set dedup, synthetic-square repair.
    pub fn square(grid_size: f64, preserve_topology: bool) -> Self {
        Self::with_lattice(
            Box::new(SquareLattice),
            grid_size,
            preserve_topology,
            DedupRule::SeenSet,
            DegeneratePolicy::SyntheticSquare,
        )
    }

    /// Hexagonal grid, consecutive dedup, collapsed rings kept as-is.
    pub fn hexagonal(grid_size: f64, preserve_topology: bool) -> Self {
        Self::with_lattice(
            Box::new(HexLattice),
            grid_size,
            preserve_topology,
            DedupRule::Consecutive,
            DegeneratePolicy::KeepOriginal,
        )
    }

    /// Creates a deformer from explicit parts.
    pub fn with_lattice(
        lattice: Box<dyn Lattice>,
        grid_size: f64,
        preserve_topology: bool,
        dedup: DedupRule,
        degenerate: DegeneratePolicy,
    ) -> Self {
        Self {
            lattice,
            grid_size,
            preserve_topology,
            dedup,
            degenerate,
        }
    }

    /// Returns the current cell size in degrees.
    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    /// Sets the cell size in degrees.
    pub fn set_grid_size(&mut self, grid_size: f64) {
        self.grid_size = grid_size;
    }

    /// Switches to the tuned grid size for a region.
    pub fn adjust_for_region(&mut self, region_code: &str) {
        self.grid_size = grid_size_for_region(region_code);
        log::debug!(
            "Grid size for region {} set to {}",
            region_code,
            self.grid_size
        );
    }

    fn snap(&self, coord: Coord<f64>) -> Coord<f64> {
        self.lattice.snap(coord, self.grid_size)
    }

    fn cell_area(&self) -> f64 {
        self.grid_size * self.grid_size
    }

    /// Snaps one ring.
    ///
    /// With topology preservation the result is either a closed ring of at
    /// least three distinct points or, for collapsed rings, whatever the
    /// degenerate policy yields. An empty ring stays empty.
    pub fn deform_ring(&self, ring: &[Coord<f64>]) -> Ring {
        let snapped: Ring = ring.iter().map(|c| self.snap(*c)).collect();

        if !self.preserve_topology {
            return snapped;
        }

        let mut unique = match self.dedup {
            DedupRule::SeenSet => dedup_seen(snapped),
            DedupRule::Consecutive => dedup_consecutive(snapped),
        };

        if unique.len() < 3 {
            return self.collapsed_ring(ring);
        }

        if unique.first() != unique.last() {
            unique.push(unique[0]);
        }

        unique
    }

    fn collapsed_ring(&self, original: &[Coord<f64>]) -> Ring {
        if self.degenerate == DegeneratePolicy::KeepOriginal {
            return original.to_vec();
        }

        let area = ring_area(original);
        match ring_center(original) {
            Some(center) if area > self.cell_area() * SYNTHETIC_AREA_RATIO => {
                square_around(self.snap(center), self.grid_size / 2.0)
            }
            // Too small to show on the grid; leave it intact
            _ => original.to_vec(),
        }
    }

    fn deform_polygon(&self, polygon: &[Ring]) -> PolygonRings {
        polygon.iter().map(|ring| self.deform_ring(ring)).collect()
    }

    /// Deforms a whole geometry.
    ///
    /// Multi-polygon members whose deformed outer ring falls below the noise
    /// threshold are dropped. If nothing survives, the largest member of the
    /// input is replaced by a one-cell square so the region stays visible.
    /// A single survivor is returned as a `Polygon`.
    pub fn deform_geometry(&self, geometry: &Geometry) -> Geometry {
        match geometry {
            Geometry::Polygon(rings) => Geometry::Polygon(self.deform_polygon(rings)),
            Geometry::MultiPolygon(polygons) => {
                let min_area = self.cell_area() * NOISE_AREA_RATIO;

                let mut kept: Vec<PolygonRings> = polygons
                    .iter()
                    .map(|polygon| self.deform_polygon(polygon))
                    .filter(|rings| {
                        rings
                            .first()
                            .map_or(true, |outer| ring_area(outer) >= min_area)
                    })
                    .collect();

                match kept.len() {
                    0 => self.largest_member_square(polygons).unwrap_or_else(|| {
                        log::debug!("Multi-polygon has no area to deform");
                        Geometry::MultiPolygon(Vec::new())
                    }),
                    1 => Geometry::Polygon(kept.remove(0)),
                    _ => Geometry::MultiPolygon(kept),
                }
            }
        }
    }

    /// Square around the largest outer ring of the undeformed input.
    fn largest_member_square(&self, polygons: &[PolygonRings]) -> Option<Geometry> {
        let mut largest: Option<(&Ring, f64)> = None;
        for outer in polygons.iter().filter_map(|p| p.first()) {
            let area = ring_area(outer);
            if area > largest.map_or(0.0, |(_, a)| a) {
                largest = Some((outer, area));
            }
        }

        let (outer, _) = largest?;
        let center = ring_center(outer)?;
        Some(Geometry::Polygon(vec![square_around(
            self.snap(center),
            self.grid_size,
        )]))
    }

    /// Returns a copy of the region with deformed geometry.
    pub fn deform_region(&self, region: &Region) -> Region {
        Region {
            geometry: self.deform_geometry(&region.geometry),
            ..region.clone()
        }
    }

    /// Returns a copy of the sub-region with deformed geometry.
    pub fn deform_sub_region(&self, sub_region: &SubRegion) -> SubRegion {
        SubRegion {
            geometry: self.deform_geometry(&sub_region.geometry),
            ..sub_region.clone()
        }
    }
}

/// Hashable identity of a coordinate; `-0.0` and `0.0` compare equal.
fn coord_key(coord: &Coord<f64>) -> (u64, u64) {
    ((coord.x + 0.0).to_bits(), (coord.y + 0.0).to_bits())
}

fn dedup_seen(points: Ring) -> Ring {
    let mut seen = HashSet::with_capacity(points.len());
    points
        .into_iter()
        .filter(|c| seen.insert(coord_key(c)))
        .collect()
}

fn dedup_consecutive(mut points: Ring) -> Ring {
    points.dedup();
    points
}

/// Closed axis-aligned square, counter-clockwise from the south-west corner.
fn square_around(center: Coord<f64>, half_width: f64) -> Ring {
    let (x, y, h) = (center.x, center.y, half_width);
    vec![
        Coord { x: x - h, y: y - h },
        Coord { x: x + h, y: y - h },
        Coord { x: x + h, y: y + h },
        Coord { x: x - h, y: y + h },
        Coord { x: x - h, y: y - h },
    ]
}
