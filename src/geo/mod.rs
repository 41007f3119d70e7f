//! Boundary geometry pipeline.
//!
//! This module provides functionality for projecting, fitting, deforming,
//! filtering and drawing administrative boundary geometry.

pub mod bounds;
pub mod deform;
pub mod exclave;
mod geometry;
mod path;
mod projection;

pub use bounds::{compute_bounds, fit_dataset, fit_viewport};
pub use deform::{DeformerConfig, GridDeformer, HexLattice, Lattice, LatticeKind, SquareLattice};
pub use exclave::{
    admits_sub_region, filter_exclaves, filter_sub_regions, is_remote_island, ExclaveRule,
};
pub use geometry::{ring_area, ring_center, Bounds, Geometry, PolygonRings, Region, Ring, SubRegion};
pub use path::{to_path, to_svg_path, PathCommand};
pub use projection::{project, AffineTransform, ProjectionConfig};
