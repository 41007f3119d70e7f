//! Prefecture and municipality map core.
//!
//! Projects Japanese administrative boundaries onto a 2-D drawing surface
//! for interactive selection:
//!
//! - [`geo`]: projection, viewport fitting, lattice deformation, exclave
//!   filtering and path generation
//! - [`data`]: GeoJSON decoding and the precision-tiered region loader
//! - [`state`]: selection and view state
//! - [`config`]: serde configuration
//!
//! The crate only emits `log` records; installing a logger is up to the
//! embedding application.

pub mod config;
pub mod data;
pub mod geo;
pub mod state;

pub use config::MapConfig;
pub use data::{DynamicDataLoader, Fetcher, LoadError, Precision};
pub use geo::{Bounds, Geometry, ProjectionConfig, Region, SubRegion};
pub use state::{MapEvent, MapSelector, MapState};
