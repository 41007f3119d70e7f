//! Map selection state.
//!
//! `MapSelector` owns the loaded regions and the view state. Every mutating
//! operation returns the event it produced (if any) instead of notifying
//! listeners, so the embedding UI decides how to react.

mod inset;
mod selector;

pub use inset::{inset_frame, inset_transform, InsetFrame, INSET_ANCHOR, INSET_REGION};
pub use selector::{MapSelector, METROPOLITAN_MAINLAND_BOUNDS, REMOTE_ISLANDS_BOUNDS};

use crate::geo::ProjectionConfig;

/// Observable view state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapState {
    /// Code of the selected region; `None` in the whole-country view
    pub selected_region: Option<String>,
    pub hovered_region: Option<String>,
    pub hovered_sub_region: Option<String>,
    /// Metropolitan region only: show the remote islands instead of the
    /// mainland
    pub show_remote_islands: bool,
    /// Geometry is snapped to the configured lattice before drawing
    pub grid_mode: bool,
    pub projection: ProjectionConfig,
}

/// What changed as the result of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapEvent {
    Initialized,
    RegionSelected(String),
    SubRegionSelected(String),
    StateChanged,
}
