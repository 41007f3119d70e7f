use std::borrow::Cow;
use std::rc::Rc;

use super::inset::{inset_frame, inset_transform, InsetFrame, INSET_REGION};
use super::{MapEvent, MapState};
use crate::config::{MapConfig, ViewportConfig};
use crate::geo::bounds::METROPOLITAN_REGION;
use crate::geo::{
    admits_sub_region, filter_exclaves, fit_dataset, fit_viewport, is_remote_island, to_path,
    to_svg_path, Bounds, DeformerConfig, Geometry, GridDeformer, PathCommand, ProjectionConfig,
    Region, SubRegion,
};

/// Mainland part of the metropolitan region, used when it is selected.
pub const METROPOLITAN_MAINLAND_BOUNDS: Bounds = Bounds::new(138.5, 35.3, 140.0, 36.0);

/// Island chains of the metropolitan region, used by the island toggle.
pub const REMOTE_ISLANDS_BOUNDS: Bounds = Bounds::new(138.0, 24.0, 143.0, 35.0);

/// Selection, hover and view state over a loaded set of regions.
#[derive(Debug)]
pub struct MapSelector {
    viewport: ViewportConfig,
    deformer: DeformerConfig,
    regions: Vec<Region>,
    /// Flat sub-regions loaded with the dataset, possibly empty
    sub_regions: Vec<SubRegion>,
    /// Sub-regions loaded on demand for one region
    loaded: Option<(String, Rc<Vec<SubRegion>>)>,
    state: MapState,
}

impl MapSelector {
    /// Creates a selector over a dataset, starting in the whole-country view.
    pub fn new(config: &MapConfig, regions: Vec<Region>, sub_regions: Vec<SubRegion>) -> Self {
        let mut selector = Self {
            viewport: config.viewport.clone(),
            deformer: config.deformer.clone(),
            regions: Vec::new(),
            sub_regions: Vec::new(),
            loaded: None,
            state: MapState::default(),
        };
        selector.initialize(regions, sub_regions);
        selector
    }

    /// Replaces the dataset and returns to the whole-country view.
    pub fn initialize(
        &mut self,
        regions: Vec<Region>,
        sub_regions: Vec<SubRegion>,
    ) -> Option<MapEvent> {
        log::info!(
            "Initializing map with {} regions and {} sub-regions",
            regions.len(),
            sub_regions.len()
        );
        self.regions = regions;
        self.sub_regions = sub_regions;
        self.loaded = None;
        self.state = MapState {
            grid_mode: self.state.grid_mode,
            projection: self.dataset_projection(),
            ..Default::default()
        };
        Some(MapEvent::Initialized)
    }

    /// Returns the current view state.
    pub fn state(&self) -> &MapState {
        &self.state
    }

    /// Returns all loaded regions.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Looks up a loaded region by code.
    pub fn region(&self, code: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.code == code)
    }

    /// Returns the selected region, if any.
    pub fn selected_region(&self) -> Option<&Region> {
        self.state
            .selected_region
            .as_deref()
            .and_then(|code| self.region(code))
    }

    fn dataset_projection(&self) -> ProjectionConfig {
        fit_dataset(&self.regions, self.viewport.width, self.viewport.height)
    }

    fn fit(&mut self, bounds: &Bounds) {
        self.state.projection = fit_viewport(
            bounds,
            self.viewport.width,
            self.viewport.height,
            self.viewport.padding,
        );
    }

    /// Selects a region and fits the view to it.
    ///
    /// The metropolitan region is fitted to its mainland only. Unknown codes
    /// leave the state untouched.
    pub fn select_region(&mut self, code: &str) -> Option<MapEvent> {
        let Some(region) = self.region(code) else {
            log::warn!("Cannot select unknown region {}", code);
            return None;
        };

        let bounds = if code == METROPOLITAN_REGION {
            METROPOLITAN_MAINLAND_BOUNDS
        } else {
            region.bounds
        };

        self.state.selected_region = Some(code.to_string());
        self.state.show_remote_islands = false;
        self.fit(&bounds);
        log::debug!("Selected region {}", code);
        Some(MapEvent::RegionSelected(code.to_string()))
    }

    /// Reports a sub-region selection if the code is known.
    pub fn select_sub_region(&self, code: &str) -> Option<MapEvent> {
        self.find_sub_region(code)
            .map(|sub| MapEvent::SubRegionSelected(sub.code.clone()))
    }

    fn loaded_for_selection(&self) -> Option<&[SubRegion]> {
        match (&self.loaded, &self.state.selected_region) {
            (Some((code, subs)), Some(selected)) if code == selected => Some(subs.as_slice()),
            _ => None,
        }
    }

    fn find_sub_region(&self, code: &str) -> Option<&SubRegion> {
        self.loaded_for_selection()
            .into_iter()
            .flatten()
            .chain(self.sub_regions.iter())
            .find(|sub| sub.code == code)
    }

    /// Sets the hovered region. Only a change of code produces an event.
    pub fn hover_region(&mut self, code: Option<&str>) -> Option<MapEvent> {
        let hovered = code
            .and_then(|code| self.region(code))
            .map(|region| region.code.clone());
        if hovered == self.state.hovered_region {
            return None;
        }
        self.state.hovered_region = hovered;
        Some(MapEvent::StateChanged)
    }

    /// Sets the hovered sub-region. Only a change of code produces an event.
    pub fn hover_sub_region(&mut self, code: Option<&str>) -> Option<MapEvent> {
        let hovered = code
            .and_then(|code| self.find_sub_region(code))
            .map(|sub| sub.code.clone());
        if hovered == self.state.hovered_sub_region {
            return None;
        }
        self.state.hovered_sub_region = hovered;
        Some(MapEvent::StateChanged)
    }

    /// Returns to the whole-country view.
    pub fn reset_view(&mut self) -> Option<MapEvent> {
        self.state.selected_region = None;
        self.state.show_remote_islands = false;
        self.state.projection = self.dataset_projection();
        Some(MapEvent::StateChanged)
    }

    /// Switches the metropolitan region between its mainland and its remote
    /// islands. Does nothing for any other selection.
    pub fn toggle_remote_islands(&mut self) -> Option<MapEvent> {
        if self.state.selected_region.as_deref() != Some(METROPOLITAN_REGION) {
            return None;
        }

        self.state.show_remote_islands = !self.state.show_remote_islands;
        let bounds = if self.state.show_remote_islands {
            REMOTE_ISLANDS_BOUNDS
        } else {
            METROPOLITAN_MAINLAND_BOUNDS
        };
        self.fit(&bounds);
        Some(MapEvent::StateChanged)
    }

    /// Enables or disables lattice snapping of drawn geometry.
    pub fn set_grid_mode(&mut self, enabled: bool) -> Option<MapEvent> {
        if self.state.grid_mode == enabled {
            return None;
        }
        self.state.grid_mode = enabled;
        Some(MapEvent::StateChanged)
    }

    /// Installs sub-regions loaded on demand.
    ///
    /// Results for a region that is no longer selected are dropped, so a
    /// slow load never overwrites a newer selection.
    pub fn apply_sub_regions(
        &mut self,
        region: &str,
        sub_regions: Rc<Vec<SubRegion>>,
    ) -> Option<MapEvent> {
        if self.state.selected_region.as_deref() != Some(region) {
            log::debug!(
                "Ignoring {} sub-regions for {}: selection changed",
                sub_regions.len(),
                region
            );
            return None;
        }
        self.loaded = Some((region.to_string(), sub_regions));
        Some(MapEvent::StateChanged)
    }

    /// Sub-regions of the selected region.
    ///
    /// The metropolitan region shows either its mainland or its remote
    /// islands depending on the toggle.
    pub fn selected_sub_regions(&self) -> Vec<&SubRegion> {
        let Some(selected) = self.state.selected_region.as_deref() else {
            return Vec::new();
        };

        let subs: Vec<&SubRegion> = match self.loaded_for_selection() {
            Some(loaded) => loaded.iter().collect(),
            None => self
                .sub_regions
                .iter()
                .filter(|sub| sub.region_code == selected)
                .collect(),
        };

        if selected == METROPOLITAN_REGION {
            let islands = self.state.show_remote_islands;
            subs.into_iter()
                .filter(|sub| is_remote_island(sub) == islands)
                .collect()
        } else {
            subs
        }
    }

    /// Flat sub-regions for the whole-country view, exclaves removed.
    pub fn country_sub_regions(&self) -> Vec<&SubRegion> {
        self.sub_regions
            .iter()
            .filter(|sub| admits_sub_region(sub))
            .collect()
    }

    fn displayed<'a>(&self, region_code: &str, geometry: &'a Geometry) -> Cow<'a, Geometry> {
        if !self.state.grid_mode {
            return Cow::Borrowed(geometry);
        }
        let mut deformer = GridDeformer::new(&self.deformer);
        if self.state.selected_region.is_some() {
            deformer.adjust_for_region(region_code);
        }
        Cow::Owned(deformer.deform_geometry(geometry))
    }

    /// Drawing commands for a region in the current view.
    ///
    /// The whole-country view drops exclaves and draws the archipelago as a
    /// magnified inset. Exclaves are filtered on the original coordinates,
    /// before any lattice snapping.
    pub fn region_commands(&self, region: &Region) -> Vec<PathCommand> {
        let projection = &self.state.projection;

        if self.state.selected_region.is_some() {
            let geometry = self.displayed(&region.code, &region.geometry);
            return to_path(&geometry, projection, None);
        }

        if region.code == INSET_REGION {
            let geometry = self.displayed(&region.code, &region.geometry);
            let transform = inset_transform(projection);
            return to_path(&geometry, projection, Some(&transform));
        }

        let mainland = filter_exclaves(&region.code, &region.geometry);
        let geometry = self.displayed(&region.code, &mainland);
        to_path(&geometry, projection, None)
    }

    /// Drawing commands for a region, as an SVG path string.
    pub fn region_path(&self, region: &Region) -> String {
        to_svg_path(&self.region_commands(region))
    }

    /// Drawing commands for a sub-region in the current view.
    pub fn sub_region_commands(&self, sub_region: &SubRegion) -> Vec<PathCommand> {
        let geometry = self.displayed(&sub_region.region_code, &sub_region.geometry);
        to_path(&geometry, &self.state.projection, None)
    }

    /// Drawing commands for a sub-region, as an SVG path string.
    pub fn sub_region_path(&self, sub_region: &SubRegion) -> String {
        to_svg_path(&self.sub_region_commands(sub_region))
    }

    /// Frame around the archipelago inset, when that region is loaded.
    pub fn inset_frame(&self) -> Option<InsetFrame> {
        self.region(INSET_REGION)
            .map(|region| inset_frame(&region.bounds, &self.state.projection))
    }
}
