//! Whole-country dataset loading.
//!
//! Before a region is selected the map needs every prefecture outline, and
//! optionally a flat municipality file covering the whole country.

use super::feature::{decode_regions, decode_sub_regions};
use super::{Fetcher, LoadError};
use crate::geo::{Region, SubRegion};

/// Regions plus any sub-regions loaded up front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub regions: Vec<Region>,
    pub sub_regions: Vec<SubRegion>,
}

impl Dataset {
    pub fn region(&self, code: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.code == code)
    }

    /// Sub-regions belonging to a region, in load order.
    pub fn sub_regions_for(&self, region: &str) -> Vec<&SubRegion> {
        self.sub_regions
            .iter()
            .filter(|sub| sub.region_code == region)
            .collect()
    }
}

async fn fetch(fetcher: &impl Fetcher, path: &str) -> Result<String, LoadError> {
    fetcher
        .fetch_text(path)
        .await
        .map_err(|e| LoadError::ResourceFetchFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })
}

fn parse_error(path: &str, e: serde_json::Error) -> LoadError {
    LoadError::Parse {
        path: path.to_string(),
        reason: e.to_string(),
    }
}

/// Loads the region outlines.
pub async fn load_regions(fetcher: &impl Fetcher, path: &str) -> Result<Vec<Region>, LoadError> {
    let body = fetch(fetcher, path).await?;
    let regions = decode_regions(&body).map_err(|e| parse_error(path, e))?;
    log::info!("Loaded {} regions from {}", regions.len(), path);
    Ok(regions)
}

/// Loads region outlines and, when `sub_region_path` is given, the flat
/// sub-region file.
pub async fn load_dataset(
    fetcher: &impl Fetcher,
    region_path: &str,
    sub_region_path: Option<&str>,
) -> Result<Dataset, LoadError> {
    let regions = load_regions(fetcher, region_path).await?;

    let sub_regions = match sub_region_path {
        Some(path) => {
            let body = fetch(fetcher, path).await?;
            let subs = decode_sub_regions(&body, None).map_err(|e| parse_error(path, e))?;
            log::info!("Loaded {} sub-regions from {}", subs.len(), path);
            subs
        }
        None => Vec::new(),
    };

    Ok(Dataset {
        regions,
        sub_regions,
    })
}
