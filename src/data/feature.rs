//! GeoJSON feature decoding.
//!
//! Boundary files follow the N03 administrative boundary layout:
//!
//! | Property | Meaning |
//! |----------|---------|
//! | `N03_001` | Prefecture name |
//! | `N03_002` | Subprefecture / branch office |
//! | `N03_003` | County or designated city |
//! | `N03_004` | Municipality or ward |
//! | `N03_007` | Administrative code |
//!
//! Coordinates are decoded point by point. A point that is not a pair of
//! finite numbers is logged and skipped; the rest of the ring survives.

use geo_types::Coord;
use serde::Deserialize;

use super::codes::{region_code, region_code_of, UNKNOWN_REGION_CODE};
use crate::geo::{compute_bounds, Geometry, PolygonRings, Region, Ring, SubRegion};

#[derive(Debug, Deserialize)]
struct FeatureCollectionDoc {
    #[serde(default)]
    features: Vec<FeatureDoc>,
}

#[derive(Debug, Deserialize)]
struct FeatureDoc {
    #[serde(default)]
    properties: Option<FeatureProperties>,
    #[serde(default)]
    geometry: Option<GeometryDoc>,
}

#[derive(Debug, Deserialize)]
struct GeometryDoc {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

/// N03 feature properties. Every field may be absent or null.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeatureProperties {
    #[serde(rename = "N03_001", default)]
    pub region_name: Option<String>,
    #[serde(rename = "N03_002", default)]
    pub branch_name: Option<String>,
    #[serde(rename = "N03_003", default)]
    pub county_name: Option<String>,
    #[serde(rename = "N03_004", default)]
    pub municipality_name: Option<String>,
    #[serde(rename = "N03_007", default)]
    pub admin_code: Option<String>,
}

impl FeatureProperties {
    /// Most specific non-empty name: municipality, then county, then branch.
    pub fn sub_region_name(&self) -> String {
        [
            &self.municipality_name,
            &self.county_name,
            &self.branch_name,
        ]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
        .cloned()
        .unwrap_or_default()
    }

    fn admin_code(&self) -> Option<&str> {
        self.admin_code.as_deref().filter(|code| !code.is_empty())
    }
}

/// A decoded feature: properties plus geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub properties: FeatureProperties,
    pub geometry: Geometry,
}

fn decode_point(value: &serde_json::Value) -> Option<Coord<f64>> {
    let pair = value.as_array()?;
    let x = pair.first()?.as_f64()?;
    let y = pair.get(1)?.as_f64()?;
    (x.is_finite() && y.is_finite()).then_some(Coord { x, y })
}

fn decode_ring(value: &serde_json::Value) -> Ring {
    let Some(points) = value.as_array() else {
        log::warn!("Ring is not an array, treating as empty");
        return Ring::new();
    };

    points
        .iter()
        .filter_map(|point| {
            let coord = decode_point(point);
            if coord.is_none() {
                log::warn!("Malformed coordinate skipped: {}", point);
            }
            coord
        })
        .collect()
}

fn decode_polygon(value: &serde_json::Value) -> Option<PolygonRings> {
    Some(value.as_array()?.iter().map(decode_ring).collect())
}

fn decode_geometry(doc: &GeometryDoc) -> Option<Geometry> {
    match doc.kind.as_str() {
        "Polygon" => decode_polygon(&doc.coordinates).map(Geometry::Polygon),
        "MultiPolygon" => doc
            .coordinates
            .as_array()
            .and_then(|polygons| polygons.iter().map(decode_polygon).collect::<Option<Vec<_>>>())
            .map(Geometry::MultiPolygon),
        other => {
            log::warn!("Unsupported geometry type: {}", other);
            None
        }
    }
}

/// Parses a GeoJSON FeatureCollection.
///
/// Features without a usable Polygon or MultiPolygon geometry are skipped.
pub fn parse_feature_collection(json: &str) -> Result<Vec<Feature>, serde_json::Error> {
    let doc: FeatureCollectionDoc = serde_json::from_str(json)?;

    let total = doc.features.len();
    let features: Vec<Feature> = doc
        .features
        .into_iter()
        .filter_map(|feature| {
            let geometry = match feature.geometry.as_ref().map(decode_geometry) {
                Some(Some(geometry)) => geometry,
                Some(None) => return None,
                None => {
                    log::warn!("Feature without geometry skipped");
                    return None;
                }
            };
            Some(Feature {
                properties: feature.properties.unwrap_or_default(),
                geometry,
            })
        })
        .collect();

    if features.len() < total {
        log::debug!("Decoded {} of {} features", features.len(), total);
    }
    Ok(features)
}

/// Builds a region from a prefecture-level feature.
///
/// The code comes from the prefecture name table; unknown names get "00".
pub fn decode_region(feature: Feature) -> Region {
    let name = feature.properties.region_name.unwrap_or_default();
    let code = region_code(&name).unwrap_or(UNKNOWN_REGION_CODE).to_string();
    let bounds = compute_bounds(&feature.geometry);
    Region {
        code,
        name,
        bounds,
        geometry: feature.geometry,
    }
}

/// Builds a sub-region from a municipality-level feature.
///
/// `region` overrides the owning region code; without it the code is taken
/// from the administrative code prefix, then from the prefecture name. A
/// feature without an administrative code gets `{region}999`.
pub fn decode_sub_region(feature: Feature, region: Option<&str>) -> SubRegion {
    let props = &feature.properties;
    let region_code = region
        .map(str::to_string)
        .or_else(|| props.admin_code().and_then(region_code_of).map(str::to_string))
        .or_else(|| {
            props
                .region_name
                .as_deref()
                .and_then(region_code)
                .map(str::to_string)
        })
        .unwrap_or_else(|| UNKNOWN_REGION_CODE.to_string());

    let code = props
        .admin_code()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}999", region_code));
    let name = props.sub_region_name();

    SubRegion {
        code,
        name,
        region_code,
        geometry: feature.geometry,
    }
}

/// Parses a region-level FeatureCollection, dropping unknown regions.
pub fn decode_regions(json: &str) -> Result<Vec<Region>, serde_json::Error> {
    Ok(parse_feature_collection(json)?
        .into_iter()
        .map(decode_region)
        .filter(|region| region.code != UNKNOWN_REGION_CODE)
        .collect())
}

/// Parses a sub-region FeatureCollection, dropping sub-regions whose region
/// cannot be determined.
pub fn decode_sub_regions(
    json: &str,
    region: Option<&str>,
) -> Result<Vec<SubRegion>, serde_json::Error> {
    Ok(parse_feature_collection(json)?
        .into_iter()
        .map(|feature| decode_sub_region(feature, region))
        .filter(|sub| sub.region_code != UNKNOWN_REGION_CODE)
        .collect())
}
