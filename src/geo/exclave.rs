//! Exclave filtering for the whole-country view.
//!
//! Several regions carry remote islands that would distort the national map.
//! Each such region has one [`ExclaveRule`] in [`EXCLAVE_RULES`]; adding an
//! exception is a table entry, not new code.

use geo_types::Coord;

use super::{Bounds, Geometry, PolygonRings, SubRegion};

/// Coordinate axis a threshold applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Longitude,
    Latitude,
}

/// One-sided strict threshold on a single axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisThreshold {
    Below(Axis, f64),
    Above(Axis, f64),
}

impl AxisThreshold {
    pub fn matches(&self, coord: Coord<f64>) -> bool {
        let value = |axis: &Axis| match axis {
            Axis::Longitude => coord.x,
            Axis::Latitude => coord.y,
        };
        match self {
            AxisThreshold::Below(axis, limit) => value(axis) < *limit,
            AxisThreshold::Above(axis, limit) => value(axis) > *limit,
        }
    }
}

/// How a region decides which of its polygons belong to the mainland.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExclaveRule {
    /// Exclude a polygon whose vertex centroid matches any threshold.
    CentroidExcludeAny(&'static [AxisThreshold]),
    /// Exclude a polygon whose vertex centroid matches every threshold.
    CentroidExcludeAll(&'static [AxisThreshold]),
    /// Keep a polygon only if every outer vertex matches the threshold.
    AllPoints(AxisThreshold),
    /// Keep a polygon only if every outer vertex lies inside the box.
    WithinBounds(Bounds),
}

impl ExclaveRule {
    /// Tests a single representative point against the rule.
    pub fn admits_point(&self, coord: Coord<f64>) -> bool {
        match self {
            ExclaveRule::CentroidExcludeAny(thresholds) => {
                !thresholds.iter().any(|t| t.matches(coord))
            }
            ExclaveRule::CentroidExcludeAll(thresholds) => {
                !thresholds.iter().all(|t| t.matches(coord))
            }
            ExclaveRule::AllPoints(threshold) => threshold.matches(coord),
            ExclaveRule::WithinBounds(bounds) => bounds.contains(coord),
        }
    }

    /// Tests one polygon by its outer ring. Polygons without vertices pass.
    pub fn admits_polygon(&self, polygon: &PolygonRings) -> bool {
        let Some(outer) = polygon.first() else {
            return true;
        };

        match self {
            ExclaveRule::CentroidExcludeAny(_) | ExclaveRule::CentroidExcludeAll(_) => {
                outer_vertex_mean(std::slice::from_ref(polygon))
                    .map_or(true, |centroid| self.admits_point(centroid))
            }
            ExclaveRule::AllPoints(_) | ExclaveRule::WithinBounds(_) => {
                outer.iter().all(|c| self.admits_point(*c))
            }
        }
    }
}

/// Tokyo: Izu islands lie south of 34°N, Ogasawara east of 141°E.
const METROPOLITAN_ISLANDS: &[AxisThreshold] = &[
    AxisThreshold::Below(Axis::Latitude, 34.0),
    AxisThreshold::Above(Axis::Longitude, 141.0),
];

/// Hokkaido: the far north-eastern corner.
const NORTHERN_CORNER: &[AxisThreshold] = &[
    AxisThreshold::Above(Axis::Latitude, 43.5),
    AxisThreshold::Above(Axis::Longitude, 145.5),
];

/// Region code → exclave rule.
pub const EXCLAVE_RULES: &[(&str, ExclaveRule)] = &[
    ("13", ExclaveRule::CentroidExcludeAny(METROPOLITAN_ISLANDS)),
    ("01", ExclaveRule::CentroidExcludeAll(NORTHERN_CORNER)),
    // Kagoshima: drop the southern island chain
    (
        "46",
        ExclaveRule::AllPoints(AxisThreshold::Above(Axis::Latitude, 30.0)),
    ),
    // Nagasaki: keep the mainland box, drop the Goto islands and beyond
    (
        "42",
        ExclaveRule::WithinBounds(Bounds::new(129.0, 32.5, 130.0, 34.0)),
    ),
    // Shimane: drop the Oki islands
    (
        "32",
        ExclaveRule::AllPoints(AxisThreshold::Below(Axis::Longitude, 133.0)),
    ),
];

/// Looks up the exclave rule for a region, if it has one.
pub fn exclave_rule(region_code: &str) -> Option<&'static ExclaveRule> {
    EXCLAVE_RULES
        .iter()
        .find(|(code, _)| *code == region_code)
        .map(|(_, rule)| rule)
}

/// Mean of every outer-ring vertex across the given polygons, closing
/// points included.
pub fn outer_vertex_mean(polygons: &[PolygonRings]) -> Option<Coord<f64>> {
    let (sum_x, sum_y, count) = polygons
        .iter()
        .filter_map(|p| p.first())
        .flatten()
        .fold((0.0, 0.0, 0usize), |(sx, sy, n), c| (sx + c.x, sy + c.y, n + 1));

    (count > 0).then(|| Coord {
        x: sum_x / count as f64,
        y: sum_y / count as f64,
    })
}

/// Returns the polygons the rule admits, in input order.
pub fn admitted_polygons<'a>(
    rule: &ExclaveRule,
    polygons: &'a [PolygonRings],
) -> Vec<&'a PolygonRings> {
    polygons.iter().filter(|p| rule.admits_polygon(p)).collect()
}

/// Removes exclave polygons from a region's geometry.
///
/// Only multi-polygons of regions with a rule are filtered; everything else
/// is returned unchanged.
pub fn filter_exclaves(region_code: &str, geometry: &Geometry) -> Geometry {
    let (Some(rule), Geometry::MultiPolygon(polygons)) = (exclave_rule(region_code), geometry)
    else {
        return geometry.clone();
    };

    let kept: Vec<PolygonRings> = admitted_polygons(rule, polygons)
        .into_iter()
        .cloned()
        .collect();

    log::debug!(
        "Region {}: kept {} of {} polygons",
        region_code,
        kept.len(),
        polygons.len()
    );

    Geometry::MultiPolygon(kept)
}

/// Representative point of a sub-region for exclave tests.
pub fn sub_region_centroid(sub_region: &SubRegion) -> Option<Coord<f64>> {
    match &sub_region.geometry {
        Geometry::Polygon(rings) => outer_vertex_mean(std::slice::from_ref(rings)),
        Geometry::MultiPolygon(polygons) => outer_vertex_mean(polygons),
    }
}

/// Keeps the sub-regions whose centroid passes the region's rule.
///
/// Regions without a rule keep every sub-region.
pub fn filter_sub_regions<'a>(
    region_code: &str,
    sub_regions: &'a [SubRegion],
) -> Vec<&'a SubRegion> {
    let Some(rule) = exclave_rule(region_code) else {
        return sub_regions.iter().collect();
    };

    sub_regions
        .iter()
        .filter(|sub| sub_region_centroid(sub).map_or(true, |c| rule.admits_point(c)))
        .collect()
}

/// True when a sub-region passes the rule of the region it belongs to.
pub fn admits_sub_region(sub_region: &SubRegion) -> bool {
    exclave_rule(&sub_region.region_code)
        .zip(sub_region_centroid(sub_region))
        .map_or(true, |(rule, centroid)| rule.admits_point(centroid))
}

/// Administrative codes of the metropolitan region's remote-island
/// municipalities (Izu and Ogasawara).
pub const REMOTE_ISLAND_CODES: &[&str] = &[
    "13361", // Oshima
    "13362", // Toshima
    "13363", // Niijima
    "13364", // Kozushima
    "13381", // Miyake
    "13382", // Mikurajima
    "13401", // Hachijo
    "13402", // Aogashima
    "13421", // Ogasawara
];

/// Names of the same municipalities, for datasets without codes.
pub const REMOTE_ISLAND_NAMES: &[&str] = &[
    "小笠原村",
    "大島町",
    "利島村",
    "新島村",
    "神津島村",
    "三宅村",
    "御蔵島村",
    "八丈町",
    "青ヶ島村",
];

/// True for municipalities on the metropolitan region's remote islands.
pub fn is_remote_island(sub_region: &SubRegion) -> bool {
    REMOTE_ISLAND_CODES.contains(&sub_region.code.as_str())
        || REMOTE_ISLAND_NAMES.contains(&sub_region.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_at(x: f64, y: f64, size: f64) -> PolygonRings {
        vec![vec![
            Coord { x, y },
            Coord { x: x + size, y },
            Coord { x: x + size, y: y + size },
            Coord { x, y: y + size },
            Coord { x, y },
        ]]
    }

    fn sub_region(code: &str, name: &str, polygon: PolygonRings) -> SubRegion {
        SubRegion {
            code: code.to_string(),
            name: name.to_string(),
            region_code: code[..2].to_string(),
            geometry: Geometry::Polygon(polygon),
        }
    }

    #[test]
    fn test_metropolitan_islands_removed() {
        let mainland = square_at(139.5, 35.6, 0.2);
        let izu = square_at(139.3, 33.1, 0.1);
        let ogasawara = square_at(142.1, 27.0, 0.1);
        let geometry = Geometry::MultiPolygon(vec![mainland.clone(), izu, ogasawara]);

        assert_eq!(
            filter_exclaves("13", &geometry),
            Geometry::MultiPolygon(vec![mainland])
        );
    }

    #[test]
    fn test_northern_corner_requires_both_conditions() {
        let rule = exclave_rule("01").unwrap();
        assert!(!rule.admits_point(Coord { x: 145.8, y: 43.7 }));
        assert!(rule.admits_point(Coord { x: 145.8, y: 43.0 }));
        assert!(rule.admits_point(Coord { x: 141.3, y: 43.7 }));
    }

    #[test]
    fn test_all_points_rule_rejects_straddling_polygon() {
        let rule = exclave_rule("32").unwrap();
        assert!(rule.admits_polygon(&square_at(132.5, 35.0, 0.2)));
        // Crosses 133°E, so not every vertex is west of it
        assert!(!rule.admits_polygon(&square_at(132.9, 35.0, 0.2)));
        assert!(!rule.admits_polygon(&square_at(133.2, 36.1, 0.2)));
    }

    #[test]
    fn test_bounding_box_rule() {
        let rule = exclave_rule("42").unwrap();
        assert!(rule.admits_polygon(&square_at(129.8, 32.7, 0.1)));
        assert!(!rule.admits_polygon(&square_at(128.7, 32.6, 0.2)));
    }

    #[test]
    fn test_filter_is_ordered_subset() {
        let polygons = vec![
            square_at(130.2, 31.5, 0.3),
            square_at(129.5, 28.3, 0.2),
            square_at(130.5, 31.2, 0.2),
            square_at(128.9, 27.7, 0.1),
        ];
        let rule = exclave_rule("46").unwrap();
        let kept = admitted_polygons(rule, &polygons);

        assert_eq!(kept.len(), 2);
        assert!(std::ptr::eq(kept[0], &polygons[0]));
        assert!(std::ptr::eq(kept[1], &polygons[2]));
    }

    #[test]
    fn test_unruled_region_and_polygon_pass_through() {
        let geometry = Geometry::MultiPolygon(vec![square_at(135.0, 34.5, 0.2)]);
        assert_eq!(filter_exclaves("27", &geometry), geometry);

        let polygon = Geometry::Polygon(square_at(142.1, 27.0, 0.1));
        assert_eq!(filter_exclaves("13", &polygon), polygon);
    }

    #[test]
    fn test_empty_outer_ring_is_kept() {
        let rule = exclave_rule("13").unwrap();
        assert!(rule.admits_polygon(&vec![vec![]]));
        assert!(rule.admits_polygon(&vec![]));
    }

    #[test]
    fn test_sub_regions_filtered_by_centroid() {
        let subs = vec![
            sub_region("13101", "千代田区", square_at(139.7, 35.6, 0.05)),
            sub_region("13361", "大島町", square_at(139.3, 34.7, 0.1)),
            sub_region("13401", "八丈町", square_at(139.7, 33.0, 0.1)),
            sub_region("13421", "小笠原村", square_at(142.1, 27.0, 0.1)),
        ];
        let kept: Vec<&str> = filter_sub_regions("13", &subs)
            .iter()
            .map(|s| s.code.as_str())
            .collect();
        // Oshima sits north of 34°N and west of 141°E, so the centroid rule keeps it
        assert_eq!(kept, vec!["13101", "13361"]);
    }

    #[test]
    fn test_admits_sub_region_uses_own_region() {
        let ogasawara = sub_region("13421", "小笠原村", square_at(142.1, 27.0, 0.1));
        let osaka = sub_region("27100", "大阪市", square_at(135.4, 34.6, 0.1));
        assert!(!admits_sub_region(&ogasawara));
        assert!(admits_sub_region(&osaka));
    }

    #[test]
    fn test_remote_island_lookup() {
        let island = sub_region("13421", "小笠原村", square_at(142.1, 27.0, 0.1));
        let ward = sub_region("13101", "千代田区", square_at(139.7, 35.6, 0.05));
        let by_name = sub_region("13999", "八丈町", square_at(139.7, 33.0, 0.1));
        assert!(is_remote_island(&island));
        assert!(!is_remote_island(&ward));
        assert!(is_remote_island(&by_name));
    }
}
