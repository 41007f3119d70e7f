//! Precision-tiered region data index.
//!
//! The index is generated once alongside the split data files and lists,
//! for every prefecture, which simplification tiers exist and where each
//! file lives.
//!
//! ```json
//! {
//!   "prefectures": {
//!     "13": {
//!       "name": "東京都",
//!       "municipalityCount": 62,
//!       "files": { "medium": { "path": "13-medium.json", "size": 48213, "features": 62 } }
//!     }
//!   },
//!   "generated": "2024-05-01T12:00:00.000Z",
//!   "totalSize": { "original": 52000000, "compressed": 9100000 }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::LoadError;

/// Simplification tier of a data file, finest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Precision {
    Original,
    High,
    #[default]
    Medium,
    Low,
    UltraLow,
}

impl Precision {
    pub const ALL: [Precision; 5] = [
        Precision::Original,
        Precision::High,
        Precision::Medium,
        Precision::Low,
        Precision::UltraLow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Original => "original",
            Precision::High => "high",
            Precision::Medium => "medium",
            Precision::Low => "low",
            Precision::UltraLow => "ultra-low",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized tier names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown precision level: {0}")]
pub struct ParsePrecisionError(pub String);

impl FromStr for Precision {
    type Err = ParsePrecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Precision::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParsePrecisionError(s.to_string()))
    }
}

/// Location and size of one data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Path relative to the data base URL
    pub path: String,
    /// File size in bytes
    pub size: u64,
    /// Number of features in the file
    pub features: u32,
}

/// Index entry for one prefecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionEntry {
    pub name: String,
    #[serde(default)]
    pub municipality_count: u32,
    /// Tiers this build does not know are skipped with a warning
    #[serde(default, deserialize_with = "known_tiers")]
    pub files: BTreeMap<Precision, FileDescriptor>,
}

fn known_tiers<'de, D>(deserializer: D) -> Result<BTreeMap<Precision, FileDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    let files = BTreeMap::<String, FileDescriptor>::deserialize(deserializer)?;
    Ok(files
        .into_iter()
        .filter_map(|(tier, file)| match tier.parse::<Precision>() {
            Ok(precision) => Some((precision, file)),
            Err(e) => {
                log::warn!("Skipping {} in index: {}", file.path, e);
                None
            }
        })
        .collect())
}

/// Aggregate size of the source data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalSize {
    pub original: u64,
    pub compressed: u64,
}

/// The full precision index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecisionIndex {
    pub prefectures: BTreeMap<String, RegionEntry>,
    #[serde(default)]
    pub generated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_size: TotalSize,
}

/// Per-tier file sizes of one region.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSizeInfo {
    pub name: String,
    pub sizes: BTreeMap<Precision, u64>,
}

impl PrecisionIndex {
    /// Parses an index document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn region(&self, code: &str) -> Option<&RegionEntry> {
        self.prefectures.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.prefectures.contains_key(code)
    }

    /// Resolves the data file for a region at a tier.
    pub fn descriptor(
        &self,
        code: &str,
        precision: Precision,
    ) -> Result<&FileDescriptor, LoadError> {
        let entry = self
            .region(code)
            .ok_or_else(|| LoadError::RegionNotIndexed {
                region: code.to_string(),
            })?;

        entry
            .files
            .get(&precision)
            .ok_or_else(|| LoadError::TierUnavailable {
                region: code.to_string(),
                tier: precision,
            })
    }

    /// Name and per-tier byte sizes of a region.
    pub fn size_info(&self, code: &str) -> Option<DataSizeInfo> {
        let entry = self.region(code)?;
        Some(DataSizeInfo {
            name: entry.name.clone(),
            sizes: entry
                .files
                .iter()
                .map(|(precision, file)| (*precision, file.size))
                .collect(),
        })
    }
}
