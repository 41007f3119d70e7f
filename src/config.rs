//! Map configuration.
//!
//! Every section deserializes with defaults for missing fields, so a partial
//! JSON document only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::data::Precision;
use crate::geo::DeformerConfig;

/// Drawing surface size and fit padding, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f64,
    pub height: f64,
    /// Padding used when fitting a selected region.
    pub padding: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            padding: 20.0,
        }
    }
}

impl ViewportConfig {
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }
}

/// Where the split region data lives and which tier to start with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Base URL (wasm) or directory (native) of the data files.
    pub base_url: String,
    /// Index file name relative to `base_url`.
    pub index_path: String,
    pub precision: Precision,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: "/data/split".to_string(),
            index_path: "prefecture-index.json".to_string(),
            precision: Precision::default(),
        }
    }
}

impl LoaderConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_index_path(mut self, index_path: impl Into<String>) -> Self {
        self.index_path = index_path.into();
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub viewport: ViewportConfig,
    pub loader: LoaderConfig,
    pub deformer: DeformerConfig,
}

impl MapConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parses `json`, falling back to defaults when it is invalid.
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(config) => {
                log::info!("Loaded map configuration");
                config
            }
            Err(e) => {
                log::warn!("Failed to parse map configuration: {}", e);
                Self::default()
            }
        }
    }

    pub fn with_viewport(mut self, viewport: ViewportConfig) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_deformer(mut self, deformer: DeformerConfig) -> Self {
        self.deformer = deformer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LatticeKind;

    #[test]
    fn test_defaults() {
        let config = MapConfig::default();
        assert_eq!(config.viewport.width, 800.0);
        assert_eq!(config.viewport.height, 600.0);
        assert_eq!(config.viewport.padding, 20.0);
        assert_eq!(config.loader.index_path, "prefecture-index.json");
        assert_eq!(config.loader.precision, Precision::Medium);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MapConfig::from_json(
            r#"{
                "viewport": { "width": 1024 },
                "loader": { "precision": "ultra-low" },
                "deformer": { "lattice": "hexagonal" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.viewport.width, 1024.0);
        assert_eq!(config.viewport.height, 600.0);
        assert_eq!(config.loader.precision, Precision::UltraLow);
        assert_eq!(config.loader.base_url, "/data/split");
        assert_eq!(config.deformer.lattice, LatticeKind::Hexagonal);
    }

    #[test]
    fn test_invalid_json_falls_back() {
        assert_eq!(MapConfig::from_json_or_default("{"), MapConfig::default());
    }

    #[test]
    fn test_builders() {
        let config = MapConfig::new()
            .with_viewport(ViewportConfig::default().with_size(400.0, 300.0))
            .with_loader(LoaderConfig::default().with_base_url("/geo"));
        assert_eq!(config.viewport.width, 400.0);
        assert_eq!(config.loader.base_url, "/geo");
    }
}
