//! Errors surfaced by data fetching and loading.
//!
//! Both types are `Clone` because one failed load is handed to every caller
//! that was waiting on it.

use super::Precision;

/// Errors from a [`Fetcher`](super::Fetcher) backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The request could not be issued or did not complete.
    #[error("Request for {path} failed: {reason}")]
    Request { path: String, reason: String },

    /// The server answered with a non-success status.
    #[error("Request for {path} returned status {status} {status_text}")]
    Status {
        path: String,
        status: u16,
        status_text: String,
    },

    /// A local file could not be read.
    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Errors from loading the precision index or region data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    /// The index file could not be fetched or parsed.
    #[error("Failed to load index file: {0}")]
    IndexUnavailable(String),

    /// The index has no entry for the region.
    #[error("Region {region} not found in index")]
    RegionNotIndexed { region: String },

    /// The region exists but has no file at the requested precision.
    #[error("Precision level {tier} not available for region {region}")]
    TierUnavailable { region: String, tier: Precision },

    /// The region data file could not be fetched.
    #[error("Failed to load region data {path}: {reason}")]
    ResourceFetchFailed { path: String, reason: String },

    /// A fetched document was not valid GeoJSON of the expected shape.
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}
