//! Boundary data loading.
//!
//! ## Sources
//! - `dataset`: whole-country region outlines (and optional flat sub-regions)
//! - `loader`: per-region sub-regions from a precision-tiered index
//!
//! ### Key Types
//! - `Precision`: simplification tier (`original` .. `ultra-low`)
//! - `PrecisionIndex`: region code -> tier -> file descriptor
//! - `CacheKey`: region code + tier a load was requested at
//!
//! ### Layout
//! ```text
//! {base_url}/
//! ├── prefecture-index.json
//! ├── 01-medium.json
//! ├── 01-low.json
//! └── ...
//! ```

pub mod codes;
pub mod dataset;
mod error;
pub mod feature;
mod fetch;
mod index;
pub mod loader;

pub use codes::{region_code, region_name, PREFECTURES};
pub use dataset::{load_dataset, load_regions, Dataset};
pub use error::{FetchError, LoadError};
pub use feature::{decode_regions, decode_sub_regions, parse_feature_collection, Feature};
#[cfg(not(target_arch = "wasm32"))]
pub use fetch::FileFetcher;
#[cfg(target_arch = "wasm32")]
pub use fetch::WebFetcher;
pub use fetch::{join_path, Fetcher};
pub use index::{
    DataSizeInfo, FileDescriptor, ParsePrecisionError, Precision, PrecisionIndex, RegionEntry,
    TotalSize,
};
pub use loader::{CacheInfo, CacheKey, DynamicDataLoader};
