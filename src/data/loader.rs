//! Precision-tiered, per-region sub-region loader.
//!
//! The loader reads the precision index once, then fetches one region's
//! sub-region file at a time at the currently selected tier. Results are
//! cached by (region, tier). Concurrent requests for the same key share a
//! single pending fetch.
//!
//! Everything runs on one thread: state lives in `Rc<RefCell<..>>` and the
//! futures are `!Send`, matching the browser event loop.

use futures_util::future::{try_join_all, FutureExt, LocalBoxFuture, Shared};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};
use web_time::Instant;

use super::feature::decode_sub_regions;
#[cfg(not(target_arch = "wasm32"))]
use super::FileFetcher;
#[cfg(target_arch = "wasm32")]
use super::WebFetcher;
use super::{DataSizeInfo, Fetcher, LoadError, Precision, PrecisionIndex};
use crate::config::LoaderConfig;
use crate::geo::SubRegion;

/// Cache key: region code and the tier it was requested at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub region: String,
    pub precision: Precision,
}

impl CacheKey {
    pub fn new(region: impl Into<String>, precision: Precision) -> Self {
        Self {
            region: region.into(),
            precision,
        }
    }

    /// Flat string form, e.g. "13-medium".
    pub fn to_storage_key(&self) -> String {
        format!("{}-{}", self.region, self.precision)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage_key())
    }
}

/// Snapshot of the cache contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
    /// Number of cached (region, tier) entries
    pub count: usize,
    /// Cached region codes, sorted and deduplicated
    pub regions: Vec<String>,
}

type SharedLoad<T> = Shared<LocalBoxFuture<'static, Result<T, LoadError>>>;

/// A pending load and the request id that owns its ledger slot.
struct InFlight<T> {
    id: u64,
    load: SharedLoad<T>,
}

#[derive(Default)]
struct LoaderState {
    index: Option<Rc<PrecisionIndex>>,
    index_request: Option<InFlight<Rc<PrecisionIndex>>>,
    precision: Precision,
    cache: HashMap<CacheKey, Rc<Vec<SubRegion>>>,
    in_flight: HashMap<CacheKey, InFlight<Rc<Vec<SubRegion>>>>,
    next_request_id: u64,
}

impl LoaderState {
    fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }
}

/// Loads sub-region data per region from a precision-tiered index.
pub struct DynamicDataLoader<F> {
    fetcher: Rc<F>,
    index_path: String,
    state: Rc<RefCell<LoaderState>>,
}

impl<F: Fetcher + 'static> DynamicDataLoader<F> {
    /// Creates a loader over `fetcher`, starting at the configured tier.
    pub fn new(fetcher: F, config: &LoaderConfig) -> Self {
        let state = LoaderState {
            precision: config.precision,
            ..Default::default()
        };
        Self {
            fetcher: Rc::new(fetcher),
            index_path: config.index_path.clone(),
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Returns the underlying fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// True once the index has loaded.
    pub fn is_indexed(&self) -> bool {
        self.state.borrow().index.is_some()
    }

    /// Returns the tier used by new loads.
    pub fn precision(&self) -> Precision {
        self.state.borrow().precision
    }

    /// Sets the tier used by subsequent loads. Cached entries are kept.
    pub fn set_precision(&self, precision: Precision) {
        let mut state = self.state.borrow_mut();
        if state.precision != precision {
            log::info!("Precision changed: {} -> {}", state.precision, precision);
            state.precision = precision;
        }
    }

    /// Loads the precision index, once per loader.
    ///
    /// Concurrent callers share one fetch. A failed load is not memoized.
    pub async fn load_index(&self) -> Result<Rc<PrecisionIndex>, LoadError> {
        let pending = {
            let mut state = self.state.borrow_mut();
            if let Some(index) = &state.index {
                return Ok(index.clone());
            }
            match &state.index_request {
                Some(request) => request.load.clone(),
                None => {
                    let id = state.next_id();
                    let load = fetch_index(
                        self.fetcher.clone(),
                        self.index_path.clone(),
                        Rc::downgrade(&self.state),
                        id,
                    )
                    .boxed_local()
                    .shared();
                    state.index_request = Some(InFlight {
                        id,
                        load: load.clone(),
                    });
                    load
                }
            }
        };
        pending.await
    }

    /// Loads the sub-regions of one region at the current tier.
    ///
    /// The tier is read when the load starts; changing it while the load is
    /// pending does not redirect the result.
    pub async fn load_for_region(&self, region: &str) -> Result<Rc<Vec<SubRegion>>, LoadError> {
        let key = CacheKey::new(region, self.precision());
        let index = self.load_index().await?;

        let pending = {
            let mut state = self.state.borrow_mut();
            if let Some(cached) = state.cache.get(&key) {
                log::debug!("Cache hit for {}", key);
                return Ok(cached.clone());
            }
            if let Some(in_flight) = state.in_flight.get(&key) {
                log::debug!("Joining in-flight load for {}", key);
                in_flight.load.clone()
            } else {
                let path = index.descriptor(region, key.precision)?.path.clone();
                log::debug!("Cache miss for {}", key);

                let id = state.next_id();
                let load = fetch_sub_regions(
                    self.fetcher.clone(),
                    Rc::downgrade(&self.state),
                    key.clone(),
                    id,
                    path,
                )
                .boxed_local()
                .shared();
                state.in_flight.insert(
                    key,
                    InFlight {
                        id,
                        load: load.clone(),
                    },
                );
                load
            }
        };
        pending.await
    }

    /// Loads several regions concurrently and concatenates their
    /// sub-regions in input order. Any failure fails the whole call.
    pub async fn load_for_regions<S: AsRef<str>>(
        &self,
        regions: &[S],
    ) -> Result<Vec<SubRegion>, LoadError> {
        let lists = try_join_all(
            regions
                .iter()
                .map(|region| self.load_for_region(region.as_ref())),
        )
        .await?;
        Ok(lists
            .iter()
            .flat_map(|subs| subs.iter().cloned())
            .collect())
    }

    /// Cached sub-regions for a key, without loading.
    pub fn cached(&self, region: &str, precision: Precision) -> Option<Rc<Vec<SubRegion>>> {
        self.state
            .borrow()
            .cache
            .get(&CacheKey::new(region, precision))
            .cloned()
    }

    /// Clears one region at every tier, or everything.
    ///
    /// Loads already in flight still resolve for their callers but no longer
    /// write into the cache.
    pub fn clear_cache(&self, region: Option<&str>) {
        let mut state = self.state.borrow_mut();
        match region {
            Some(code) => {
                state.cache.retain(|key, _| key.region != code);
                state.in_flight.retain(|key, _| key.region != code);
                log::info!("Cleared cache for region {}", code);
            }
            None => {
                state.cache.clear();
                state.in_flight.clear();
                log::info!("Cleared all cached region data");
            }
        }
    }

    /// Drops the index and all cached data.
    pub fn reset(&self) {
        self.clear_cache(None);
        let mut state = self.state.borrow_mut();
        state.index = None;
        state.index_request = None;
    }

    /// Summarizes the cached entries.
    pub fn cache_info(&self) -> CacheInfo {
        let state = self.state.borrow();
        let regions: BTreeSet<&String> = state.cache.keys().map(|key| &key.region).collect();
        CacheInfo {
            count: state.cache.len(),
            regions: regions.into_iter().cloned().collect(),
        }
    }

    /// Checks whether the index lists a region.
    pub async fn is_region_available(&self, region: &str) -> Result<bool, LoadError> {
        Ok(self.load_index().await?.contains(region))
    }

    /// Per-tier file sizes of a region, from the index.
    pub async fn data_size_info(&self, region: &str) -> Result<Option<DataSizeInfo>, LoadError> {
        Ok(self.load_index().await?.size_info(region))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl DynamicDataLoader<FileFetcher> {
    /// Creates a loader reading the data directory at `config.base_url`.
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(FileFetcher::new(config.base_url.as_str()), config)
    }
}

#[cfg(target_arch = "wasm32")]
impl DynamicDataLoader<WebFetcher> {
    /// Creates a loader fetching from `config.base_url`.
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(WebFetcher::new(config.base_url.as_str()), config)
    }
}

async fn fetch_index<F: Fetcher>(
    fetcher: Rc<F>,
    path: String,
    state: Weak<RefCell<LoaderState>>,
    id: u64,
) -> Result<Rc<PrecisionIndex>, LoadError> {
    let started = Instant::now();
    let result = match fetcher.fetch_text(&path).await {
        Ok(body) => PrecisionIndex::from_json(&body)
            .map(Rc::new)
            .map_err(|e| LoadError::IndexUnavailable(format!("{}: {}", path, e))),
        Err(e) => Err(LoadError::IndexUnavailable(e.to_string())),
    };

    if let Some(state) = state.upgrade() {
        let mut state = state.borrow_mut();
        if state.index_request.as_ref().is_some_and(|r| r.id == id) {
            state.index_request = None;
            if let Ok(index) = &result {
                state.index = Some(index.clone());
            }
        }
    }

    match &result {
        Ok(index) => log::info!(
            "Loaded index with {} regions in {:.1} ms",
            index.prefectures.len(),
            started.elapsed().as_secs_f64() * 1000.0
        ),
        Err(e) => log::warn!("{}", e),
    }
    result
}

async fn fetch_sub_regions<F: Fetcher>(
    fetcher: Rc<F>,
    state: Weak<RefCell<LoaderState>>,
    key: CacheKey,
    id: u64,
    path: String,
) -> Result<Rc<Vec<SubRegion>>, LoadError> {
    let started = Instant::now();
    let result = match fetcher.fetch_text(&path).await {
        Ok(body) => decode_sub_regions(&body, Some(&key.region))
            .map(Rc::new)
            .map_err(|e| LoadError::Parse {
                path: path.clone(),
                reason: e.to_string(),
            }),
        Err(e) => Err(LoadError::ResourceFetchFailed {
            path: path.clone(),
            reason: e.to_string(),
        }),
    };

    if let Some(state) = state.upgrade() {
        let mut state = state.borrow_mut();
        if state.in_flight.get(&key).is_some_and(|f| f.id == id) {
            state.in_flight.remove(&key);
            if let Ok(subs) = &result {
                state.cache.insert(key.clone(), subs.clone());
            }
        } else {
            log::debug!("Load for {} finished after its cache slot was cleared", key);
        }
    }

    match &result {
        Ok(subs) => log::info!(
            "Loaded {} sub-regions for {} in {:.1} ms",
            subs.len(),
            key,
            started.elapsed().as_secs_f64() * 1000.0
        ),
        Err(e) => log::warn!("{}", e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FetchError;
    use futures_channel::oneshot;
    use futures_util::future::{join, join3};

    const INDEX: &str = r#"{
        "prefectures": {
            "13": {
                "name": "東京都",
                "municipalityCount": 2,
                "files": {
                    "medium": { "path": "13-medium.json", "size": 2048, "features": 2 },
                    "low": { "path": "13-low.json", "size": 1024, "features": 1 }
                }
            },
            "27": {
                "name": "大阪府",
                "municipalityCount": 1,
                "files": { "medium": { "path": "27-medium.json", "size": 512, "features": 1 } }
            }
        },
        "generated": "2024-05-01T12:00:00Z",
        "totalSize": { "original": 8192, "compressed": 3584 }
    }"#;

    fn collection(features: &[(&str, &str)]) -> String {
        let features: Vec<String> = features
            .iter()
            .map(|(code, name)| {
                format!(
                    r#"{{"type":"Feature","properties":{{"N03_004":"{}","N03_007":"{}"}},
                    "geometry":{{"type":"Polygon","coordinates":[[[139.0,35.0],[139.1,35.0],[139.1,35.1],[139.0,35.0]]]}}}}"#,
                    name, code
                )
            })
            .collect();
        format!(
            r#"{{"type":"FeatureCollection","features":[{}]}}"#,
            features.join(",")
        )
    }

    /// In-memory fetcher that records requests and can hold a path until
    /// released.
    #[derive(Default)]
    struct MockFetcher {
        files: RefCell<HashMap<String, String>>,
        gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
        calls: RefCell<Vec<String>>,
    }

    impl MockFetcher {
        fn put(&self, path: &str, body: impl Into<String>) {
            self.files.borrow_mut().insert(path.to_string(), body.into());
        }

        fn gate(&self, path: &str) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.borrow_mut().insert(path.to_string(), rx);
            tx
        }

        fn call_count(&self, path: &str) -> usize {
            self.calls.borrow().iter().filter(|p| *p == path).count()
        }
    }

    impl Fetcher for MockFetcher {
        async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
            self.calls.borrow_mut().push(path.to_string());
            let gate = self.gates.borrow_mut().remove(path);
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    path: path.to_string(),
                    status: 404,
                    status_text: "Not Found".to_string(),
                })
        }
    }

    fn loader() -> DynamicDataLoader<MockFetcher> {
        let fetcher = MockFetcher::default();
        fetcher.put("prefecture-index.json", INDEX);
        fetcher.put(
            "13-medium.json",
            collection(&[("13101", "千代田区"), ("13102", "中央区")]),
        );
        fetcher.put("13-low.json", collection(&[("13101", "千代田区")]));
        fetcher.put("27-medium.json", collection(&[("27100", "大阪市")]));
        DynamicDataLoader::new(fetcher, &LoaderConfig::default())
    }

    #[test]
    fn test_concurrent_loads_share_one_fetch() {
        let loader = loader();
        let release = loader.fetcher().gate("13-medium.json");

        let (a, b, _) = pollster::block_on(join3(
            loader.load_for_region("13"),
            loader.load_for_region("13"),
            async move {
                let _ = release.send(());
            },
        ));

        let a = a.unwrap();
        let b = b.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(loader.fetcher().call_count("13-medium.json"), 1);
        assert_eq!(loader.cache_info().count, 1);
    }

    #[test]
    fn test_cached_result_reused() {
        let loader = loader();
        pollster::block_on(async {
            loader.load_for_region("27").await.unwrap();
            loader.load_for_region("27").await.unwrap();
        });
        assert_eq!(loader.fetcher().call_count("27-medium.json"), 1);
        assert_eq!(loader.fetcher().call_count("prefecture-index.json"), 1);
        assert!(loader.is_indexed());
    }

    #[test]
    fn test_tier_unavailable() {
        let loader = loader();
        let medium = pollster::block_on(loader.load_for_region("27")).unwrap();
        loader.set_precision(Precision::Low);

        let result = pollster::block_on(loader.load_for_region("27"));
        assert_eq!(
            result,
            Err(LoadError::TierUnavailable {
                region: "27".to_string(),
                tier: Precision::Low
            })
        );
        assert_eq!(loader.cache_info().count, 1);

        // Switching back hits the entry loaded before the failure
        loader.set_precision(Precision::Medium);
        let again = pollster::block_on(loader.load_for_region("27")).unwrap();
        assert!(Rc::ptr_eq(&medium, &again));
        assert_eq!(loader.fetcher().call_count("27-medium.json"), 1);
    }

    #[test]
    fn test_tier_unavailable_without_fetch() {
        let loader = loader();
        loader.set_precision(Precision::Low);

        let result = pollster::block_on(loader.load_for_region("27"));
        assert!(matches!(result, Err(LoadError::TierUnavailable { .. })));
        assert_eq!(loader.fetcher().call_count("27-medium.json"), 0);
        assert_eq!(loader.cache_info().count, 0);
    }

    #[test]
    fn test_tier_change_during_load() {
        let loader = loader();
        let release = loader.fetcher().gate("13-medium.json");
        let loader_ref = &loader;

        let (result, _) = pollster::block_on(join(
            loader_ref.load_for_region("13"),
            async move {
                loader_ref.set_precision(Precision::Low);
                let _ = release.send(());
            },
        ));

        assert_eq!(result.unwrap().len(), 2);
        assert_eq!(loader.precision(), Precision::Low);
        assert_eq!(
            loader.cached("13", Precision::Medium).map(|subs| subs.len()),
            Some(2)
        );
        assert!(loader.cached("13", Precision::Low).is_none());
        assert_eq!(loader.fetcher().call_count("13-low.json"), 0);
    }

    #[test]
    fn test_region_not_indexed() {
        let loader = loader();
        let result = pollster::block_on(loader.load_for_region("99"));
        assert_eq!(
            result,
            Err(LoadError::RegionNotIndexed {
                region: "99".to_string()
            })
        );
    }

    #[test]
    fn test_precision_is_part_of_key() {
        let loader = loader();
        pollster::block_on(async {
            let medium = loader.load_for_region("13").await.unwrap();
            loader.set_precision(Precision::Low);
            let low = loader.load_for_region("13").await.unwrap();
            assert_eq!(medium.len(), 2);
            assert_eq!(low.len(), 1);
        });
        assert_eq!(loader.cache_info().count, 2);
        assert!(loader.cached("13", Precision::Medium).is_some());
    }

    #[test]
    fn test_clear_cache_scope() {
        let loader = loader();
        pollster::block_on(async {
            loader.load_for_region("13").await.unwrap();
            loader.set_precision(Precision::Low);
            loader.load_for_region("13").await.unwrap();
            loader.set_precision(Precision::Medium);
            loader.load_for_region("27").await.unwrap();
        });

        loader.clear_cache(Some("13"));
        let info = loader.cache_info();
        assert_eq!(info.count, 1);
        assert_eq!(info.regions, vec!["27".to_string()]);
        assert!(loader.cached("27", Precision::Medium).is_some());

        loader.clear_cache(None);
        assert_eq!(loader.cache_info().count, 0);
    }

    #[test]
    fn test_failed_load_is_retried() {
        let loader = loader();
        loader.fetcher().files.borrow_mut().remove("27-medium.json");

        let first = pollster::block_on(loader.load_for_region("27"));
        assert!(matches!(first, Err(LoadError::ResourceFetchFailed { .. })));

        loader
            .fetcher()
            .put("27-medium.json", collection(&[("27100", "大阪市")]));
        let second = pollster::block_on(loader.load_for_region("27")).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(loader.fetcher().call_count("27-medium.json"), 2);
    }

    #[test]
    fn test_parse_failure() {
        let loader = loader();
        loader.fetcher().put("27-medium.json", "{ not json");
        let result = pollster::block_on(loader.load_for_region("27"));
        assert!(matches!(result, Err(LoadError::Parse { .. })));
    }

    #[test]
    fn test_cleared_in_flight_load_does_not_repopulate() {
        let loader = loader();
        let release = loader.fetcher().gate("13-medium.json");
        let loader_ref = &loader;

        let (result, _) = pollster::block_on(join(
            loader_ref.load_for_region("13"),
            async move {
                loader_ref.clear_cache(None);
                let _ = release.send(());
            },
        ));

        assert_eq!(result.unwrap().len(), 2);
        assert_eq!(loader.cache_info().count, 0);
    }

    #[test]
    fn test_load_for_regions_preserves_order() {
        let loader = loader();
        let subs = pollster::block_on(loader.load_for_regions(&["27", "13"])).unwrap();
        let codes: Vec<&str> = subs.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["27100", "13101", "13102"]);
        assert!(subs.iter().take(1).all(|s| s.region_code == "27"));
    }

    #[test]
    fn test_load_for_regions_fails_on_any_error() {
        let loader = loader();
        let result = pollster::block_on(loader.load_for_regions(&["13", "99"]));
        assert!(matches!(result, Err(LoadError::RegionNotIndexed { .. })));
    }

    #[test]
    fn test_index_failure_then_recovery() {
        let loader = loader();
        let index = loader
            .fetcher()
            .files
            .borrow_mut()
            .remove("prefecture-index.json")
            .unwrap();

        let result = pollster::block_on(loader.load_index());
        assert!(matches!(result, Err(LoadError::IndexUnavailable(_))));
        assert!(!loader.is_indexed());

        loader.fetcher().put("prefecture-index.json", index);
        assert!(pollster::block_on(loader.is_region_available("13")).unwrap());
        assert!(!pollster::block_on(loader.is_region_available("01")).unwrap());
    }

    #[test]
    fn test_data_size_info() {
        let loader = loader();
        let info = pollster::block_on(loader.data_size_info("13"))
            .unwrap()
            .unwrap();
        assert_eq!(info.name, "東京都");
        assert_eq!(info.sizes.get(&Precision::Low), Some(&1024));
        assert_eq!(pollster::block_on(loader.data_size_info("47")).unwrap(), None);
    }

    #[test]
    fn test_reset_forgets_index() {
        let loader = loader();
        pollster::block_on(loader.load_for_region("27")).unwrap();
        loader.reset();
        assert!(!loader.is_indexed());
        assert_eq!(loader.cache_info().count, 0);
        pollster::block_on(loader.load_index()).unwrap();
        assert_eq!(loader.fetcher().call_count("prefecture-index.json"), 2);
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(
            CacheKey::new("13", Precision::UltraLow).to_storage_key(),
            "13-ultra-low"
        );
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_from_config_reads_base_directory() {
        let dir = std::env::temp_dir()
            .join(format!("prefecture-map-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("prefecture-index.json"), INDEX).unwrap();
        std::fs::write(dir.join("27-medium.json"), collection(&[("27100", "大阪市")])).unwrap();

        let config = LoaderConfig::default().with_base_url(dir.to_string_lossy());
        let loader = DynamicDataLoader::from_config(&config);
        let result = pollster::block_on(loader.load_for_region("27"));
        let _ = std::fs::remove_dir_all(&dir);

        let subs = result.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].code, "27100");
    }
}
