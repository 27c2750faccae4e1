//! Catalog sources and the cached catalog store.
//!
//! Loading the catalog is the only I/O this crate performs, so it sits behind
//! the [`CatalogSource`] trait. [`CatalogStore`] caches the loaded snapshot as
//! an `Arc<Catalog>` and swaps it in one write on refresh; a reader holding the
//! previous `Arc` keeps a consistent view until it drops it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::catalog_file::{Catalog, CatalogDocument};
use crate::error::{ImageChooserError, Result};
use crate::resolver::CatalogResolver;

/// Where catalogs come from
pub trait CatalogSource: Send + Sync {
    /// Load and normalize a fresh catalog
    fn load(&self) -> Result<Catalog>;

    /// Human-readable description for log messages
    fn describe(&self) -> String;
}

/// Reads the JSON catalog document from a path on every load
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for FileCatalogSource {
    fn load(&self) -> Result<Catalog> {
        CatalogDocument::load_from_file(&self.path)?.into_catalog()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Serves a catalog built in memory
#[derive(Debug, Clone)]
pub struct StaticCatalogSource {
    catalog: Catalog,
}

impl StaticCatalogSource {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl CatalogSource for StaticCatalogSource {
    fn load(&self) -> Result<Catalog> {
        Ok(self.catalog.clone())
    }

    fn describe(&self) -> String {
        "in-memory catalog".to_string()
    }
}

/// Caching front for a [`CatalogSource`].
///
/// # Invariants
///
/// - The cached snapshot is never mutated, only replaced
/// - A failed refresh leaves the previous snapshot in place
/// - Refreshes run one at a time, so the last one to start is the last to swap
#[derive(Debug)]
pub struct CatalogStore<S> {
    source: S,
    cached: RwLock<Option<Arc<Catalog>>>,
    refresh_lock: Mutex<()>,
    cache_enabled: bool,
}

impl<S: CatalogSource> CatalogStore<S> {
    /// Load lazily on first use, then serve the cached snapshot until refreshed
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            cache_enabled: true,
        }
    }

    /// Reload from the source on every call
    pub fn uncached(source: S) -> Self {
        Self {
            cache_enabled: false,
            ..Self::new(source)
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Current catalog snapshot
    pub fn snapshot(&self) -> Result<Arc<Catalog>> {
        if !self.cache_enabled {
            return Ok(Arc::new(self.load_from_source()?));
        }

        if let Some(catalog) = self.read_cache()? {
            return Ok(catalog);
        }
        self.refresh()
    }

    /// Reload from the source and replace the cached snapshot
    pub fn refresh(&self) -> Result<Arc<Catalog>> {
        // Held across load and swap; readers only take `cached` and never wait on I/O
        let _refreshing = self
            .refresh_lock
            .lock()
            .map_err(|_| ImageChooserError::state("catalog refresh lock poisoned"))?;

        let catalog = match self.load_from_source() {
            Ok(catalog) => Arc::new(catalog),
            Err(e) => {
                // A cold load failure reaches the caller; only a kept snapshot needs a warning
                if self.cache_enabled && self.read_cache()?.is_some() {
                    warn!(
                        "Failed to reload catalog from {}, keeping previous snapshot: {}",
                        self.source.describe(),
                        e
                    );
                } else {
                    debug!("Failed to load catalog from {}: {}", self.source.describe(), e);
                }
                return Err(e);
            }
        };

        if self.cache_enabled {
            let mut guard = self
                .cached
                .write()
                .map_err(|_| ImageChooserError::state("catalog cache lock poisoned"))?;
            *guard = Some(Arc::clone(&catalog));
        }
        info!("Loaded catalog from {}", self.source.describe());
        Ok(catalog)
    }

    /// Drop the cached snapshot; the next [`snapshot`](Self::snapshot) reloads
    pub fn invalidate(&self) -> Result<()> {
        let mut guard = self
            .cached
            .write()
            .map_err(|_| ImageChooserError::state("catalog cache lock poisoned"))?;
        *guard = None;
        debug!("Invalidated catalog cache for {}", self.source.describe());
        Ok(())
    }

    /// Resolver bound to the current snapshot
    pub fn resolver(&self) -> Result<CatalogResolver> {
        Ok(CatalogResolver::new(self.snapshot()?))
    }

    fn read_cache(&self) -> Result<Option<Arc<Catalog>>> {
        let guard = self
            .cached
            .read()
            .map_err(|_| ImageChooserError::state("catalog cache lock poisoned"))?;
        Ok(guard.as_ref().map(Arc::clone))
    }

    fn load_from_source(&self) -> Result<Catalog> {
        debug!("Loading catalog from {}", self.source.describe());
        self.source.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const V1: &str = r#"{
        "dockerimages": ["img-a"],
        "resources": {"small": {"ram": 1024, "cpu": 1}},
        "resource_mapping": {"default": ["small"]}
    }"#;

    const V2: &str = r#"{
        "dockerimages": ["img-a", "img-b"],
        "resources": {"small": {"ram": 2048, "cpu": 2}},
        "resource_mapping": {"default": ["small"]}
    }"#;

    /// Counts loads so tests can observe caching
    struct CountingSource {
        inner: FileCatalogSource,
        loads: AtomicUsize,
    }

    impl CatalogSource for CountingSource {
        fn load(&self) -> Result<Catalog> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load()
        }

        fn describe(&self) -> String {
            self.inner.describe()
        }
    }

    fn write_catalog(file: &NamedTempFile, json: &str) {
        std::fs::write(file.path(), json).unwrap();
    }

    fn counting(file: &NamedTempFile) -> CountingSource {
        CountingSource {
            inner: FileCatalogSource::new(file.path()),
            loads: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_snapshot_is_cached() {
        let file = NamedTempFile::new().unwrap();
        write_catalog(&file, V1);
        let store = CatalogStore::new(counting(&file));

        let first = store.snapshot().unwrap();
        let second = store.snapshot().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.source().loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_picks_up_edits() {
        let file = NamedTempFile::new().unwrap();
        write_catalog(&file, V1);
        let store = CatalogStore::new(FileCatalogSource::new(file.path()));

        let before = store.snapshot().unwrap();
        write_catalog(&file, V2);
        // Cached until refreshed
        assert_eq!(store.snapshot().unwrap().images().len(), 1);

        store.refresh().unwrap();
        let after = store.snapshot().unwrap();
        assert_eq!(after.images().len(), 2);
        // Old readers keep their consistent snapshot
        assert_eq!(before.images().len(), 1);
        assert_eq!(before.tier("small").unwrap().ram, 1024.0);
    }

    #[test]
    fn test_failed_refresh_keeps_previous_snapshot() {
        let file = NamedTempFile::new().unwrap();
        write_catalog(&file, V1);
        let store = CatalogStore::new(FileCatalogSource::new(file.path()));
        store.snapshot().unwrap();

        write_catalog(&file, r#"{"dockerimages": [], "resources": {}}"#);
        let err = store.refresh().unwrap_err();
        assert!(err.is_config());

        assert_eq!(store.snapshot().unwrap().images()[0].id, "img-a");
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let file = NamedTempFile::new().unwrap();
        write_catalog(&file, V1);
        let store = CatalogStore::new(counting(&file));

        store.snapshot().unwrap();
        write_catalog(&file, V2);
        store.invalidate().unwrap();

        assert_eq!(store.snapshot().unwrap().images().len(), 2);
        assert_eq!(store.source().loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_uncached_store_reads_every_time() {
        let file = NamedTempFile::new().unwrap();
        write_catalog(&file, V1);
        let store = CatalogStore::uncached(counting(&file));

        store.snapshot().unwrap();
        write_catalog(&file, V2);
        assert_eq!(store.snapshot().unwrap().images().len(), 2);
        assert_eq!(store.source().loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_file_surfaces_io_error() {
        let store = CatalogStore::new(FileCatalogSource::new("/nonexistent/spawn.json"));
        assert!(matches!(store.snapshot(), Err(ImageChooserError::Io(_))));
    }

    #[test]
    fn test_static_source_resolver() {
        let catalog = CatalogDocument::from_json(V1)
            .unwrap()
            .into_catalog()
            .unwrap();
        let store = CatalogStore::new(StaticCatalogSource::new(catalog));
        let resolver = store.resolver().unwrap();
        assert_eq!(resolver.available_images()[0].id, "img-a");
        assert_eq!(store.source().describe(), "in-memory catalog");
    }

    /// Each load yields a catalog whose `small` tier ram is the load number.
    /// The first load stalls until a second refresh has had a chance to start.
    struct GenerationSource {
        loads: AtomicUsize,
    }

    impl CatalogSource for GenerationSource {
        fn load(&self) -> Result<Catalog> {
            let generation = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
            if generation == 1 {
                std::thread::sleep(Duration::from_millis(200));
            }
            let json = V1.replace("1024", &generation.to_string());
            CatalogDocument::from_json(&json)?.into_catalog()
        }

        fn describe(&self) -> String {
            "generation source".to_string()
        }
    }

    #[test]
    fn test_overlapping_refreshes_keep_latest_load() {
        let store = Arc::new(CatalogStore::new(GenerationSource {
            loads: AtomicUsize::new(0),
        }));

        let slow = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.refresh().unwrap())
        };
        while store.source().loads.load(Ordering::SeqCst) == 0 {
            std::thread::yield_now();
        }

        let fresh = store.refresh().unwrap();
        let stale = slow.join().unwrap();

        assert_eq!(stale.tier("small").unwrap().ram, 1.0);
        assert_eq!(fresh.tier("small").unwrap().ram, 2.0);
        assert_eq!(store.snapshot().unwrap().tier("small").unwrap().ram, 2.0);
        assert_eq!(store.source().loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_readers_during_refresh() {
        let file = NamedTempFile::new().unwrap();
        write_catalog(&file, V1);
        let store = Arc::new(CatalogStore::new(FileCatalogSource::new(file.path())));
        store.snapshot().unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let snap = store.snapshot().unwrap();
                        // Either the whole old catalog or the whole new one
                        let ram = snap.tier("small").unwrap().ram;
                        let images = snap.images().len();
                        assert!((images == 1 && ram == 1024.0) || (images == 2 && ram == 2048.0));
                    }
                })
            })
            .collect();

        write_catalog(&file, V2);
        store.refresh().unwrap();

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
