//! Process-wide dataset cache
//!
//! Uses moka with TTL-based expiration. A TTL of zero keeps the dataset for
//! the whole process lifetime. Reloads are single-flight: concurrent misses
//! wait for one load instead of fetching the source several times.

use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::loader::{DatasetLoader, LoadError, ParseOutcome};

/// The cache holds a single dataset
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct DatasetKey;

/// Cached dataset with the loader that refills it
pub struct DatasetCache {
    cache: Cache<DatasetKey, Arc<ParseOutcome>>,
    loader: DatasetLoader,
    reload: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    ttl: Option<Duration>,
}

impl DatasetCache {
    /// `ttl = None` means the dataset never expires
    pub fn new(loader: DatasetLoader, ttl: Option<Duration>) -> Self {
        let builder = Cache::builder();
        let cache = match ttl {
            Some(ttl) => builder.time_to_live(ttl).build(),
            None => builder.build(),
        };

        Self {
            cache,
            loader,
            reload: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            ttl,
        }
    }

    /// Return the cached dataset, loading it on a miss.
    ///
    /// A failed load leaves the cache empty so no partial dataset is served.
    pub async fn get(&self) -> Result<Arc<ParseOutcome>, LoadError> {
        if let Some(outcome) = self.cache.get(&DatasetKey) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(outcome);
        }

        let _guard = self.reload.lock().await;
        if let Some(outcome) = self.cache.get(&DatasetKey) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(outcome);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let outcome = match self.loader.load().await {
            Ok(outcome) => Arc::new(outcome),
            Err(e) => {
                tracing::error!("Failed to load dataset from {}: {}", self.loader.source(), e);
                return Err(e);
            }
        };

        self.loads.fetch_add(1, Ordering::Relaxed);
        self.cache.insert(DatasetKey, Arc::clone(&outcome));
        Ok(outcome)
    }

    /// Drop the cached dataset; the next `get` reloads it
    pub fn invalidate(&self) {
        self.cache.invalidate(&DatasetKey);
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            loads: self.loads.load(Ordering::Relaxed),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            ttl_secs: self.ttl.map(|t| t.as_secs()),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Successful loads from the source
    pub loads: u64,
    /// Hit rate (0.0 - 1.0)
    pub hit_rate: f64,
    /// None when the dataset lives for the process lifetime
    pub ttl_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::sample_csv;
    use crate::data::{ColumnMapping, DatasetSource};

    fn loader_for(path: std::path::PathBuf) -> DatasetLoader {
        DatasetLoader::new(DatasetSource::LocalFile(path), ColumnMapping::builtin()).unwrap()
    }

    #[tokio::test]
    async fn test_second_get_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcels.csv");
        std::fs::write(&path, sample_csv()).unwrap();

        let cache = DatasetCache::new(loader_for(path.clone()), None);
        let first = cache.get().await.unwrap();

        // Source disappears; cached copy is still served
        std::fs::remove_file(&path).unwrap();
        let second = cache.get().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.ttl_secs, None);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcels.csv");

        let cache = DatasetCache::new(loader_for(path.clone()), Some(Duration::from_secs(3600)));
        assert!(matches!(cache.get().await, Err(LoadError::NotFound(_))));

        std::fs::write(&path, sample_csv()).unwrap();
        let outcome = cache.get().await.unwrap();
        assert_eq!(outcome.dataset.len(), 4);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcels.csv");
        std::fs::write(&path, sample_csv()).unwrap();

        let cache = DatasetCache::new(loader_for(path), None);
        cache.get().await.unwrap();
        cache.invalidate();
        cache.get().await.unwrap();

        assert_eq!(cache.stats().loads, 2);
    }

    #[tokio::test]
    async fn test_expired_dataset_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcels.csv");
        std::fs::write(&path, sample_csv()).unwrap();

        let cache = DatasetCache::new(loader_for(path), Some(Duration::from_millis(50)));
        let first = cache.get().await.unwrap();
        let cached = cache.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &cached));

        tokio::time::sleep(Duration::from_millis(120)).await;
        let reloaded = cache.get().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &reloaded));
        let stats = cache.stats();
        assert_eq!(stats.loads, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.ttl_secs, Some(0));
    }
}
