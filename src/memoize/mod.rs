//! Memoizer Module
//!
//! Wraps expensive deterministic calls with a persistent cache lookup.
//!
//! Callers describe each call's arguments, hand over the computation, and
//! get back either the cached result or a freshly computed one that is
//! recorded and persisted before being returned.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::cache::{CacheStore, CallArgs, KeyEncoder};
use crate::config::MemoConfig;
use crate::error::Result;

// == Memoizer ==
/// Persistent memoization wrapper around a cache store.
///
/// The store is shared behind `Arc<RwLock<_>>`, so clones of a memoizer
/// operate on the same cache and the handle can be given to a background
/// flush task.
#[derive(Debug, Clone)]
pub struct Memoizer {
    /// Thread-safe cache store
    store: Arc<RwLock<CacheStore>>,
    /// Derives call keys and reports unstable argument representations
    encoder: KeyEncoder,
    /// When true, lookups are skipped so every call recomputes
    force_update: bool,
}

impl Memoizer {
    // == Constructor ==
    /// Creates a memoizer from the supplied configuration.
    ///
    /// The backing file path is resolved from the configured folder, app
    /// name and cache name, and any existing durable state is loaded.
    pub fn new(config: MemoConfig) -> Self {
        let path = config.resolve_file_path();
        let force_update = config.policy.force_update;
        let store = CacheStore::load(path, config.policy);

        Self {
            store: Arc::new(RwLock::new(store)),
            encoder: KeyEncoder::new(),
            force_update,
        }
    }

    /// Replaces the key encoder, e.g. to install a custom warning observer.
    pub fn with_encoder(mut self, encoder: KeyEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> Arc<RwLock<CacheStore>> {
        Arc::clone(&self.store)
    }

    // == Call ==
    /// Runs a call through the cache.
    ///
    /// On a hit the stored value is returned without running the future.
    /// On a miss the future runs with no lock held, and its result is
    /// recorded and persisted before being returned. When updates are
    /// forced the lookup is skipped entirely. A failed persist surfaces
    /// the storage error.
    pub async fn call<T, F, Fut>(&self, args: &CallArgs, func: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let key = self.encoder.encode(args);

        if !self.force_update {
            // Write lock: lookups update hit/miss statistics
            let mut store = self.store.write().await;
            if let Some(value) = store.get(&key) {
                return Ok(serde_json::from_value(value)?);
            }
        }

        let result = func().await;
        self.record(&key, &result).await?;
        Ok(result)
    }

    // == Try Call ==
    /// Runs a fallible call through the cache.
    ///
    /// Only successful results are recorded; errors pass through uncached
    /// so the next call retries the computation.
    pub async fn try_call<T, E, F, Fut>(
        &self,
        args: &CallArgs,
        func: F,
    ) -> Result<std::result::Result<T, E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = self.encoder.encode(args);

        if !self.force_update {
            let mut store = self.store.write().await;
            if let Some(value) = store.get(&key) {
                return Ok(Ok(serde_json::from_value(value)?));
            }
        }

        match func().await {
            Ok(result) => {
                self.record(&key, &result).await?;
                Ok(Ok(result))
            }
            Err(err) => Ok(Err(err)),
        }
    }

    // == Call Blocking ==
    /// Synchronous variant of [`call`](Self::call).
    ///
    /// For callers outside an async context; must not be invoked from
    /// within a runtime.
    pub fn call_blocking<T, F>(&self, args: &CallArgs, func: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let key = self.encoder.encode(args);

        if !self.force_update {
            let mut store = self.store.blocking_write();
            if let Some(value) = store.get(&key) {
                return Ok(serde_json::from_value(value)?);
            }
        }

        let result = func();
        {
            let mut store = self.store.blocking_write();
            store.put(&key, &result)?;
            store.persist()?;
        }
        info!("{} cached", key);
        Ok(result)
    }

    /// Records a fresh result and flushes the store.
    async fn record<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut store = self.store.write().await;
        store.put(key, value)?;
        store.persist()?;
        info!("{} cached", key);
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CachePolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn test_config(dir: &tempfile::TempDir) -> MemoConfig {
        MemoConfig::new().cache_dir(dir.path()).cache_name("test_fn")
    }

    fn args_for(city: &str) -> CallArgs {
        CallArgs::new().arg(&city).unwrap()
    }

    #[tokio::test]
    async fn test_call_computes_once() {
        let dir = tempdir().unwrap();
        let memoizer = Memoizer::new(test_config(&dir));
        let calls = AtomicUsize::new(0);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            "computed".to_string()
        };

        let first: String = memoizer.call(&args_for("london"), compute).await.unwrap();
        let second: String = memoizer
            .call(&args_for("london"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                "recomputed".to_string()
            })
            .await
            .unwrap();

        assert_eq!(first, "computed");
        assert_eq!(second, "computed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_call_distinguishes_arguments() {
        let dir = tempdir().unwrap();
        let memoizer = Memoizer::new(test_config(&dir));

        let first: String = memoizer
            .call(&args_for("london"), || async { "london_result".to_string() })
            .await
            .unwrap();
        let second: String = memoizer
            .call(&args_for("paris"), || async { "paris_result".to_string() })
            .await
            .unwrap();

        assert_eq!(first, "london_result");
        assert_eq!(second, "paris_result");
    }

    #[tokio::test]
    async fn test_call_survives_restart() {
        let dir = tempdir().unwrap();
        let calls = AtomicUsize::new(0);

        {
            let memoizer = Memoizer::new(test_config(&dir));
            let _: u32 = memoizer
                .call(&args_for("london"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    7
                })
                .await
                .unwrap();
        }

        // A fresh memoizer over the same backing file answers from disk
        let memoizer = Memoizer::new(test_config(&dir));
        let value: u32 = memoizer
            .call(&args_for("london"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                99
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_update_recomputes() {
        let dir = tempdir().unwrap();
        let config = test_config(&dir);

        let memoizer = Memoizer::new(config.clone());
        let _: String = memoizer
            .call(&args_for("london"), || async { "first".to_string() })
            .await
            .unwrap();

        let forcing = Memoizer::new(config.policy(CachePolicy::new().force_update()));
        let value: String = forcing
            .call(&args_for("london"), || async { "second".to_string() })
            .await
            .unwrap();

        assert_eq!(value, "second");
    }

    #[tokio::test]
    async fn test_try_call_caches_only_ok() {
        let dir = tempdir().unwrap();
        let memoizer = Memoizer::new(test_config(&dir));
        let calls = AtomicUsize::new(0);

        let failing = memoizer
            .try_call(&args_for("london"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<String, String>("upstream down".to_string())
            })
            .await
            .unwrap();
        assert!(failing.is_err());

        // The error was not recorded, so the next call runs again
        let ok = memoizer
            .try_call(&args_for("london"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<String, String>("recovered".to_string())
            })
            .await
            .unwrap();
        assert_eq!(ok.unwrap(), "recovered");

        // Now the Ok result is served from the cache
        let cached = memoizer
            .try_call(&args_for("london"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<String, String>("never".to_string())
            })
            .await
            .unwrap();
        assert_eq!(cached.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_call_blocking_computes_once() {
        let dir = tempdir().unwrap();
        let memoizer = Memoizer::new(test_config(&dir));
        let calls = AtomicUsize::new(0);

        let first: String = memoizer
            .call_blocking(&args_for("london"), || {
                calls.fetch_add(1, Ordering::SeqCst);
                "computed".to_string()
            })
            .unwrap();
        let second: String = memoizer
            .call_blocking(&args_for("london"), || {
                calls.fetch_add(1, Ordering::SeqCst);
                "recomputed".to_string()
            })
            .unwrap();

        assert_eq!(first, "computed");
        assert_eq!(second, "computed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_structured_results_roundtrip() {
        let dir = tempdir().unwrap();
        let memoizer = Memoizer::new(test_config(&dir));

        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Forecast {
            city: String,
            temps: Vec<f64>,
        }

        let expected = Forecast {
            city: "london".to_string(),
            temps: vec![11.5, 13.0, 9.75],
        };

        let _: Forecast = memoizer
            .call(&args_for("london"), || async {
                Forecast {
                    city: "london".to_string(),
                    temps: vec![11.5, 13.0, 9.75],
                }
            })
            .await
            .unwrap();

        let cached: Forecast = memoizer
            .call(&args_for("london"), || async {
                panic!("should be served from cache")
            })
            .await
            .unwrap();

        assert_eq!(cached, expected);
    }
}
