//! Cache Store Module
//!
//! Main cache engine combining ordered key-value storage with age expiry,
//! size-bounded eviction and the load/persist cycle against a JSON backing
//! file.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats, InsertOrder, StoredEntry};
use crate::config::CachePolicy;
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Persistent key-value store for memoized call results.
///
/// Age and size rules are enforced when the store is persisted; the
/// in-memory view may exceed them between writes. Intended to be fast
/// relative to a slow upstream call, not relative to an in-process map.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// First-insertion order of keys
    order: InsertOrder,
    /// Expiry, eviction and refresh rules
    policy: CachePolicy,
    /// Backing file location
    path: PathBuf,
    /// Performance statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Load ==
    /// Opens the store backed by the given file.
    ///
    /// A missing, unreadable or corrupt backing file yields an empty store;
    /// a cold cache is never an error. The order of records in the file
    /// becomes the store's insertion order.
    pub fn load(path: impl Into<PathBuf>, policy: CachePolicy) -> Self {
        let mut store = Self {
            entries: HashMap::new(),
            order: InsertOrder::new(),
            policy,
            path: path.into(),
            stats: CacheStats::new(),
        };
        store.read_file();
        store
    }

    /// Loads durable state from the backing file, best effort.
    fn read_file(&mut self) {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache file at {}, starting cold", self.path.display());
                return;
            }
            Err(err) => {
                warn!(
                    "Cache file {} unreadable ({}), starting cold",
                    self.path.display(),
                    err
                );
                return;
            }
        };

        if contents.trim().is_empty() {
            return;
        }

        let records: Vec<StoredEntry> = match serde_json::from_str(&contents) {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    "Cache file {} corrupt ({}), starting cold",
                    self.path.display(),
                    err
                );
                return;
            }
        };

        for record in records {
            self.order.record(&record.key);
            self.entries.insert(
                record.key,
                CacheEntry {
                    value: record.value,
                    created_at: record.created_at,
                },
            );
        }
        self.stats.set_total_entries(self.entries.len());
        debug!(
            "Loaded {} entries from {}",
            self.entries.len(),
            self.path.display()
        );
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns the value only while the entry is within the configured
    /// maximum age. An expired entry is a miss but is left in place; its
    /// removal is decided at the next persist.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let hit = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(self.policy.max_age) => Some(entry.value.clone()),
            _ => None,
        };

        match hit {
            Some(value) => {
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Put ==
    /// Stores a value under the supplied key.
    ///
    /// The entry is written with a fresh creation time when updates are
    /// forced, the key is new, or the existing entry has expired. A live
    /// entry is left untouched; its timestamp is never silently refreshed
    /// by a put that would keep it within its valid window.
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;

        let replace = self.policy.force_update
            || match self.entries.get(key) {
                Some(existing) => existing.is_expired(self.policy.max_age),
                None => true,
            };
        if !replace {
            debug!("Key still current, not refreshed: {}", key);
            return Ok(());
        }

        self.order.record(key);
        self.entries.insert(key.to_string(), CacheEntry::new(value));
        self.stats.set_total_entries(self.entries.len());
        Ok(())
    }

    // == Persist ==
    /// Writes the store to its backing file, enforcing age and size rules.
    ///
    /// Entries beyond the maximum age are dropped rather than written. If a
    /// maximum size is set and the survivors exceed it, the oldest are
    /// evicted by creation time until the count fits, with ties kept in
    /// insertion order. Survivors are written in insertion order.
    ///
    /// Serialization happens before any I/O, and the in-memory store is
    /// only pruned once the file write succeeds, so a failed persist leaves
    /// the store unchanged and can be retried.
    pub fn persist(&mut self) -> Result<()> {
        let mut survivors: Vec<(String, CacheEntry)> = Vec::new();
        let mut expired = 0usize;
        for key in self.order.iter() {
            if let Some(entry) = self.entries.get(key) {
                if entry.is_expired(self.policy.max_age) {
                    expired += 1;
                } else {
                    survivors.push((key.clone(), entry.clone()));
                }
            }
        }

        let mut evicted = 0usize;
        if let Some(max_size) = self.policy.max_size {
            if survivors.len() > max_size {
                evicted = survivors.len() - max_size;
                // Stable sort keeps insertion order between equal timestamps
                let mut by_age = survivors.clone();
                by_age.sort_by_key(|(_, entry)| entry.created_at);
                let dropped: HashSet<String> =
                    by_age.iter().take(evicted).map(|(key, _)| key.clone()).collect();
                survivors.retain(|(key, _)| !dropped.contains(key));
            }
        }

        let records: Vec<StoredEntry> = survivors
            .iter()
            .map(|(key, entry)| StoredEntry {
                key: key.clone(),
                value: entry.value.clone(),
                created_at: entry.created_at,
            })
            .collect();
        let serialized = serde_json::to_string_pretty(&records)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| CacheError::StorageWrite {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }
        fs::write(&self.path, serialized).map_err(|source| CacheError::StorageWrite {
            path: self.path.clone(),
            source,
        })?;

        // The write is durable; prune the in-memory view to match it
        let mut entries = HashMap::with_capacity(survivors.len());
        let mut order = InsertOrder::new();
        for (key, entry) in survivors {
            order.record(&key);
            entries.insert(key, entry);
        }
        self.entries = entries;
        self.order = order;

        self.stats.record_expirations(expired);
        self.stats.record_evictions(evicted);
        self.stats.set_total_entries(self.entries.len());

        debug!(
            "Persisted {} entries to {} ({} expired, {} evicted)",
            self.entries.len(),
            self.path.display(),
            expired,
            evicted
        );
        Ok(())
    }

    // == Contains ==
    /// Checks whether a key holds an unexpired entry.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired(self.policy.max_age))
            .unwrap_or(false)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Accessors ==
    /// The expiry, eviction and refresh rules in effect.
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// The backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // == Length ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
