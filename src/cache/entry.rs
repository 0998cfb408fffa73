//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their on-disk form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A single cached call result with its creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The memoized return value
    pub value: Value,
    /// Creation timestamp, set once at insertion
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry timestamped at the current instant.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            created_at: Utc::now(),
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has outlived the supplied maximum age.
    ///
    /// An entry exactly `max_age` seconds old is still current; expiry
    /// starts strictly beyond the limit. With no maximum age the entry
    /// never expires.
    pub fn is_expired(&self, max_age_secs: Option<u64>) -> bool {
        match max_age_secs {
            Some(max_age) => {
                let age_ms = Utc::now()
                    .signed_duration_since(self.created_at)
                    .num_milliseconds();
                age_ms > max_age as i64 * 1000
            }
            None => false,
        }
    }

    // == Age ==
    /// Returns the entry age in whole seconds.
    pub fn age_seconds(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.created_at)
            .num_seconds()
    }
}

// == Stored Entry ==
/// On-disk form of a cache entry.
///
/// The backing file is a JSON array of these records, so the store's
/// insertion order survives a save/load cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    /// The derived call key
    pub key: String,
    /// The memoized return value
    pub value: Value,
    /// Creation timestamp of the entry
    pub created_at: DateTime<Utc>,
}
