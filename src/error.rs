//! Error types for the memoization cache
//!
//! Provides unified error handling using thiserror.
//!
//! A missing or unreadable backing file at load time is deliberately not an
//! error: it is recovered as a cold cache and logged. Only write-side and
//! serialization failures are surfaced to the caller.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the memoization cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backing file could not be written at persist time.
    ///
    /// The in-memory store is left unchanged when this is returned, so the
    /// caller may retry the persist.
    #[error("Failed to write cache file {}: {source}", path.display())]
    StorageWrite {
        /// Path of the backing file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A value or argument could not be represented in the backing format
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the memoization cache.
pub type Result<T> = std::result::Result<T, CacheError>;
