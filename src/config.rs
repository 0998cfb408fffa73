//! Configuration Module
//!
//! Cache policy plus folder and file name resolution for backing files.

use std::path::{Path, PathBuf};

use tracing::warn;

/// Fallback base name when no cache name is configured.
pub const DEFAULT_CACHE_NAME: &str = "default";

/// Folder used when neither an explicit folder nor an app name is supplied.
pub const FALLBACK_FOLDER: &str = "json_memo";

// == Cache Policy ==
/// Expiry, eviction and refresh rules for a cache store.
///
/// All rules are enforced when the store is persisted; the in-memory view
/// may exceed them between writes.
#[derive(Debug, Clone, Default)]
pub struct CachePolicy {
    /// Maximum entry age in seconds. None disables age checking.
    pub max_age: Option<u64>,
    /// Maximum number of entries kept on disk. None disables size checking.
    pub max_size: Option<usize>,
    /// When true, every put replaces the stored entry regardless of age.
    pub force_update: bool,
}

impl CachePolicy {
    /// Creates a policy with no expiry, no size bound and no forced updates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum entry age in seconds.
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Sets the maximum number of persisted entries.
    pub fn max_size(mut self, entries: usize) -> Self {
        self.max_size = Some(entries);
        self
    }

    /// Forces every put to refresh the stored entry.
    pub fn force_update(mut self) -> Self {
        self.force_update = true;
        self
    }
}

// == Memo Config ==
/// Configuration for a memoizer instance.
///
/// The backing file lands in `cache_dir` when one is given, otherwise in
/// the platform cache directory derived from `app_name`.
#[derive(Debug, Clone, Default)]
pub struct MemoConfig {
    /// Folder holding the cache file. Overrides app_name resolution.
    pub cache_dir: Option<PathBuf>,
    /// Application name used to derive a platform cache folder.
    pub app_name: Option<String>,
    /// Base name for the cache file, typically the wrapped function's name.
    pub cache_name: Option<String>,
    /// Expiry, eviction and refresh rules.
    pub policy: CachePolicy,
}

impl MemoConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the folder holding the cache file.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Sets the application name used for folder resolution.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Sets the base name of the cache file.
    pub fn cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = Some(name.into());
        self
    }

    /// Sets the expiry, eviction and refresh rules.
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    // == File Path Resolution ==
    /// Resolves the full path of the backing file.
    pub fn resolve_file_path(&self) -> PathBuf {
        let folder = resolve_cache_dir(self.cache_dir.as_deref(), self.app_name.as_deref());
        let name = self.cache_name.as_deref().unwrap_or(DEFAULT_CACHE_NAME);
        folder.join(format!("{}_cache.json", name))
    }
}

// == Folder Resolution ==
/// Picks the folder for a cache file.
///
/// An explicit folder wins. Otherwise the platform cache directory for the
/// application is used. With neither, files land in a shared fallback
/// folder, which risks collisions between callers, so a warning is logged.
pub fn resolve_cache_dir(cache_dir: Option<&Path>, app_name: Option<&str>) -> PathBuf {
    if let Some(dir) = cache_dir {
        return dir.to_path_buf();
    }

    let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
    match app_name {
        Some(name) if !name.is_empty() => base.join(name),
        _ => {
            warn!(
                "Caching in the default folder is not recommended. \
                 Provide app_name or cache_dir to avoid collisions."
            );
            base.join(FALLBACK_FOLDER)
        }
    }
}
