//! Json Memo - A persistent function-level memoization cache
//!
//! Stores the arguments and return value of expensive deterministic calls
//! in a JSON backing file, so a later call with the same arguments is
//! answered from storage instead of re-executed. Age expiry and
//! size-bounded eviction are applied whenever the file is written.
//!
//! Intended to be fast relative to a slow upstream operation such as a
//! remote API, not relative to an in-process map. A store assumes one
//! logical writer per backing file; if several processes share one, the
//! last writer wins.
//!
//! # Example
//!
//! ```no_run
//! use json_memo::{CachePolicy, CallArgs, MemoConfig, Memoizer};
//!
//! # async fn fetch_forecast(city: &str) -> String { String::new() }
//! # async fn demo() -> json_memo::Result<()> {
//! let memoizer = Memoizer::new(
//!     MemoConfig::new()
//!         .app_name("weather_app")
//!         .cache_name("get_forecast")
//!         .policy(CachePolicy::new().max_age(3600).max_size(500)),
//! );
//!
//! let args = CallArgs::new().arg(&"london")?.named("units", &"metric")?;
//! let forecast: String = memoizer
//!     .call(&args, || async { fetch_forecast("london").await })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod memoize;
pub mod tasks;

pub use cache::{CacheEntry, CacheStats, CacheStore, CallArgs, KeyEncoder};
pub use config::{CachePolicy, MemoConfig};
pub use error::{CacheError, Result};
pub use memoize::Memoizer;
pub use tasks::spawn_flush_task;
