//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is live.
//!
//! # Tasks
//! - Periodic Flush: persists the store on a cadence, applying age and
//!   size rules each time

mod flush;

pub use flush::spawn_flush_task;
