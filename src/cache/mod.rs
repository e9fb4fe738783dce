//! Time-expiring in-memory caches for remote entities.
//!
//! This module provides the caching mechanism the entity client sits on:
//! - One shelf per entity type, each with its own expiration window
//! - Staleness judged on read; expired entries are misses, never served
//! - Cache-first reads, bypassable per request
//! - Versioned requests so superseded answers are never written back

mod layer;
mod options;
mod store;
mod traits;

pub use layer::CacheLayer;
pub use options::{FetchOptions, Lane, Ticket};
pub use store::{CacheStore, CacheTtl};
pub use traits::{CacheEntry, CacheKey, CacheResult, CacheSource, CacheType, Cacheable};
