//! Core traits and types for the caching system.

use std::fmt;
use tokio::time::Instant;

/// Entity types with their own cache shelf and expiration window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheType {
  Card,
  List,
  Label,
  Actions,
  Checklist,
}

impl fmt::Display for CacheType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      CacheType::Card => "card",
      CacheType::List => "list",
      CacheType::Label => "label",
      CacheType::Actions => "actions",
      CacheType::Checklist => "checklist",
    };
    f.write_str(name)
  }
}

/// Trait for values that can be cached.
///
/// The cache key is supplied by the caller: a card is stored under its own
/// id, while a board's labels are stored under the board id.
pub trait Cacheable: Clone + Send + Sync + 'static {
  /// Shelf this value lives on
  fn cache_type() -> CacheType;
}

/// Cacheable entities that carry their own id.
///
/// Collection fetches store every element individually under this key.
pub trait CacheKey: Cacheable {
  fn cache_key(&self) -> String;
}

/// A cached item and the instant it was written.
///
/// Entries are never mutated; a newer fetch replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  pub item: T,
  pub timestamp: Instant,
}

impl<T> CacheEntry<T> {
  pub fn new(item: T) -> Self {
    Self {
      item,
      timestamp: Instant::now(),
    }
  }
}

/// Result from a cache operation, including where the data came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  /// Create a new cache result from a fresh cache entry.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  pub fn is_cached(&self) -> bool {
    self.source == CacheSource::Cache
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, within its expiration window
  Cache,
}
