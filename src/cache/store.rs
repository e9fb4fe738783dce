//! In-memory TTL store, one shelf per entity type.

use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use super::traits::{CacheEntry, CacheKey, CacheType, Cacheable};

/// Expiration window per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
  pub card: Duration,
  pub list: Duration,
  pub label: Duration,
  pub actions: Duration,
  pub checklist: Duration,
}

impl Default for CacheTtl {
  fn default() -> Self {
    Self {
      card: Duration::from_secs(120),
      list: Duration::from_secs(600),
      label: Duration::from_secs(600),
      actions: Duration::from_secs(60),
      checklist: Duration::from_secs(60),
    }
  }
}

impl CacheTtl {
  pub fn for_type(&self, cache_type: CacheType) -> Duration {
    match cache_type {
      CacheType::Card => self.card,
      CacheType::List => self.list,
      CacheType::Label => self.label,
      CacheType::Actions => self.actions,
      CacheType::Checklist => self.checklist,
    }
  }
}

type AnyItem = Box<dyn Any + Send + Sync>;
type Shelf = HashMap<String, CacheEntry<AnyItem>>;

/// Keyed store of `{item, timestamp}` per entity type.
///
/// Freshness is decided when reading: an entry older than its type's TTL is
/// reported as a miss but stays in place until it is overwritten,
/// invalidated or cleared. There is no background eviction.
///
/// Not synchronized. One writer per process; share it through
/// [`CacheLayer`](super::CacheLayer).
pub struct CacheStore {
  shelves: HashMap<CacheType, Shelf>,
  ttl: CacheTtl,
}

impl Default for CacheStore {
  fn default() -> Self {
    Self::new(CacheTtl::default())
  }
}

impl CacheStore {
  pub fn new(ttl: CacheTtl) -> Self {
    Self {
      shelves: HashMap::new(),
      ttl,
    }
  }

  /// Get an item if present and not expired.
  pub fn get<T: Cacheable>(&self, id: &str) -> Option<T> {
    let cache_type = T::cache_type();
    let entry = self.shelves.get(&cache_type)?.get(id)?;
    let age = Instant::now().saturating_duration_since(entry.timestamp);
    if age > self.ttl.for_type(cache_type) {
      trace!(%cache_type, id, ?age, "cache entry expired");
      return None;
    }
    entry.item.downcast_ref::<T>().cloned()
  }

  /// Get every requested item, or nothing.
  ///
  /// A single missing or expired id makes the whole lookup a miss. An empty
  /// request is a miss too, since there is nothing to vouch for.
  pub fn get_all<T: Cacheable>(&self, ids: &[String]) -> Option<Vec<T>> {
    if ids.is_empty() {
      return None;
    }
    ids.iter().map(|id| self.get::<T>(id)).collect()
  }

  /// Overwrite the entry for `id` with a fresh timestamp.
  pub fn set<T: Cacheable>(&mut self, id: &str, item: T) {
    self
      .shelves
      .entry(T::cache_type())
      .or_default()
      .insert(id.to_string(), CacheEntry::new(Box::new(item) as AnyItem));
  }

  /// Store each element under its own key, all with the same timestamp.
  pub fn set_each<T: CacheKey>(&mut self, items: &[T]) {
    let timestamp = Instant::now();
    let shelf = self.shelves.entry(T::cache_type()).or_default();
    for item in items {
      shelf.insert(
        item.cache_key(),
        CacheEntry {
          item: Box::new(item.clone()) as AnyItem,
          timestamp,
        },
      );
    }
  }

  /// Drop a single entry. Returns whether one was present.
  pub fn invalidate(&mut self, cache_type: CacheType, id: &str) -> bool {
    self
      .shelves
      .get_mut(&cache_type)
      .map(|shelf| shelf.remove(id).is_some())
      .unwrap_or(false)
  }

  /// Clear one shelf, or all of them.
  pub fn clear(&mut self, cache_type: Option<CacheType>) {
    match cache_type {
      Some(t) => {
        self.shelves.remove(&t);
      }
      None => self.shelves.clear(),
    }
  }

  /// Whether an entry exists, fresh or not.
  pub fn contains(&self, cache_type: CacheType, id: &str) -> bool {
    self
      .shelves
      .get(&cache_type)
      .is_some_and(|shelf| shelf.contains_key(id))
  }

  /// Number of entries on a shelf, fresh or not.
  pub fn len(&self, cache_type: CacheType) -> usize {
    self.shelves.get(&cache_type).map_or(0, HashMap::len)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Clone, PartialEq)]
  struct Note(&'static str);

  impl Cacheable for Note {
    fn cache_type() -> CacheType {
      CacheType::Card
    }
  }

  impl CacheKey for Note {
    fn cache_key(&self) -> String {
      self.0.to_string()
    }
  }

  #[derive(Debug, Clone, PartialEq)]
  struct Comments(Vec<&'static str>);

  impl Cacheable for Comments {
    fn cache_type() -> CacheType {
      CacheType::Actions
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_set_then_get_until_ttl() {
    let mut store = CacheStore::default();
    store.set("c1", Note("c1"));
    assert_eq!(store.get::<Note>("c1"), Some(Note("c1")));

    tokio::time::advance(Duration::from_secs(120)).await;
    assert_eq!(store.get::<Note>("c1"), Some(Note("c1")));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(store.get::<Note>("c1"), None);
    // Still there, only judged stale
    assert!(store.contains(CacheType::Card, "c1"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_ttl_is_per_type() {
    let mut store = CacheStore::default();
    store.set("c1", Note("c1"));
    store.set("c1", Comments(vec!["hi"]));

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(store.get::<Comments>("c1"), None);
    assert!(store.get::<Note>("c1").is_some());
  }

  #[tokio::test(start_paused = true)]
  async fn test_set_refreshes_timestamp() {
    let mut store = CacheStore::default();
    store.set("c1", Note("old"));
    tokio::time::advance(Duration::from_secs(100)).await;
    store.set("c1", Note("new"));
    tokio::time::advance(Duration::from_secs(100)).await;
    assert_eq!(store.get::<Note>("c1"), Some(Note("new")));
  }

  #[tokio::test(start_paused = true)]
  async fn test_get_all_requires_every_member() {
    let mut store = CacheStore::default();
    store.set_each(&[Note("a")]);

    let ids = vec!["a".to_string(), "b".to_string()];
    assert_eq!(store.get_all::<Note>(&ids), None);

    store.set_each(&[Note("b")]);
    assert_eq!(store.get_all::<Note>(&ids), Some(vec![Note("a"), Note("b")]));

    assert_eq!(store.get_all::<Note>(&[]), None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_get_all_misses_on_one_stale_member() {
    let mut store = CacheStore::default();
    store.set_each(&[Note("a")]);
    tokio::time::advance(Duration::from_secs(100)).await;
    store.set_each(&[Note("b")]);
    tokio::time::advance(Duration::from_secs(30)).await;

    let ids = vec!["a".to_string(), "b".to_string()];
    assert_eq!(store.get_all::<Note>(&ids), None);
  }

  #[test]
  fn test_invalidate_and_clear() {
    let mut store = CacheStore::default();
    store.set("c1", Note("c1"));
    store.set("c2", Note("c2"));
    store.set("c1", Comments(vec![]));

    assert!(store.invalidate(CacheType::Card, "c1"));
    assert!(!store.invalidate(CacheType::Card, "c1"));
    assert_eq!(store.len(CacheType::Card), 1);

    store.clear(Some(CacheType::Card));
    assert_eq!(store.len(CacheType::Card), 0);
    assert_eq!(store.len(CacheType::Actions), 1);

    store.clear(None);
    assert_eq!(store.len(CacheType::Actions), 0);
  }
}
