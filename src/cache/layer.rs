//! Cache layer that orchestrates caching logic with network fetching.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

use super::options::FetchOptions;
use super::store::CacheStore;
use super::traits::{CacheKey, CacheResult, CacheType, Cacheable};
use crate::error::PluginResult;

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the entity client and the transport. Reads are
/// cache-first unless the request bypasses the cache; successful network
/// results are written back, unless the request's ticket was superseded
/// while it was in flight. Failures are returned as-is and never fall back
/// to expired data.
#[derive(Clone)]
pub struct CacheLayer {
  store: Arc<Mutex<CacheStore>>,
}

impl CacheLayer {
  /// Create a new cache layer owning the given store.
  pub fn new(store: CacheStore) -> Self {
    Self {
      store: Arc::new(Mutex::new(store)),
    }
  }

  // The store holds plain data, so a panic elsewhere cannot leave it
  // half-written in a way that matters; keep serving it.
  fn lock(&self) -> MutexGuard<'_, CacheStore> {
    self.store.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Run `f` with exclusive access to the store.
  ///
  /// Never hold on to the store across an await; this takes a closure so
  /// the lock cannot escape.
  pub fn with_store<R>(&self, f: impl FnOnce(&mut CacheStore) -> R) -> R {
    f(&mut self.lock())
  }

  pub fn get<T: Cacheable>(&self, id: &str) -> Option<T> {
    self.lock().get(id)
  }

  pub fn set<T: Cacheable>(&self, id: &str, item: T) {
    self.lock().set(id, item);
  }

  pub fn invalidate(&self, cache_type: CacheType, id: &str) -> bool {
    self.lock().invalidate(cache_type, id)
  }

  pub fn clear(&self, cache_type: Option<CacheType>) {
    self.lock().clear(cache_type);
  }

  /// Fetch a single item with cache-first strategy.
  ///
  /// 1. Unless bypassing, check cache - if fresh, return immediately
  /// 2. Otherwise fetch from network
  /// 3. Store the result under `id` if the request is still current
  pub async fn fetch_one<T, F, Fut>(
    &self,
    id: &str,
    opts: &FetchOptions,
    fetcher: F,
  ) -> PluginResult<CacheResult<T>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = PluginResult<T>>,
  {
    if !opts.bypass_cache {
      if let Some(cached) = self.get::<T>(id) {
        debug!(cache_type = %T::cache_type(), id, "returning cached value");
        return Ok(CacheResult::from_cache(cached));
      }
    }

    let data = fetcher().await?;
    self.write_back(opts, |store| store.set(id, data.clone()));
    Ok(CacheResult::from_network(data))
  }

  /// Fetch a collection that is only served from cache when every
  /// requested id is fresh. Any miss re-fetches the whole collection.
  pub async fn fetch_all<T, F, Fut>(
    &self,
    ids: &[String],
    opts: &FetchOptions,
    fetcher: F,
  ) -> PluginResult<CacheResult<Vec<T>>>
  where
    T: CacheKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = PluginResult<Vec<T>>>,
  {
    if !opts.bypass_cache {
      let cached = self.with_store(|store| store.get_all::<T>(ids));
      if let Some(cached) = cached {
        debug!(cache_type = %T::cache_type(), count = cached.len(), "returning cached values");
        return Ok(CacheResult::from_cache(cached));
      }
    }

    let data = fetcher().await?;
    self.write_back(opts, |store| store.set_each(&data));
    Ok(CacheResult::from_network(data))
  }

  /// Always fetch a collection from the network, then store every element
  /// under its own key.
  pub async fn fetch_each<T, F, Fut>(&self, opts: &FetchOptions, fetcher: F) -> PluginResult<Vec<T>>
  where
    T: CacheKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = PluginResult<Vec<T>>>,
  {
    let data = fetcher().await?;
    self.write_back(opts, |store| store.set_each(&data));
    Ok(data)
  }

  fn write_back(&self, opts: &FetchOptions, write: impl FnOnce(&mut CacheStore)) {
    let mut store = self.lock();
    // Checked under the lock so a superseded answer never lands
    if opts.may_write() {
      write(&mut store);
    } else {
      trace!("request superseded, not caching result");
    }
  }
}
