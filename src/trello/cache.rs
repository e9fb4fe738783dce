//! Caching implementations for Trello types.

use crate::cache::{CacheKey, CacheType, Cacheable};

use super::types::{Action, Card, Checklist, Label, List};

impl Cacheable for Card {
  fn cache_type() -> CacheType {
    CacheType::Card
  }
}

impl CacheKey for Card {
  fn cache_key(&self) -> String {
    self.id.clone()
  }
}

impl Cacheable for List {
  fn cache_type() -> CacheType {
    CacheType::List
  }
}

impl CacheKey for List {
  fn cache_key(&self) -> String {
    self.id.clone()
  }
}

impl Cacheable for Checklist {
  fn cache_type() -> CacheType {
    CacheType::Checklist
  }
}

impl CacheKey for Checklist {
  fn cache_key(&self) -> String {
    self.id.clone()
  }
}

// Collections below are stored under their parent's id: labels by board,
// comments by card.

impl Cacheable for Vec<Label> {
  fn cache_type() -> CacheType {
    CacheType::Label
  }
}

impl Cacheable for Vec<Action> {
  fn cache_type() -> CacheType {
    CacheType::Actions
  }
}
