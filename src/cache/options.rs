//! Per-request fetch options and request versioning.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A generation counter for one logical slot (the current card, its list, ...).
///
/// Every request for the slot takes a [`Ticket`]; issuing a new one
/// supersedes all tickets handed out before it. A late answer carrying a
/// superseded ticket is dropped instead of being published or cached.
#[derive(Debug, Default)]
pub struct Lane {
  generation: Arc<AtomicU64>,
}

impl Lane {
  pub fn new() -> Self {
    Self::default()
  }

  /// Supersede every outstanding ticket and return a new current one.
  pub fn issue(&self) -> Ticket {
    let issued = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
    Ticket {
      generation: Arc::clone(&self.generation),
      issued,
    }
  }

  /// Supersede every outstanding ticket without issuing a new one.
  pub fn supersede(&self) {
    self.generation.fetch_add(1, Ordering::SeqCst);
  }
}

/// Version tag carried by an in-flight request.
#[derive(Debug, Clone)]
pub struct Ticket {
  generation: Arc<AtomicU64>,
  issued: u64,
}

impl Ticket {
  pub fn is_current(&self) -> bool {
    self.generation.load(Ordering::SeqCst) == self.issued
  }
}

/// Options for a single entity fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
  /// Skip the cache read and always go to the network.
  pub bypass_cache: bool,
  /// When set, the result is written to the cache only while this ticket
  /// is still current.
  pub ticket: Option<Ticket>,
}

impl FetchOptions {
  /// Cache-first fetch.
  pub fn cached() -> Self {
    Self::default()
  }

  /// Network fetch that overwrites the cache.
  pub fn bypass() -> Self {
    Self {
      bypass_cache: true,
      ticket: None,
    }
  }

  pub fn with_bypass(mut self, bypass_cache: bool) -> Self {
    self.bypass_cache = bypass_cache;
    self
  }

  pub fn with_ticket(mut self, ticket: Ticket) -> Self {
    self.ticket = Some(ticket);
    self
  }

  /// Whether a network result for this request may still be cached.
  pub fn may_write(&self) -> bool {
    self.ticket.as_ref().map_or(true, Ticket::is_current)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_new_ticket_supersedes_old() {
    let lane = Lane::new();
    let first = lane.issue();
    assert!(first.is_current());

    let second = lane.issue();
    assert!(!first.is_current());
    assert!(second.is_current());

    lane.supersede();
    assert!(!second.is_current());
  }

  #[test]
  fn test_may_write_follows_ticket() {
    let lane = Lane::new();
    assert!(FetchOptions::cached().may_write());

    let opts = FetchOptions::bypass().with_ticket(lane.issue());
    assert!(opts.may_write());
    lane.issue();
    assert!(!opts.may_write());
  }
}
