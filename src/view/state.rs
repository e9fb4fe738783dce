//! The slots the view manager fills, and the snapshot it publishes.

use crate::error::PluginError;
use crate::links::CardLink;
use crate::severity;
use crate::trello::types::{Action, Card, CheckItem, Checklist, List};

/// Where the view is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
  /// Nothing connected, or the connected id points nowhere.
  #[default]
  Idle,
  /// Waiting for the card.
  Resolving,
  /// Card present. Dependents fill in as they arrive.
  Ready,
  /// At least one slot failed; this is the worst failure.
  Errored(PluginError),
}

/// What the panel renders.
///
/// When `error` is set the panel should show it rather than the partial
/// data, which is still included so it can be shown again without a fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewSnapshot {
  pub connected_id: Option<String>,
  pub phase: Phase,
  pub card: Option<Card>,
  pub actions: Option<Vec<Action>>,
  pub list: Option<List>,
  pub checklists: Option<Vec<Checklist>>,
  pub error: Option<PluginError>,
}

/// A value slot with its own error.
#[derive(Debug, Clone)]
pub(crate) struct Slot<T> {
  pub value: Option<T>,
  pub error: Option<PluginError>,
}

// Derived Default would require T: Default
impl<T> Default for Slot<T> {
  fn default() -> Self {
    Self {
      value: None,
      error: None,
    }
  }
}

impl<T> Slot<T> {
  pub fn fill(&mut self, result: Result<T, PluginError>) {
    match result {
      Ok(value) => {
        self.value = Some(value);
        self.error = None;
      }
      Err(error) => {
        self.value = None;
        self.error = Some(error);
      }
    }
  }

  pub fn reset(&mut self) {
    self.value = None;
    self.error = None;
  }
}

/// Everything the manager knows about the current connection.
#[derive(Debug, Default)]
pub(crate) struct ViewState {
  pub connected_id: Option<String>,
  pub link: Option<CardLink>,
  pub card: Slot<Card>,
  pub actions: Slot<Vec<Action>>,
  pub list: Slot<List>,
  pub checklists: Slot<Vec<Checklist>>,
}

impl ViewState {
  pub fn connected(connected_id: Option<String>, link: Option<CardLink>) -> Self {
    Self {
      connected_id,
      link,
      ..Self::default()
    }
  }

  pub fn current_card_id(&self) -> Option<&str> {
    self.card.value.as_ref().map(|c| c.id.as_str())
  }

  pub fn reset_dependents(&mut self) {
    self.actions.reset();
    self.list.reset();
    self.checklists.reset();
  }

  pub fn worst_error(&self) -> Option<PluginError> {
    severity::worst([
      self.card.error,
      self.actions.error,
      self.list.error,
      self.checklists.error,
    ])
  }

  pub fn phase(&self) -> Phase {
    if self.link.is_none() {
      return Phase::Idle;
    }
    match (self.worst_error(), &self.card.value) {
      (Some(error), _) => Phase::Errored(error),
      (None, Some(_)) => Phase::Ready,
      (None, None) => Phase::Resolving,
    }
  }

  /// Replace a check item in whichever loaded checklist holds it.
  /// Returns false when no loaded checklist contains the item.
  pub fn patch_check_item(&mut self, item: &CheckItem) -> bool {
    let Some(checklists) = self.checklists.value.as_mut() else {
      return false;
    };
    checklists
      .iter_mut()
      .flat_map(|checklist| checklist.check_items.iter_mut())
      .find(|existing| existing.id == item.id)
      .map(|existing| *existing = item.clone())
      .is_some()
  }

  pub fn snapshot(&self) -> ViewSnapshot {
    ViewSnapshot {
      connected_id: self.connected_id.clone(),
      phase: self.phase(),
      card: self.card.value.clone(),
      actions: self.actions.value.clone(),
      list: self.list.value.clone(),
      checklists: self.checklists.value.clone(),
      error: self.worst_error(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::trello::types::CheckItemState;

  fn check_item(id: &str, state: CheckItemState) -> CheckItem {
    CheckItem {
      id: id.to_string(),
      name: id.to_string(),
      state,
      id_checklist: "k1".to_string(),
      pos: 0.0,
    }
  }

  fn linked() -> ViewState {
    ViewState::connected(Some("n1".to_string()), Some(CardLink::new("b1", "c1")))
  }

  #[test]
  fn test_phase_follows_slots() {
    assert_eq!(ViewState::default().phase(), Phase::Idle);
    assert_eq!(ViewState::connected(Some("n1".to_string()), None).phase(), Phase::Idle);

    let mut state = linked();
    assert_eq!(state.phase(), Phase::Resolving);

    state.list.fill(Err(PluginError::RateLimit));
    state.actions.fill(Err(PluginError::Unauthorized));
    assert_eq!(state.phase(), Phase::Errored(PluginError::Unauthorized));
  }

  #[test]
  fn test_slot_fill_replaces_value_and_error() {
    let mut slot = Slot::default();
    slot.fill(Ok(1));
    assert_eq!(slot.value, Some(1));

    slot.fill(Err(PluginError::Unknown));
    assert_eq!(slot.value, None);
    assert_eq!(slot.error, Some(PluginError::Unknown));

    slot.fill(Ok(2));
    assert_eq!(slot.error, None);
  }

  #[test]
  fn test_patch_check_item() {
    let mut state = linked();
    assert!(!state.patch_check_item(&check_item("i1", CheckItemState::Complete)));

    state.checklists.fill(Ok(vec![Checklist {
      id: "k1".to_string(),
      name: "Steps".to_string(),
      id_card: "c1".to_string(),
      id_board: "b1".to_string(),
      pos: 0.0,
      check_items: vec![check_item("i1", CheckItemState::Incomplete)],
    }]));

    assert!(state.patch_check_item(&check_item("i1", CheckItemState::Complete)));
    let checklists = state.checklists.value.unwrap();
    assert_eq!(checklists[0].check_items[0].state, CheckItemState::Complete);
  }
}
