//! Trello DTOs. These mirror the REST responses closely and are passed to
//! the panel unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Board summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub url: String,
}

/// A list (column) on a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub closed: bool,
  #[serde(default)]
  pub pos: f64,
  #[serde(default)]
  pub id_board: String,
  #[serde(default)]
  pub subscribed: bool,
}

/// A colored label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
  pub id: String,
  #[serde(default)]
  pub id_board: String,
  #[serde(default)]
  pub name: String,
  pub color: Option<String>,
}

/// Full card details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
  pub id: String,
  #[serde(default)]
  pub id_board: String,
  #[serde(default)]
  pub id_list: String,
  pub name: String,
  #[serde(default)]
  pub desc: String,
  #[serde(default)]
  pub url: String,
  pub due: Option<DateTime<Utc>>,
  #[serde(default)]
  pub due_complete: bool,
  #[serde(default)]
  pub labels: Vec<Label>,
  #[serde(default)]
  pub id_labels: Vec<String>,
  #[serde(default)]
  pub id_checklists: Vec<String>,
  // Fields we don't model are kept so the card round-trips intact
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckItemState {
  Complete,
  Incomplete,
}

impl CheckItemState {
  pub fn as_str(&self) -> &'static str {
    match self {
      CheckItemState::Complete => "complete",
      CheckItemState::Incomplete => "incomplete",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckItem {
  pub id: String,
  pub name: String,
  pub state: CheckItemState,
  #[serde(default)]
  pub id_checklist: String,
  #[serde(default)]
  pub pos: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub id_card: String,
  #[serde(default)]
  pub id_board: String,
  #[serde(default)]
  pub pos: f64,
  #[serde(default)]
  pub check_items: Vec<CheckItem>,
}

/// Completion of a checklist: done, total and a rounded percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
  pub complete: usize,
  pub total: usize,
  pub percent: u8,
}

impl Checklist {
  pub fn progress(&self) -> Progress {
    let total = self.check_items.len();
    let complete = self
      .check_items
      .iter()
      .filter(|i| i.state == CheckItemState::Complete)
      .count();
    let percent = if total > 0 {
      ((complete as f64 / total as f64) * 100.0).round() as u8
    } else {
      0
    };
    Progress {
      complete,
      total,
      percent,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
  pub id: String,
  #[serde(default)]
  pub full_name: String,
  #[serde(default)]
  pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
  pub text: Option<String>,
}

/// A card action. Only comments are requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
  pub id: String,
  #[serde(default)]
  pub id_member_creator: String,
  #[serde(default)]
  pub data: ActionData,
  #[serde(rename = "type")]
  pub action_type: String,
  pub date: DateTime<Utc>,
  pub member_creator: Option<Member>,
}

/// Action filter values understood by the actions endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
  Comment,
}

impl ActionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ActionType::Comment => "commentCard",
    }
  }
}

/// Where a created or moved card lands in its list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardPosition {
  #[default]
  Top,
  Bottom,
}

impl CardPosition {
  pub fn as_str(&self) -> &'static str {
    match self {
      CardPosition::Top => "top",
      CardPosition::Bottom => "bottom",
    }
  }
}

/// Body of a create-card request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCardRequest {
  pub id_list: String,
  pub name: String,
  pub desc: Option<String>,
  pub pos: CardPosition,
  pub id_labels: Vec<String>,
}
