//! Side table from connected ids to Trello cards.
//!
//! A note stores only an opaque connected id. The board and card it points
//! at live here, so the link survives the card being re-created or moved
//! to another board.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Where a connected id points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLink {
  pub board_id: String,
  pub card_id: String,
}

impl CardLink {
  pub fn new(board_id: impl Into<String>, card_id: impl Into<String>) -> Self {
    Self {
      board_id: board_id.into(),
      card_id: card_id.into(),
    }
  }

  /// Parse the older `boardId;cardId` form notes used to store directly.
  fn from_legacy(value: &str) -> Option<Self> {
    let (board_id, card_id) = value.split_once(';')?;
    if board_id.is_empty() || card_id.is_empty() || card_id.contains(';') {
      return None;
    }
    Some(Self::new(board_id, card_id))
  }
}

/// Shared handle to the connected-card table. Clones see the same table.
#[derive(Debug, Clone, Default)]
pub struct ConnectedCards {
  path: Option<PathBuf>,
  links: Arc<RwLock<BTreeMap<String, CardLink>>>,
}

impl ConnectedCards {
  /// A table that is never written to disk.
  pub fn in_memory() -> Self {
    Self::default()
  }

  /// `$XDG_DATA_HOME/trello-pane/connected_cards.json`
  pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("trello-pane").join("connected_cards.json"))
  }

  /// Load the table from `path`. A missing file is an empty table.
  pub fn load(path: &Path) -> Result<Self> {
    let links: BTreeMap<String, CardLink> = if path.exists() {
      let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
      serde_json::from_str(&contents)
        .map_err(|e| eyre!("Failed to parse {}: {}", path.display(), e))?
    } else {
      BTreeMap::new()
    };

    Ok(Self {
      path: Some(path.to_path_buf()),
      links: Arc::new(RwLock::new(links)),
    })
  }

  /// Write the table back to the file it was loaded from.
  pub fn save(&self) -> Result<()> {
    let Some(path) = &self.path else {
      return Ok(());
    };

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create {}: {}", parent.display(), e))?;
    }

    let contents = {
      let links = self.links.read().unwrap_or_else(PoisonError::into_inner);
      serde_json::to_string_pretty(&*links)?
    };
    std::fs::write(path, contents).map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))
  }

  /// Record a link under a fresh connected id and return the id.
  pub fn connect(&self, link: CardLink) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    debug!(id = %id, card_id = %link.card_id, "connecting card");
    self
      .links
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(id.clone(), link);
    id
  }

  pub fn disconnect(&self, id: &str) -> Option<CardLink> {
    self
      .links
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(id)
  }

  /// Look up where `id` points, accepting the legacy `boardId;cardId` form
  /// for ids that are not in the table.
  pub fn resolve(&self, id: &str) -> Option<CardLink> {
    let known = self
      .links
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(id)
      .cloned();
    known.or_else(|| CardLink::from_legacy(id))
  }

  /// All links, ordered by connected id.
  pub fn entries(&self) -> Vec<(String, CardLink)> {
    self
      .links
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .iter()
      .map(|(id, link)| (id.clone(), link.clone()))
      .collect()
  }
}
