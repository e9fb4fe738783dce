use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheTtl;
use crate::trello::types::CardPosition;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub trello: TrelloConfig,
  /// Boards offered when connecting a card (empty = every board)
  #[serde(default)]
  pub selected_boards: Vec<String>,
  #[serde(default)]
  pub new_card_position: CardPosition,
  #[serde(default)]
  pub moved_card_position: CardPosition,
  #[serde(default)]
  pub verbose_logging: bool,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub panel: PanelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrelloConfig {
  pub api_key: String,
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_base_url() -> String {
  "https://api.trello.com".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

/// Cache windows in seconds. Missing entries keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  pub card: Option<u64>,
  pub list: Option<u64>,
  pub label: Option<u64>,
  pub actions: Option<u64>,
  pub checklist: Option<u64>,
}

impl CacheConfig {
  pub fn ttl(&self) -> CacheTtl {
    let defaults = CacheTtl::default();
    let pick = |secs: Option<u64>, default: Duration| secs.map_or(default, Duration::from_secs);
    CacheTtl {
      card: pick(self.card, defaults.card),
      list: pick(self.list, defaults.list),
      label: pick(self.label, defaults.label),
      actions: pick(self.actions, defaults.actions),
      checklist: pick(self.checklist, defaults.checklist),
    }
  }
}

/// Which sections the panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
  pub list: bool,
  pub title: bool,
  pub description: bool,
  pub due: bool,
  pub labels: bool,
  pub comments: bool,
  pub checklists: bool,
}

impl Default for PanelConfig {
  fn default() -> Self {
    Self {
      list: true,
      title: true,
      description: true,
      due: true,
      labels: true,
      comments: true,
      checklists: true,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./trello-pane.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/trello-pane/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/trello-pane/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("trello-pane.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("trello-pane").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.trello.api_key.trim().is_empty() {
      return Err(eyre!("trello.api_key must not be empty"));
    }
    Ok(config)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.trello.timeout_secs)
  }

  /// Get the Trello API token from environment variables.
  ///
  /// Checks TRELLO_PANE_TOKEN first, then TRELLO_TOKEN as fallback. A
  /// missing token is not an error here; requests fail with `NoToken`.
  pub fn get_api_token() -> String {
    std::env::var("TRELLO_PANE_TOKEN")
      .or_else(|_| std::env::var("TRELLO_TOKEN"))
      .unwrap_or_default()
  }
}
