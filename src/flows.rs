//! Interactive flows: connecting a card, creating one, choosing a list.
//!
//! Every step that asks the user can be cancelled; a cancelled step ends
//! the flow with [`PluginError::Abort`].

use std::future::Future;
use tracing::{debug, warn};

use crate::cache::FetchOptions;
use crate::config::Config;
use crate::error::{PluginError, PluginResult};
use crate::trello::types::{Board, Card, CardPosition, Label, List, NewCardRequest};
use crate::trello::{CachedTrelloClient, Transport};

/// Label of the extra option that starts card creation.
pub const NEW_CARD_OPTION: &str = "Create a new card...";

/// Something that can ask the user questions. `None` means cancelled.
pub trait Prompt {
  /// Pick one of `options` by index.
  fn choose(&mut self, title: &str, options: &[String]) -> impl Future<Output = Option<usize>>;

  /// Pick any number of `options`, possibly none.
  fn choose_many(
    &mut self,
    title: &str,
    options: &[String],
  ) -> impl Future<Output = Option<Vec<usize>>>;

  /// Free text. An empty answer is not a cancellation.
  fn text(&mut self, title: &str) -> impl Future<Output = Option<String>>;
}

fn cancelled<T>(step: &str) -> PluginResult<T> {
  debug!(step, "flow cancelled");
  Err(PluginError::Abort)
}

async fn pick<'a, P: Prompt, T>(
  prompt: &mut P,
  title: &str,
  items: &'a [T],
  label: impl Fn(&T) -> String,
) -> PluginResult<&'a T> {
  let options: Vec<String> = items.iter().map(label).collect();
  match prompt.choose(title, &options).await {
    Some(index) => items.get(index).map_or_else(|| cancelled(title), Ok),
    None => cancelled(title),
  }
}

fn label_name(label: &Label) -> String {
  match (label.name.as_str(), label.color.as_deref()) {
    ("", Some(color)) => color.to_string(),
    ("", None) => "(no name)".to_string(),
    (name, _) => name.to_string(),
  }
}

/// Boards offered for connecting: the configured ones, or all of them.
async fn offered_boards<T: Transport>(
  client: &CachedTrelloClient<T>,
  config: &Config,
) -> PluginResult<Vec<Board>> {
  let boards = client.get_boards().await?;
  if config.selected_boards.is_empty() {
    return Ok(boards);
  }
  Ok(
    boards
      .into_iter()
      .filter(|b| config.selected_boards.contains(&b.id))
      .collect(),
  )
}

/// Ask for a board, then a card on it or a new card.
///
/// Returns the card to link. The caller records the link.
pub async fn connect_card<T: Transport, P: Prompt>(
  client: &CachedTrelloClient<T>,
  config: &Config,
  prompt: &mut P,
) -> PluginResult<Card> {
  let boards = offered_boards(client, config).await?;
  if boards.is_empty() {
    warn!("no boards to choose from");
    return cancelled("board");
  }
  let board = pick(prompt, "Choose a board", &boards, |b| b.name.clone()).await?;

  let cards = client.get_cards(&board.id, &FetchOptions::cached()).await?;
  let mut options = vec![NEW_CARD_OPTION.to_string()];
  options.extend(cards.iter().map(|c| c.name.clone()));

  match prompt.choose("Choose a card", &options).await {
    Some(0) => create_card(client, &board.id, config.new_card_position, prompt).await,
    Some(index) => match cards.get(index - 1) {
      Some(card) => Ok(card.clone()),
      None => cancelled("card"),
    },
    None => cancelled("card"),
  }
}

/// Ask for a list, labels, title and description, then create the card.
pub async fn create_card<T: Transport, P: Prompt>(
  client: &CachedTrelloClient<T>,
  board_id: &str,
  position: CardPosition,
  prompt: &mut P,
) -> PluginResult<Card> {
  let lists = open_lists(client, board_id, None).await?;
  let list = pick(prompt, "Choose a list", &lists, |l| l.name.clone()).await?;

  let labels = client.get_labels(board_id, &FetchOptions::cached()).await?;
  let mut id_labels = Vec::new();
  if !labels.is_empty() {
    let options: Vec<String> = labels.iter().map(label_name).collect();
    let Some(chosen) = prompt.choose_many("Choose labels", &options).await else {
      return cancelled("labels");
    };
    id_labels = chosen
      .into_iter()
      .filter_map(|i| labels.get(i).map(|l| l.id.clone()))
      .collect();
  }

  let name = match prompt.text("Enter a title for this card").await {
    Some(name) if !name.trim().is_empty() => name.trim().to_string(),
    _ => return cancelled("title"),
  };
  let Some(desc) = prompt.text("Add a more detailed description").await else {
    return cancelled("description");
  };

  let request = NewCardRequest {
    id_list: list.id.clone(),
    name,
    desc: Some(desc).filter(|d| !d.trim().is_empty()),
    pos: position,
    id_labels,
  };
  client.create_card(&request).await
}

async fn open_lists<T: Transport>(
  client: &CachedTrelloClient<T>,
  board_id: &str,
  exclude: Option<&str>,
) -> PluginResult<Vec<List>> {
  let mut lists = client.get_lists(board_id, &FetchOptions::cached()).await?;
  lists.retain(|l| !l.closed && Some(l.id.as_str()) != exclude);
  lists.sort_by(|a, b| a.pos.total_cmp(&b.pos));
  Ok(lists)
}

/// Ask for the list to move `card` to. Its current list is not offered.
pub async fn choose_list<T: Transport, P: Prompt>(
  client: &CachedTrelloClient<T>,
  card: &Card,
  prompt: &mut P,
) -> PluginResult<List> {
  let lists = open_lists(client, &card.id_board, Some(&card.id_list)).await?;
  let list = pick(prompt, "Move card to", &lists, |l| l.name.clone()).await?;
  Ok(list.clone())
}
