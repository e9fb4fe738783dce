//! Cached Trello client that wraps TrelloClient with transparent caching.

use crate::cache::{CacheLayer, FetchOptions};
use crate::error::PluginResult;

use super::client::TrelloClient;
use super::transport::Transport;
use super::types::{
  Action, ActionType, Board, Card, CardPosition, CheckItem, CheckItemState, Checklist, Label,
  List, NewCardRequest,
};

/// Trello client with transparent caching support.
///
/// This wraps the underlying TrelloClient and provides the same API, but
/// reads go through the cache unless the options ask to bypass it.
/// Mutations always go to the network and leave the cache alone.
pub struct CachedTrelloClient<T> {
  inner: TrelloClient<T>,
  cache: CacheLayer,
}

impl<T> Clone for CachedTrelloClient<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      cache: self.cache.clone(),
    }
  }
}

impl<T: Transport> CachedTrelloClient<T> {
  pub fn new(inner: TrelloClient<T>, cache: CacheLayer) -> Self {
    Self { inner, cache }
  }

  /// The cache shared with every clone of this client.
  pub fn cache(&self) -> &CacheLayer {
    &self.cache
  }

  /// Get all boards of the current member (not cached).
  pub async fn get_boards(&self) -> PluginResult<Vec<Board>> {
    self.inner.get_boards().await
  }

  /// Get a single card with caching.
  pub async fn get_card(
    &self,
    board_id: &str,
    card_id: &str,
    opts: &FetchOptions,
  ) -> PluginResult<Card> {
    let result = self
      .cache
      .fetch_one(card_id, opts, || self.inner.get_card(board_id, card_id))
      .await?;

    Ok(result.data)
  }

  /// Get every card on a board. Always hits the network; each card is
  /// cached under its own id.
  pub async fn get_cards(&self, board_id: &str, opts: &FetchOptions) -> PluginResult<Vec<Card>> {
    self
      .cache
      .fetch_each(opts, || self.inner.get_cards(board_id))
      .await
  }

  /// Get the labels of a board, cached by board id.
  pub async fn get_labels(&self, board_id: &str, opts: &FetchOptions) -> PluginResult<Vec<Label>> {
    let result = self
      .cache
      .fetch_one(board_id, opts, || self.inner.get_labels(board_id))
      .await?;

    Ok(result.data)
  }

  /// Get the lists of a board. Each list is cached under its own id.
  pub async fn get_lists(&self, board_id: &str, opts: &FetchOptions) -> PluginResult<Vec<List>> {
    self
      .cache
      .fetch_each(opts, || self.inner.get_lists(board_id))
      .await
  }

  pub async fn get_list(&self, list_id: &str, opts: &FetchOptions) -> PluginResult<List> {
    let result = self
      .cache
      .fetch_one(list_id, opts, || self.inner.get_list(list_id))
      .await?;

    Ok(result.data)
  }

  /// Get the comments on a card, cached by card id.
  pub async fn get_actions(&self, card_id: &str, opts: &FetchOptions) -> PluginResult<Vec<Action>> {
    let result = self
      .cache
      .fetch_one(card_id, opts, || {
        self.inner.get_actions(card_id, &[ActionType::Comment])
      })
      .await?;

    Ok(result.data)
  }

  /// Get the checklists of a card.
  ///
  /// Served from cache only when every id in `checklist_ids` is fresh;
  /// otherwise the whole collection is fetched again.
  pub async fn get_checklists(
    &self,
    card_id: &str,
    checklist_ids: &[String],
    opts: &FetchOptions,
  ) -> PluginResult<Vec<Checklist>> {
    let result = self
      .cache
      .fetch_all(checklist_ids, opts, || self.inner.get_checklists(card_id))
      .await?;

    Ok(result.data)
  }

  pub async fn get_checklist(
    &self,
    checklist_id: &str,
    opts: &FetchOptions,
  ) -> PluginResult<Checklist> {
    let result = self
      .cache
      .fetch_one(checklist_id, opts, || self.inner.get_checklist(checklist_id))
      .await?;

    Ok(result.data)
  }

  /// Add a comment (not cached - write operation).
  pub async fn add_comment(&self, card_id: &str, text: &str) -> PluginResult<Action> {
    self.inner.add_comment(card_id, text).await
  }

  /// Create a card (not cached - write operation).
  pub async fn create_card(&self, request: &NewCardRequest) -> PluginResult<Card> {
    self.inner.create_card(request).await
  }

  /// Move a card (not cached - write operation).
  pub async fn move_card(
    &self,
    card_id: &str,
    list_id: &str,
    position: CardPosition,
  ) -> PluginResult<Card> {
    self.inner.move_card(card_id, list_id, position).await
  }

  /// Set a check item's state (not cached - write operation).
  pub async fn set_check_item_state(
    &self,
    card_id: &str,
    check_item_id: &str,
    state: CheckItemState,
  ) -> PluginResult<CheckItem> {
    self
      .inner
      .set_check_item_state(card_id, check_item_id, state)
      .await
  }
}
