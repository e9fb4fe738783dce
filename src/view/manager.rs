//! The view manager: keeps the panel's card and its dependents in sync with
//! the connected id.
//!
//! One task owns all view state. It reacts to three sources: the connected
//! id, commands from [`ViewHandle`]s, and completions of its own in-flight
//! fetches. Every fetch carries a [`Ticket`] for its slot, so a completion
//! that was superseded while in flight is dropped, and the cache layer
//! refuses to store it.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::state::{ViewSnapshot, ViewState};
use crate::cache::{CacheType, FetchOptions, Lane, Ticket};
use crate::error::{PluginError, PluginResult};
use crate::links::{CardLink, ConnectedCards};
use crate::trello::types::{Action, Card, CardPosition, CheckItem, CheckItemState, Checklist, List};
use crate::trello::{CachedTrelloClient, Transport};

type Reply<T> = oneshot::Sender<PluginResult<T>>;

enum Command {
  Refresh(Reply<Card>),
  MoveCard {
    list_id: String,
    position: CardPosition,
    reply: Reply<Card>,
  },
  SetCheckItem {
    item_id: String,
    state: CheckItemState,
    reply: Reply<CheckItem>,
  },
  AddComment {
    text: String,
    reply: Reply<Action>,
  },
}

enum Completion {
  Card {
    ticket: Ticket,
    result: PluginResult<Card>,
  },
  Actions {
    ticket: Ticket,
    result: PluginResult<Vec<Action>>,
  },
  List {
    ticket: Ticket,
    result: PluginResult<List>,
  },
  Checklists {
    ticket: Ticket,
    result: PluginResult<Vec<Checklist>>,
  },
  Moved {
    card_id: String,
    result: PluginResult<Card>,
    reply: Reply<Card>,
  },
  CheckItem {
    card_id: String,
    result: PluginResult<CheckItem>,
    reply: Reply<CheckItem>,
  },
  Commented {
    card_id: String,
    result: PluginResult<Action>,
    reply: Reply<Action>,
  },
}

/// One lane per slot that can have a fetch in flight.
#[derive(Default)]
struct Lanes {
  card: Lane,
  actions: Lane,
  list: Lane,
  checklists: Lane,
}

impl Lanes {
  fn supersede_dependents(&self) {
    self.actions.supersede();
    self.list.supersede();
    self.checklists.supersede();
  }
}

/// The keys dependents were last fetched for. A dependent is fetched again
/// only when its key moves, unless a refresh asks for everything.
#[derive(Default)]
struct DependentKeys {
  actions: Option<String>,
  list: Option<String>,
  checklists: Option<(String, Vec<String>)>,
}

/// Handle for reading snapshots and sending actions to a running manager.
#[derive(Clone)]
pub struct ViewHandle {
  commands: mpsc::Sender<Command>,
  snapshots: watch::Receiver<ViewSnapshot>,
}

impl ViewHandle {
  /// The latest published snapshot.
  pub fn snapshot(&self) -> ViewSnapshot {
    self.snapshots.borrow().clone()
  }

  pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
    self.snapshots.clone()
  }

  async fn request<R>(&self, command: impl FnOnce(Reply<R>) -> Command) -> PluginResult<R> {
    let (reply, answer) = oneshot::channel();
    self
      .commands
      .send(command(reply))
      .await
      .map_err(|_| PluginError::Abort)?;
    answer.await.unwrap_or(Err(PluginError::Abort))
  }

  /// Re-fetch the card and all its dependents, skipping every cache.
  ///
  /// Resolves once the card arrives. `Abort` when no card is shown or a
  /// newer request replaced this one.
  pub async fn refresh(&self) -> PluginResult<Card> {
    self.request(Command::Refresh).await
  }

  pub async fn move_card(
    &self,
    list_id: impl Into<String>,
    position: CardPosition,
  ) -> PluginResult<Card> {
    let list_id = list_id.into();
    self
      .request(|reply| Command::MoveCard {
        list_id,
        position,
        reply,
      })
      .await
  }

  pub async fn set_check_item_state(
    &self,
    item_id: impl Into<String>,
    state: CheckItemState,
  ) -> PluginResult<CheckItem> {
    let item_id = item_id.into();
    self
      .request(|reply| Command::SetCheckItem {
        item_id,
        state,
        reply,
      })
      .await
  }

  pub async fn add_comment(&self, text: impl Into<String>) -> PluginResult<Action> {
    let text = text.into();
    self
      .request(|reply| Command::AddComment { text, reply })
      .await
  }
}

/// Owns the view state. Run with [`ViewManager::spawn`].
pub struct ViewManager<T> {
  client: CachedTrelloClient<T>,
  links: ConnectedCards,
  state: ViewState,
  lanes: Lanes,
  keys: DependentKeys,
  /// Set by a refresh; consumed by the next card it delivers.
  bypass_dependents: bool,
  pending_refresh: Option<Reply<Card>>,
  in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
  snapshots: watch::Sender<ViewSnapshot>,
}

impl<T: Transport> ViewManager<T> {
  /// Start a manager that follows `connected`.
  ///
  /// The task ends when the connected id sender or every handle is dropped.
  pub fn spawn(
    client: CachedTrelloClient<T>,
    links: ConnectedCards,
    connected: watch::Receiver<Option<String>>,
  ) -> (ViewHandle, JoinHandle<()>) {
    let (snapshots, snapshot_rx) = watch::channel(ViewSnapshot::default());
    let (commands_tx, commands_rx) = mpsc::channel(16);

    let manager = Self {
      client,
      links,
      state: ViewState::default(),
      lanes: Lanes::default(),
      keys: DependentKeys::default(),
      bypass_dependents: false,
      pending_refresh: None,
      in_flight: FuturesUnordered::new(),
      snapshots,
    };
    let task = tokio::spawn(manager.run(connected, commands_rx));

    let handle = ViewHandle {
      commands: commands_tx,
      snapshots: snapshot_rx,
    };
    (handle, task)
  }

  async fn run(
    mut self,
    mut connected: watch::Receiver<Option<String>>,
    mut commands: mpsc::Receiver<Command>,
  ) {
    let initial = connected.borrow_and_update().clone();
    self.set_connected(initial);

    loop {
      tokio::select! {
        changed = connected.changed() => {
          if changed.is_err() {
            break;
          }
          let id = connected.borrow_and_update().clone();
          self.set_connected(id);
        }
        command = commands.recv() => match command {
          Some(command) => self.handle_command(command),
          None => break,
        },
        Some(completion) = self.in_flight.next(), if !self.in_flight.is_empty() => {
          self.complete(completion);
        }
      }
    }
    debug!("view manager stopped");
  }

  fn publish(&self) {
    let next = self.state.snapshot();
    self.snapshots.send_if_modified(|current| {
      if *current == next {
        false
      } else {
        *current = next;
        true
      }
    });
  }

  fn spawn_fetch(&self, fetch: impl std::future::Future<Output = Completion> + Send + 'static) {
    self.in_flight.push(Box::pin(fetch));
  }

  fn abort_pending_refresh(&mut self) {
    if let Some(reply) = self.pending_refresh.take() {
      let _ = reply.send(Err(PluginError::Abort));
    }
  }

  fn is_current(&self, card_id: &str) -> bool {
    self.state.current_card_id() == Some(card_id)
  }

  fn set_connected(&mut self, id: Option<String>) {
    let errored = self.state.worst_error().is_some();
    if id == self.state.connected_id && !errored {
      trace!("connected id unchanged");
      return;
    }
    debug!(connected_id = ?id, "connected id changed");

    // Last id wins: nothing started for the previous id may land
    self.lanes.card.supersede();
    self.lanes.supersede_dependents();
    self.keys = DependentKeys::default();
    self.bypass_dependents = false;
    self.abort_pending_refresh();

    let link = id.as_deref().and_then(|id| {
      let link = self.links.resolve(id);
      if link.is_none() {
        warn!(connected_id = id, "connected id does not point at a card");
      }
      link
    });
    self.state = ViewState::connected(id, link.clone());

    if let Some(link) = link {
      self.fetch_card(link, false);
    }
    self.publish();
  }

  fn fetch_card(&mut self, link: CardLink, bypass: bool) {
    let ticket = self.lanes.card.issue();
    let opts = FetchOptions::cached()
      .with_bypass(bypass)
      .with_ticket(ticket.clone());
    let client = self.client.clone();

    self.spawn_fetch(async move {
      let result = client
        .get_card(&link.board_id, &link.card_id, &opts)
        .await;
      Completion::Card { ticket, result }
    });
  }

  /// Publish a new card, resetting dependents first if it is a different
  /// card, then fetch whichever dependents are out of date.
  fn apply_card(&mut self, card: Card) {
    let bypass = std::mem::take(&mut self.bypass_dependents);

    if !self.is_current(&card.id) {
      debug!(card_id = %card.id, "card changed, resetting dependents");
      self.lanes.supersede_dependents();
      self.keys = DependentKeys::default();
      self.state.reset_dependents();
    }
    self.state.card.fill(Ok(card.clone()));
    self.fetch_dependents(&card, bypass);
  }

  fn fetch_dependents(&mut self, card: &Card, bypass: bool) {
    if bypass || self.keys.actions.as_deref() != Some(card.id.as_str()) {
      self.keys.actions = Some(card.id.clone());
      self.fetch_actions(card.id.clone(), bypass);
    }

    if bypass || self.keys.list.as_deref() != Some(card.id_list.as_str()) {
      if self.keys.list.as_deref() != Some(card.id_list.as_str()) {
        // Never show the old list against the moved card
        self.state.list.reset();
      }
      self.keys.list = Some(card.id_list.clone());
      self.fetch_list(card.id_list.clone(), bypass);
    }

    let checklists_key = (card.id.clone(), card.id_checklists.clone());
    if bypass || self.keys.checklists.as_ref() != Some(&checklists_key) {
      self.keys.checklists = Some(checklists_key);
      self.fetch_checklists(card.id.clone(), card.id_checklists.clone(), bypass);
    }
  }

  fn fetch_actions(&mut self, card_id: String, bypass: bool) {
    let ticket = self.lanes.actions.issue();
    let opts = FetchOptions::cached()
      .with_bypass(bypass)
      .with_ticket(ticket.clone());
    let client = self.client.clone();

    self.spawn_fetch(async move {
      let result = client.get_actions(&card_id, &opts).await;
      Completion::Actions { ticket, result }
    });
  }

  fn fetch_list(&mut self, list_id: String, bypass: bool) {
    let ticket = self.lanes.list.issue();
    if list_id.is_empty() {
      self.state.list.reset();
      return;
    }
    let opts = FetchOptions::cached()
      .with_bypass(bypass)
      .with_ticket(ticket.clone());
    let client = self.client.clone();

    self.spawn_fetch(async move {
      let result = client.get_list(&list_id, &opts).await;
      Completion::List { ticket, result }
    });
  }

  fn fetch_checklists(&mut self, card_id: String, checklist_ids: Vec<String>, bypass: bool) {
    let ticket = self.lanes.checklists.issue();
    if checklist_ids.is_empty() {
      self.state.checklists.fill(Ok(Vec::new()));
      return;
    }
    let opts = FetchOptions::cached()
      .with_bypass(bypass)
      .with_ticket(ticket.clone());
    let client = self.client.clone();

    self.spawn_fetch(async move {
      let result = client
        .get_checklists(&card_id, &checklist_ids, &opts)
        .await;
      Completion::Checklists { ticket, result }
    });
  }

  /// Fetch the card again after it failed to load. Resolves `reply` once
  /// the new answer arrives.
  fn retry_card(&mut self, reply: Reply<Card>) {
    let Some(link) = self.state.link.clone() else {
      let _ = reply.send(Err(PluginError::Abort));
      return;
    };
    debug!(card_id = %link.card_id, "retrying failed card");
    self.abort_pending_refresh();
    self.state.card.reset();
    self.bypass_dependents = true;
    self.pending_refresh = Some(reply);
    self.fetch_card(link, true);
    self.publish();
  }

  fn handle_command(&mut self, command: Command) {
    let command = match command {
      Command::Refresh(reply) if self.state.card.error.is_some() => {
        self.retry_card(reply);
        return;
      }
      command => command,
    };

    let Some(card_id) = self.state.current_card_id().map(str::to_string) else {
      trace!("no card shown, aborting command");
      abort(command);
      return;
    };

    match command {
      Command::Refresh(reply) => {
        let Some(card) = self.state.card.value.as_ref() else {
          let _ = reply.send(Err(PluginError::Abort));
          return;
        };
        debug!(card_id = %card.id, "refreshing");
        let link = CardLink::new(card.id_board.clone(), card.id.clone());
        self.abort_pending_refresh();
        self.bypass_dependents = true;
        self.pending_refresh = Some(reply);
        self.fetch_card(link, true);
      }
      Command::MoveCard {
        list_id,
        position,
        reply,
      } => {
        let client = self.client.clone();
        self.spawn_fetch(async move {
          let result = client.move_card(&card_id, &list_id, position).await;
          Completion::Moved {
            card_id,
            result,
            reply,
          }
        });
      }
      Command::SetCheckItem {
        item_id,
        state,
        reply,
      } => {
        let client = self.client.clone();
        self.spawn_fetch(async move {
          let result = client
            .set_check_item_state(&card_id, &item_id, state)
            .await;
          Completion::CheckItem {
            card_id,
            result,
            reply,
          }
        });
      }
      Command::AddComment { text, reply } => {
        if text.trim().is_empty() {
          let _ = reply.send(Err(PluginError::Abort));
          return;
        }
        let client = self.client.clone();
        self.spawn_fetch(async move {
          let result = client.add_comment(&card_id, &text).await;
          Completion::Commented {
            card_id,
            result,
            reply,
          }
        });
      }
    }
  }

  fn complete(&mut self, completion: Completion) {
    match completion {
      Completion::Card { ticket, result } => {
        if !ticket.is_current() {
          trace!("dropping superseded card result");
          return;
        }
        match &result {
          Ok(card) => self.apply_card(card.clone()),
          Err(error) => {
            debug!(error = %error, "card fetch failed");
            self.lanes.supersede_dependents();
            self.keys = DependentKeys::default();
            self.bypass_dependents = false;
            self.state.reset_dependents();
            self.state.card.fill(Err(*error));
          }
        }
        if let Some(reply) = self.pending_refresh.take() {
          let _ = reply.send(result);
        }
      }
      Completion::Actions { ticket, result } => {
        if !ticket.is_current() {
          trace!("dropping superseded actions result");
          return;
        }
        self.state.actions.fill(result);
      }
      Completion::List { ticket, result } => {
        if !ticket.is_current() {
          trace!("dropping superseded list result");
          return;
        }
        self.state.list.fill(result);
      }
      Completion::Checklists { ticket, result } => {
        if !ticket.is_current() {
          trace!("dropping superseded checklists result");
          return;
        }
        self.state.checklists.fill(result);
      }
      Completion::Moved {
        card_id,
        result,
        reply,
      } => {
        if let Ok(card) = &result {
          self.client.cache().set(&card.id, card.clone());
          if self.is_current(&card_id) {
            debug!(card_id = %card.id, list_id = %card.id_list, "card moved");
            // The moved card is newer than anything already in flight
            self.lanes.card.supersede();
            self.bypass_dependents = false;
            self.abort_pending_refresh();
            self.apply_card(card.clone());
          } else {
            trace!(card_id = %card_id, "card no longer shown, not applying move");
          }
        }
        let _ = reply.send(result);
      }
      Completion::CheckItem {
        card_id,
        result,
        reply,
      } => {
        if let Ok(item) = &result {
          if !item.id_checklist.is_empty() {
            self
              .client
              .cache()
              .invalidate(CacheType::Checklist, &item.id_checklist);
          }
          if self.is_current(&card_id) && !self.state.patch_check_item(item) {
            trace!(item_id = %item.id, "check item not among loaded checklists");
          }
        }
        let _ = reply.send(result);
      }
      Completion::Commented {
        card_id,
        result,
        reply,
      } => {
        if result.is_ok() {
          self.client.cache().invalidate(CacheType::Actions, &card_id);
          if self.is_current(&card_id) {
            self.fetch_actions(card_id, true);
          }
        }
        let _ = reply.send(result);
      }
    }
    self.publish();
  }
}

fn abort(command: Command) {
  let aborted = match command {
    Command::Refresh(reply) | Command::MoveCard { reply, .. } => {
      reply.send(Err(PluginError::Abort)).is_ok()
    }
    Command::SetCheckItem { reply, .. } => reply.send(Err(PluginError::Abort)).is_ok(),
    Command::AddComment { reply, .. } => reply.send(Err(PluginError::Abort)).is_ok(),
  };
  if !aborted {
    trace!("caller went away before the command was aborted");
  }
}
