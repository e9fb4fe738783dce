use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use trello_pane::cache::{CacheLayer, CacheStore};
use trello_pane::config::Config;
use trello_pane::error::{PluginError, PluginResult};
use trello_pane::event::{Event, EventHandler};
use trello_pane::flows;
use trello_pane::links::{CardLink, ConnectedCards};
use trello_pane::render::render;
use trello_pane::trello::types::CheckItemState;
use trello_pane::trello::{CachedTrelloClient, ReqwestTransport, TrelloClient};
use trello_pane::view::{ViewManager, ViewSnapshot};

type Client = CachedTrelloClient<ReqwestTransport>;

#[derive(Parser, Debug)]
#[command(name = "trello-pane")]
#[command(about = "Mirror a connected Trello card into a side panel")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/trello-pane/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Path to the connected cards file
  /// (default: $XDG_DATA_HOME/trello-pane/connected_cards.json)
  #[arg(long)]
  links: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show a connected card and keep it in sync. Reads commands from stdin.
  Watch {
    /// Connected id, or a legacy `boardId;cardId` pair
    id: String,
  },
  /// Choose a card (or create one) and print its new connected id
  Connect,
  /// Forget a connected id
  Disconnect { id: String },
  /// List connected ids
  Links,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = init_logging(config.verbose_logging)?;

  let links_path = match args.links {
    Some(path) => path,
    None => ConnectedCards::default_path()
      .ok_or_else(|| eyre!("No data directory available for the connected cards file"))?,
  };
  let links = ConnectedCards::load(&links_path)?;

  match args.command {
    Command::Watch { id } => watch_card(&config, build_client(&config)?, links, id).await,
    Command::Connect => connect(&config, &build_client(&config)?, &links).await,
    Command::Disconnect { id } => {
      links
        .disconnect(&id)
        .ok_or_else(|| eyre!("Unknown connected id: {}", id))?;
      links.save()?;
      info!(id = %id, "disconnected");
      Ok(())
    }
    Command::Links => {
      for (id, link) in links.entries() {
        println!("{}  {};{}", id, link.board_id, link.card_id);
      }
      Ok(())
    }
  }
}

/// Log to a file; stdout is the panel.
fn init_logging(verbose: bool) -> Result<WorkerGuard> {
  let dir = dirs::state_dir()
    .or_else(dirs::data_dir)
    .ok_or_else(|| eyre!("No directory available for the log file"))?
    .join("trello-pane");
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let (writer, guard) =
    tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, "trello-pane.log"));
  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

fn build_client(config: &Config) -> Result<Client> {
  let transport = ReqwestTransport::new(&config.trello.base_url, config.timeout())?;

  let token = Config::get_api_token();
  if token.is_empty() {
    warn!("no API token set; requests will fail until TRELLO_PANE_TOKEN is set");
  }
  let (_token_tx, token_rx) = watch::channel(token);

  let inner = TrelloClient::new(transport, config.trello.api_key.clone(), token_rx);
  let cache = CacheLayer::new(CacheStore::new(config.cache.ttl()));
  Ok(CachedTrelloClient::new(inner, cache))
}

/// Print the outcome of a panel action. Successes show up in the next
/// snapshot; an abort is silent.
fn report<T>(result: PluginResult<T>) {
  match result {
    Ok(_) | Err(PluginError::Abort) => {}
    Err(error) => println!("! {}", error.user_message()),
  }
}

fn print_snapshot(snapshot: &ViewSnapshot, config: &Config) {
  println!("\n----------------------------------------");
  print!("{}", render(snapshot, &config.panel));
}

async fn watch_card(config: &Config, client: Client, links: ConnectedCards, id: String) -> Result<()> {
  let (connected_tx, connected_rx) = watch::channel(Some(id));
  let (handle, task) = ViewManager::spawn(client.clone(), links, connected_rx);
  let mut snapshots = handle.subscribe();
  let mut events = EventHandler::new();

  print_snapshot(&snapshots.borrow_and_update().clone(), config);

  loop {
    tokio::select! {
      changed = snapshots.changed() => {
        if changed.is_err() {
          break;
        }
        let snapshot = snapshots.borrow_and_update().clone();
        print_snapshot(&snapshot, config);
      }
      event = events.next() => {
        let Some(event) = event else {
          break;
        };
        match event {
          Event::Quit => break,
          Event::Refresh => report(handle.refresh().await),
          Event::Move => {
            let Some(card) = handle.snapshot().card else {
              println!("! No card to move.");
              continue;
            };
            match flows::choose_list(&client, &card, &mut events).await {
              Ok(list) => report(handle.move_card(list.id, config.moved_card_position).await),
              Err(error) => report::<()>(Err(error)),
            }
          }
          Event::Check(item) => {
            report(handle.set_check_item_state(item, CheckItemState::Complete).await)
          }
          Event::Uncheck(item) => {
            report(handle.set_check_item_state(item, CheckItemState::Incomplete).await)
          }
          Event::Comment(text) => report(handle.add_comment(text).await),
          Event::Open(id) => {
            connected_tx.send_replace(Some(id));
          }
          Event::Close => {
            connected_tx.send_replace(None);
          }
          Event::Unknown(line) => println!("! Unknown command: {}", line),
        }
      }
    }
  }

  drop(connected_tx);
  task.await?;
  Ok(())
}

async fn connect(config: &Config, client: &Client, links: &ConnectedCards) -> Result<()> {
  let mut prompt = EventHandler::new();
  match flows::connect_card(client, config, &mut prompt).await {
    Ok(card) => {
      let id = links.connect(CardLink::new(card.id_board.clone(), card.id.clone()));
      links.save()?;
      info!(id = %id, card_id = %card.id, "connected card");
      println!("{}", id);
      Ok(())
    }
    Err(PluginError::Abort) => Ok(()),
    Err(error) => Err(eyre!(error.user_message())),
  }
}
