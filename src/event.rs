use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::flows::Prompt;

/// A command typed into the panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  /// `r`: re-fetch everything, skipping caches
  Refresh,
  /// `m`: move the card to another list
  Move,
  /// `c <item>`: check a check item
  Check(String),
  /// `u <item>`: uncheck a check item
  Uncheck(String),
  /// `a <text>`: add a comment
  Comment(String),
  /// `o <id>`: show another connected id
  Open(String),
  /// `d`: show nothing
  Close,
  /// `q`
  Quit,
  /// Anything else, kept for the error message
  Unknown(String),
}

impl Event {
  /// Parse one input line. Blank lines are ignored.
  pub fn parse(line: &str) -> Option<Self> {
    let line = line.trim();
    if line.is_empty() {
      return None;
    }
    let (command, arg) = match line.split_once(char::is_whitespace) {
      Some((command, arg)) => (command, arg.trim()),
      None => (line, ""),
    };

    let event = match (command, arg) {
      ("r", "") => Event::Refresh,
      ("m", "") => Event::Move,
      ("c", item) if !item.is_empty() => Event::Check(item.to_string()),
      ("u", item) if !item.is_empty() => Event::Uncheck(item.to_string()),
      ("a", text) if !text.is_empty() => Event::Comment(text.to_string()),
      ("o", id) if !id.is_empty() => Event::Open(id.to_string()),
      ("d", "") => Event::Close,
      ("q", "") => Event::Quit,
      _ => Event::Unknown(line.to_string()),
    };
    Some(event)
  }
}

/// Event handler that reads lines from stdin.
///
/// The same lines serve as panel commands ([`EventHandler::next`]) and as
/// answers to interactive questions (its [`Prompt`] impl).
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<String>,
}

impl EventHandler {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn stdin reader
    tokio::spawn(async move {
      let mut lines = BufReader::new(tokio::io::stdin()).lines();
      while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).is_err() {
          break;
        }
      }
    });

    Self { rx }
  }

  /// Receive the next command. `None` once stdin is closed.
  pub async fn next(&mut self) -> Option<Event> {
    loop {
      let line = self.rx.recv().await?;
      if let Some(event) = Event::parse(&line) {
        return Some(event);
      }
    }
  }

  async fn next_line(&mut self) -> Option<String> {
    self.rx.recv().await
  }
}

impl Default for EventHandler {
  fn default() -> Self {
    Self::new()
  }
}

fn print_options(title: &str, options: &[String]) {
  println!("{}:", title);
  for (i, option) in options.iter().enumerate() {
    println!("  {:>2}) {}", i + 1, option);
  }
}

/// Parse a 1-based choice. Anything else cancels.
fn parse_choice(line: &str, len: usize) -> Option<usize> {
  match line.trim().parse::<usize>() {
    Ok(n) if (1..=len).contains(&n) => Some(n - 1),
    _ => None,
  }
}

/// Parse a list of 1-based choices separated by commas or spaces. An
/// empty line picks nothing; any invalid entry cancels.
fn parse_choices(line: &str, len: usize) -> Option<Vec<usize>> {
  line
    .split(|c: char| c == ',' || c.is_whitespace())
    .filter(|part| !part.is_empty())
    .map(|part| parse_choice(part, len))
    .collect()
}

impl Prompt for EventHandler {
  async fn choose(&mut self, title: &str, options: &[String]) -> Option<usize> {
    print_options(title, options);
    println!("Number, or empty to cancel:");
    let line = self.next_line().await?;
    parse_choice(&line, options.len())
  }

  async fn choose_many(&mut self, title: &str, options: &[String]) -> Option<Vec<usize>> {
    print_options(title, options);
    println!("Numbers separated by commas, empty for none, 'q' to cancel:");
    let line = self.next_line().await?;
    if line.trim() == "q" {
      return None;
    }
    parse_choices(&line, options.len())
  }

  async fn text(&mut self, title: &str) -> Option<String> {
    println!("{}:", title);
    self.next_line().await
  }
}
