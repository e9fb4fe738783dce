//! Plain-text rendering of a view snapshot.

use std::fmt::Write;

use crate::config::PanelConfig;
use crate::error::PluginError;
use crate::trello::types::{Action, Card, CheckItemState, Checklist, List};
use crate::view::{Phase, ViewSnapshot};

/// Render the panel for `snapshot`, showing the sections `panel` enables.
pub fn render(snapshot: &ViewSnapshot, panel: &PanelConfig) -> String {
  if let Some(error) = snapshot.error {
    return render_empty(Some(error));
  }
  match (&snapshot.phase, &snapshot.card) {
    (Phase::Resolving, _) => "Loading card...\n".to_string(),
    (_, Some(card)) => render_connected(snapshot, card, panel),
    (_, None) => render_empty(None),
  }
}

const CREDENTIALS_HINT: &str =
  "Setup Trello: set TRELLO_PANE_TOKEN to a valid token and restart trello-pane.";
const RETRY_HINT: &str = "Press r to retry.";

fn render_empty(error: Option<PluginError>) -> String {
  match error {
    None => "No Trello card connected.\nRun `trello-pane connect` to connect one.\n".to_string(),
    Some(PluginError::NoToken) => format!(
      "No Trello card connected.\nAn API token is required.\n{}\n{}\n",
      PluginError::NoToken.user_message(),
      CREDENTIALS_HINT
    ),
    Some(error) if error.needs_credentials() => format!(
      "Could not reach Trello API.\n{}\n{}\n",
      error.user_message(),
      CREDENTIALS_HINT
    ),
    Some(error) => format!(
      "Could not reach Trello API.\n{}\n{}\n",
      error.user_message(),
      RETRY_HINT
    ),
  }
}

fn render_connected(snapshot: &ViewSnapshot, card: &Card, panel: &PanelConfig) -> String {
  let mut out = String::new();

  if panel.list {
    if let Some(list) = &snapshot.list {
      render_list(&mut out, list);
    }
  }
  if panel.title {
    let _ = writeln!(out, "# {}", card.name);
    if !card.url.is_empty() {
      let _ = writeln!(out, "  {}", card.url);
    }
  }
  if panel.description && !card.desc.is_empty() {
    let _ = writeln!(out, "\nDescription:");
    for line in card.desc.lines() {
      let _ = writeln!(out, "  {}", line);
    }
  }
  if panel.due {
    match card.due {
      Some(due) => {
        let _ = writeln!(out, "\nDue: {}", due.format("%A, %B %-d, %Y"));
      }
      None => {
        let _ = writeln!(out, "\nNo due date");
      }
    }
  }
  if panel.labels {
    render_labels(&mut out, card);
  }
  if panel.comments {
    render_comments(&mut out, snapshot.actions.as_deref());
  }
  if panel.checklists {
    if let Some(checklists) = snapshot.checklists.as_deref() {
      for checklist in checklists {
        render_checklist(&mut out, checklist);
      }
    }
  }

  out
}

fn render_list(out: &mut String, list: &List) {
  let _ = writeln!(out, "[{}] -> (m to move)", list.name);
}

fn render_labels(out: &mut String, card: &Card) {
  let labels: Vec<String> = card
    .labels
    .iter()
    .filter_map(|label| {
      let color = label.color.as_deref()?;
      Some(if label.name.is_empty() {
        format!("({})", color)
      } else {
        format!("{} ({})", label.name, color)
      })
    })
    .collect();
  if !labels.is_empty() {
    let _ = writeln!(out, "\nLabels: {}", labels.join(", "));
  }
}

fn render_comments(out: &mut String, comments: Option<&[Action]>) {
  let _ = writeln!(out, "\nComments (a <text> to add):");
  for comment in comments.unwrap_or_default() {
    let author = comment
      .member_creator
      .as_ref()
      .map_or("unknown", |m| m.full_name.as_str());
    let _ = writeln!(
      out,
      "  {} - {}",
      author,
      comment.date.format("%Y-%m-%d %H:%M")
    );
    for line in comment.data.text.as_deref().unwrap_or_default().lines() {
      let _ = writeln!(out, "    {}", line);
    }
  }
}

fn render_checklist(out: &mut String, checklist: &Checklist) {
  let progress = checklist.progress();
  let _ = writeln!(
    out,
    "\n{} ({}/{}) {}%",
    checklist.name, progress.complete, progress.total, progress.percent
  );
  for item in &checklist.check_items {
    let mark = match item.state {
      CheckItemState::Complete => "x",
      CheckItemState::Incomplete => " ",
    };
    let _ = writeln!(out, "  [{}] {}  ({})", mark, item.name, item.id);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::trello::testing::{card_json, checklist_json, comment_json, list_json};
  use serde_json::json;

  fn connected() -> ViewSnapshot {
    let mut card = card_json("c1", "l1");
    card["desc"] = json!("First line\nSecond line");
    card["due"] = json!("2024-05-06T12:00:00.000Z");
    card["labels"] = json!([
      { "id": "lb1", "name": "Bug", "color": "red" },
      { "id": "lb2", "name": "", "color": "green" },
      { "id": "lb3", "name": "Colorless", "color": null }
    ]);

    ViewSnapshot {
      connected_id: Some("n1".to_string()),
      phase: Phase::Ready,
      card: Some(serde_json::from_value(card).unwrap()),
      actions: Some(vec![serde_json::from_value(comment_json("a1", "Looks good")).unwrap()]),
      list: Some(serde_json::from_value(list_json("l1")).unwrap()),
      checklists: Some(vec![serde_json::from_value(checklist_json(
        "k1",
        "c1",
        &[("i1", "complete"), ("i2", "incomplete"), ("i3", "incomplete")],
      ))
      .unwrap()]),
      error: None,
    }
  }

  #[test]
  fn test_render_connected_card() {
    let out = render(&connected(), &PanelConfig::default());

    assert!(out.starts_with("[List l1]"));
    assert!(out.contains("# Card c1"));
    assert!(out.contains("  Second line"));
    assert!(out.contains("Due: Monday, May 6, 2024"));
    assert!(out.contains("Labels: Bug (red), (green)\n"));
    assert!(out.contains("  Ada Lovelace - 2024-05-01 10:00\n    Looks good"));
    assert!(out.contains("Checklist k1 (1/3) 33%"));
    assert!(out.contains("  [x] Item i1  (i1)"));
    assert!(out.contains("  [ ] Item i2  (i2)"));
  }

  #[test]
  fn test_hidden_sections_are_skipped() {
    let panel = PanelConfig {
      comments: false,
      checklists: false,
      due: false,
      ..PanelConfig::default()
    };
    let out = render(&connected(), &panel);

    assert!(!out.contains("Comments"));
    assert!(!out.contains("Checklist k1"));
    assert!(!out.contains("Due"));
    assert!(out.contains("# Card c1"));
  }

  #[test]
  fn test_errors_replace_partial_data() {
    let mut snapshot = connected();
    snapshot.error = Some(PluginError::RateLimit);
    snapshot.phase = Phase::Errored(PluginError::RateLimit);

    let out = render(&snapshot, &PanelConfig::default());
    assert!(out.starts_with("Could not reach Trello API."));
    assert!(out.contains("rate limited"));
    assert!(out.ends_with("Press r to retry.\n"));
    assert!(!out.contains("TRELLO_PANE_TOKEN"));
    assert!(!out.contains("Card c1"));
  }

  #[test]
  fn test_rejected_token_asks_for_credentials() {
    let snapshot = ViewSnapshot {
      error: Some(PluginError::Unauthorized),
      phase: Phase::Errored(PluginError::Unauthorized),
      ..connected()
    };

    let out = render(&snapshot, &PanelConfig::default());
    assert!(out.contains("rejected your token"));
    assert!(out.contains("Setup Trello: set TRELLO_PANE_TOKEN"));
    assert!(!out.contains("Press r to retry."));
  }

  #[test]
  fn test_empty_states() {
    let out = render(&ViewSnapshot::default(), &PanelConfig::default());
    assert!(out.starts_with("No Trello card connected."));

    let snapshot = ViewSnapshot {
      error: Some(PluginError::NoToken),
      ..ViewSnapshot::default()
    };
    let out = render(&snapshot, &PanelConfig::default());
    assert!(out.contains("An API token is required."));
    assert!(out.contains("TRELLO_PANE_TOKEN"));

    let loading = ViewSnapshot {
      phase: Phase::Resolving,
      ..ViewSnapshot::default()
    };
    assert_eq!(render(&loading, &PanelConfig::default()), "Loading card...\n");
  }
}
