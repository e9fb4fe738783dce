//! In-memory transport and fixtures for tests.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};

#[derive(Clone)]
struct Route {
  result: Result<Value, TransportError>,
  delay: Option<Duration>,
}

#[derive(Default)]
struct MockState {
  routes: HashMap<String, Route>,
  requests: Vec<ApiRequest>,
}

/// Transport that answers from a route table keyed by path and records
/// every request it sees. Unknown paths answer 404.
#[derive(Clone, Default)]
pub struct MockTransport {
  state: Arc<Mutex<MockState>>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  fn route(&self, path: &str, result: Result<Value, TransportError>, delay: Option<Duration>) {
    self
      .state
      .lock()
      .unwrap()
      .routes
      .insert(path.to_string(), Route { result, delay });
  }

  pub fn respond(&self, path: &str, body: Value) {
    self.route(path, Ok(body), None);
  }

  /// Answer after `delay`. Use with paused tokio time.
  pub fn respond_after(&self, path: &str, body: Value, delay: Duration) {
    self.route(path, Ok(body), Some(delay));
  }

  pub fn fail(&self, path: &str, error: TransportError) {
    self.route(path, Err(error), None);
  }

  pub fn requests(&self) -> Vec<ApiRequest> {
    self.state.lock().unwrap().requests.clone()
  }

  /// Number of requests sent to `path`.
  pub fn count(&self, path: &str) -> usize {
    self
      .state
      .lock()
      .unwrap()
      .requests
      .iter()
      .filter(|r| r.path == path)
      .count()
  }
}

impl Transport for MockTransport {
  fn send(
    &self,
    request: ApiRequest,
  ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
    let route = {
      let mut state = self.state.lock().unwrap();
      state.requests.push(request.clone());
      state.routes.get(&request.path).cloned()
    };

    async move {
      let route = route.unwrap_or(Route {
        result: Err(TransportError::Status(404)),
        delay: None,
      });
      if let Some(delay) = route.delay {
        tokio::time::sleep(delay).await;
      }
      route.result.map(|body| ApiResponse { status: 200, body })
    }
  }
}

pub fn card_json(id: &str, list_id: &str) -> Value {
  card_json_with_checklists(id, list_id, &[])
}

pub fn card_json_with_checklists(id: &str, list_id: &str, checklists: &[&str]) -> Value {
  json!({
    "id": id,
    "idBoard": "b1",
    "idList": list_id,
    "name": format!("Card {}", id),
    "desc": "",
    "url": format!("https://trello.com/c/{}", id),
    "idChecklists": checklists,
    "labels": []
  })
}

pub fn list_json(id: &str) -> Value {
  json!({ "id": id, "name": format!("List {}", id), "idBoard": "b1", "pos": 1.0 })
}

pub fn comment_json(id: &str, text: &str) -> Value {
  json!({
    "id": id,
    "idMemberCreator": "m1",
    "type": "commentCard",
    "date": "2024-05-01T10:00:00.000Z",
    "data": { "text": text },
    "memberCreator": { "id": "m1", "fullName": "Ada Lovelace", "username": "ada" }
  })
}

pub fn checklist_json(id: &str, card_id: &str, items: &[(&str, &str)]) -> Value {
  let items: Vec<Value> = items
    .iter()
    .map(|(item_id, state)| {
      json!({ "id": item_id, "name": format!("Item {}", item_id), "state": state, "idChecklist": id })
    })
    .collect();
  json!({ "id": id, "name": format!("Checklist {}", id), "idCard": card_id, "idBoard": "b1", "checkItems": items })
}
