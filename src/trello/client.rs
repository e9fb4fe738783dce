use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{PluginError, PluginResult};
use crate::trello::transport::{ApiRequest, Transport, TransportError};
use crate::trello::types::{
  Action, ActionType, Board, Card, CardPosition, CheckItem, CheckItemState, Checklist, Label,
  List, NewCardRequest,
};

/// Trello API client. Every call goes to the network.
///
/// Attaches the API key and the current token to each request. An empty
/// token fails with [`PluginError::NoToken`] before anything is sent.
pub struct TrelloClient<T> {
  transport: Arc<T>,
  api_key: String,
  token: watch::Receiver<String>,
}

impl<T> Clone for TrelloClient<T> {
  fn clone(&self) -> Self {
    Self {
      transport: Arc::clone(&self.transport),
      api_key: self.api_key.clone(),
      token: self.token.clone(),
    }
  }
}

impl<T: Transport> TrelloClient<T> {
  pub fn new(transport: T, api_key: impl Into<String>, token: watch::Receiver<String>) -> Self {
    Self {
      transport: Arc::new(transport),
      api_key: api_key.into(),
      token,
    }
  }

  /// Send a request with credentials attached and decode the body.
  async fn call<R: DeserializeOwned>(&self, request: ApiRequest) -> PluginResult<R> {
    let token = self.token.borrow().clone();
    if token.is_empty() {
      return Err(PluginError::NoToken);
    }

    let path = request.path.clone();
    let request = request
      .query("key", self.api_key.as_str())
      .query("token", token);

    let response = self.transport.send(request).await.map_err(|e| {
      warn!(path = %path, error = %e, "Trello request failed");
      match e {
        TransportError::Status(status) => PluginError::from_status(status),
        TransportError::Network(_) => PluginError::Unknown,
      }
    })?;

    serde_json::from_value(response.body).map_err(|e| {
      warn!(path = %path, error = %e, "Failed to parse Trello response");
      PluginError::Unknown
    })
  }

  /// Get all boards for the current member
  pub async fn get_boards(&self) -> PluginResult<Vec<Board>> {
    debug!("TrelloClient.get_boards");
    self
      .call(ApiRequest::get("/1/members/me/boards").query("fields", "name,url"))
      .await
  }

  /// Get a single card on a board
  pub async fn get_card(&self, board_id: &str, card_id: &str) -> PluginResult<Card> {
    debug!(board_id, card_id, "TrelloClient.get_card");
    self
      .call(ApiRequest::get(format!("/1/boards/{}/cards/{}", board_id, card_id)))
      .await
  }

  /// Get all cards on a board
  pub async fn get_cards(&self, board_id: &str) -> PluginResult<Vec<Card>> {
    debug!(board_id, "TrelloClient.get_cards");
    self
      .call(ApiRequest::get(format!("/1/boards/{}/cards", board_id)))
      .await
  }

  pub async fn get_labels(&self, board_id: &str) -> PluginResult<Vec<Label>> {
    debug!(board_id, "TrelloClient.get_labels");
    self
      .call(ApiRequest::get(format!("/1/boards/{}/labels", board_id)))
      .await
  }

  pub async fn get_lists(&self, board_id: &str) -> PluginResult<Vec<List>> {
    debug!(board_id, "TrelloClient.get_lists");
    self
      .call(ApiRequest::get(format!("/1/boards/{}/lists", board_id)))
      .await
  }

  pub async fn get_list(&self, list_id: &str) -> PluginResult<List> {
    debug!(list_id, "TrelloClient.get_list");
    self
      .call(ApiRequest::get(format!("/1/lists/{}", list_id)))
      .await
  }

  /// Get actions of the given types on a card
  pub async fn get_actions(
    &self,
    card_id: &str,
    action_types: &[ActionType],
  ) -> PluginResult<Vec<Action>> {
    debug!(card_id, "TrelloClient.get_actions");
    let filter = action_types
      .iter()
      .map(ActionType::as_str)
      .collect::<Vec<_>>()
      .join(",");
    self
      .call(ApiRequest::get(format!("/1/cards/{}/actions", card_id)).query("filter", filter))
      .await
  }

  pub async fn get_checklists(&self, card_id: &str) -> PluginResult<Vec<Checklist>> {
    debug!(card_id, "TrelloClient.get_checklists");
    self
      .call(ApiRequest::get(format!("/1/cards/{}/checklists", card_id)))
      .await
  }

  pub async fn get_checklist(&self, checklist_id: &str) -> PluginResult<Checklist> {
    debug!(checklist_id, "TrelloClient.get_checklist");
    self
      .call(ApiRequest::get(format!("/1/checklists/{}", checklist_id)))
      .await
  }

  /// Add a comment to a card
  pub async fn add_comment(&self, card_id: &str, text: &str) -> PluginResult<Action> {
    debug!(card_id, "TrelloClient.add_comment");
    self
      .call(
        ApiRequest::post(format!("/1/cards/{}/actions/comments", card_id)).query("text", text),
      )
      .await
  }

  /// Create a new card
  pub async fn create_card(&self, request: &NewCardRequest) -> PluginResult<Card> {
    debug!(list_id = %request.id_list, "TrelloClient.create_card");
    let labels = request.id_labels.join(",");
    self
      .call(
        ApiRequest::post("/1/cards")
          .query_opt("idList", Some(request.id_list.as_str()))
          .query_opt("name", Some(request.name.as_str()))
          .query_opt("desc", request.desc.as_deref())
          .query("pos", request.pos.as_str())
          .query_opt("idLabels", Some(labels.as_str())),
      )
      .await
  }

  /// Move a card to another list
  pub async fn move_card(
    &self,
    card_id: &str,
    list_id: &str,
    position: CardPosition,
  ) -> PluginResult<Card> {
    debug!(card_id, list_id, "TrelloClient.move_card");
    self
      .call(
        ApiRequest::put(format!("/1/cards/{}", card_id))
          .query_opt("idList", Some(list_id))
          .query("pos", position.as_str()),
      )
      .await
  }

  /// Check or uncheck a check item
  pub async fn set_check_item_state(
    &self,
    card_id: &str,
    check_item_id: &str,
    state: CheckItemState,
  ) -> PluginResult<CheckItem> {
    debug!(card_id, check_item_id, "TrelloClient.set_check_item_state");
    self
      .call(
        ApiRequest::put(format!("/1/cards/{}/checkItem/{}", card_id, check_item_id))
          .query("state", state.as_str()),
      )
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::trello::testing::{card_json, MockTransport};
  use crate::trello::transport::Method;
  use serde_json::json;

  fn client(mock: &MockTransport, token: &str) -> TrelloClient<MockTransport> {
    let (_tx, rx) = watch::channel(token.to_string());
    TrelloClient::new(mock.clone(), "api-key", rx)
  }

  #[tokio::test]
  async fn test_no_token_fails_before_network() {
    let mock = MockTransport::new();
    let client = client(&mock, "");

    let result = client.get_card("b1", "c1").await;
    assert_eq!(result.unwrap_err(), PluginError::NoToken);
    assert!(mock.requests().is_empty());
  }

  #[tokio::test]
  async fn test_auth_is_attached() {
    let mock = MockTransport::new();
    mock.respond("/1/boards/b1/cards/c1", card_json("c1", "l1"));
    let client = client(&mock, "secret");

    let card = client.get_card("b1", "c1").await.unwrap();
    assert_eq!(card.id, "c1");

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query_value("key"), Some("api-key"));
    assert_eq!(requests[0].query_value("token"), Some("secret"));
  }

  #[tokio::test]
  async fn test_status_codes_map_to_errors() {
    let mock = MockTransport::new();
    mock.fail("/1/lists/l1", TransportError::Status(401));
    mock.fail("/1/lists/l2", TransportError::Status(429));
    mock.fail("/1/lists/l3", TransportError::Status(503));
    mock.fail("/1/lists/l4", TransportError::Network("reset".to_string()));
    let client = client(&mock, "secret");

    assert_eq!(client.get_list("l1").await.unwrap_err(), PluginError::Unauthorized);
    assert_eq!(client.get_list("l2").await.unwrap_err(), PluginError::RateLimit);
    assert_eq!(client.get_list("l3").await.unwrap_err(), PluginError::Unknown);
    assert_eq!(client.get_list("l4").await.unwrap_err(), PluginError::Unknown);
  }

  #[tokio::test]
  async fn test_undecodable_body_is_unknown() {
    let mock = MockTransport::new();
    mock.respond("/1/lists/l1", json!({ "unexpected": true }));
    let client = client(&mock, "secret");

    assert_eq!(client.get_list("l1").await.unwrap_err(), PluginError::Unknown);
  }

  #[tokio::test]
  async fn test_token_changes_are_picked_up() {
    let mock = MockTransport::new();
    mock.respond("/1/boards/b1/cards/c1", card_json("c1", "l1"));
    let (tx, rx) = watch::channel(String::new());
    let client = TrelloClient::new(mock.clone(), "api-key", rx);

    assert_eq!(client.get_card("b1", "c1").await.unwrap_err(), PluginError::NoToken);

    tx.send("fresh".to_string()).unwrap();
    assert!(client.get_card("b1", "c1").await.is_ok());
  }

  #[tokio::test]
  async fn test_mutation_requests() {
    let mock = MockTransport::new();
    mock.respond("/1/cards/c1", card_json("c1", "l2"));
    mock.respond(
      "/1/cards/c1/checkItem/i1",
      json!({ "id": "i1", "name": "Item", "state": "complete", "idChecklist": "k1" }),
    );
    let client = client(&mock, "secret");

    let card = client.move_card("c1", "l2", CardPosition::Bottom).await.unwrap();
    assert_eq!(card.id_list, "l2");

    let item = client
      .set_check_item_state("c1", "i1", CheckItemState::Complete)
      .await
      .unwrap();
    assert_eq!(item.state, CheckItemState::Complete);

    let requests = mock.requests();
    assert_eq!(requests[0].method, Method::Put);
    assert_eq!(requests[0].query_value("idList"), Some("l2"));
    assert_eq!(requests[0].query_value("pos"), Some("bottom"));
    assert_eq!(requests[1].query_value("state"), Some("complete"));
  }

  #[tokio::test]
  async fn test_create_card_omits_empty_fields() {
    let mock = MockTransport::new();
    mock.respond("/1/cards", card_json("new", "l1"));
    let client = client(&mock, "secret");

    let request = NewCardRequest {
      id_list: "l1".to_string(),
      name: "Plan release".to_string(),
      desc: None,
      pos: CardPosition::Top,
      id_labels: Vec::new(),
    };
    client.create_card(&request).await.unwrap();

    let sent = &mock.requests()[0];
    assert_eq!(sent.method, Method::Post);
    assert_eq!(sent.query_value("name"), Some("Plan release"));
    assert_eq!(sent.query_value("desc"), None);
    assert_eq!(sent.query_value("idLabels"), None);
  }
}
