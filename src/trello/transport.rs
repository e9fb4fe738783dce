//! HTTP transport abstraction, so the client can be driven by a fake in tests.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Put,
}

/// A request relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  pub path: String,
  pub query: Vec<(String, String)>,
}

impl ApiRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      query: Vec::new(),
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::Get, path)
  }

  pub fn post(path: impl Into<String>) -> Self {
    Self::new(Method::Post, path)
  }

  pub fn put(path: impl Into<String>) -> Self {
    Self::new(Method::Put, path)
  }

  pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
    self.query.push((key.to_string(), value.into()));
    self
  }

  /// Add a parameter only when it has a non-empty value.
  pub fn query_opt(self, key: &str, value: Option<&str>) -> Self {
    match value {
      Some(v) if !v.is_empty() => self.query(key, v),
      _ => self,
    }
  }

  pub fn query_value(&self, key: &str) -> Option<&str> {
    self
      .query
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }
}

/// A successful response body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
  pub status: u16,
  pub body: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
  /// The server answered with a non-2xx status.
  #[error("HTTP {0}")]
  Status(u16),
  /// No usable answer: connection failure, timeout, unreadable body.
  #[error("request failed: {0}")]
  Network(String),
}

/// Trait for sending API requests.
///
/// Implementations resolve to the decoded body for 2xx responses and to
/// [`TransportError::Status`] otherwise.
pub trait Transport: Send + Sync + 'static {
  fn send(
    &self,
    request: ApiRequest,
  ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

/// Real transport using reqwest.
pub struct ReqwestTransport {
  client: reqwest::Client,
  base_url: Url,
}

impl ReqwestTransport {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
    let base_url = Url::parse(base_url)
      .map_err(|e| TransportError::Network(format!("Invalid base URL {}: {}", base_url, e)))?;

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| TransportError::Network(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self { client, base_url })
  }

  fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
    let mut url = self
      .base_url
      .join(request.path.trim_start_matches('/'))
      .map_err(|e| TransportError::Network(format!("Invalid path {}: {}", request.path, e)))?;
    if !request.query.is_empty() {
      url.query_pairs_mut().extend_pairs(request.query.iter());
    }
    Ok(url)
  }
}

impl Transport for ReqwestTransport {
  fn send(
    &self,
    request: ApiRequest,
  ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
    let url = self.url_for(&request);
    let client = self.client.clone();

    async move {
      let url = url?;
      let builder = match request.method {
        Method::Get => client.get(url),
        Method::Post => client.post(url),
        Method::Put => client.put(url),
      };

      let response = builder
        .send()
        .await
        .map_err(|e| TransportError::Network(format!("Request failed: {}", e)))?;

      let status = response.status();
      if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()));
      }

      let body = response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| TransportError::Network(format!("Failed to read response: {}", e)))?;

      Ok(ApiResponse {
        status: status.as_u16(),
        body,
      })
    }
  }
}
