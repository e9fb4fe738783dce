//! Domain error type shared by the client, the view manager and the flows.

use thiserror::Error;

/// Failures that can reach the panel.
///
/// `Abort` is special: it marks a flow the user walked away from (closed a
/// picker, or a request superseded before it answered). Callers stop on it
/// without reporting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum PluginError {
  /// No API token configured. Raised locally, before any request is sent.
  #[error("no Trello API token configured")]
  NoToken,
  /// The remote rejected the token (HTTP 401).
  #[error("the Trello API rejected the token")]
  Unauthorized,
  /// The remote is throttling us (HTTP 429).
  #[error("the Trello API is rate limited")]
  RateLimit,
  /// Anything else: other statuses, transport failures, undecodable bodies.
  #[error("the Trello API could not be reached")]
  Unknown,
  /// The user cancelled an interactive flow.
  #[error("aborted")]
  Abort,
}

impl PluginError {
  /// Map an HTTP status code from a failed response.
  pub fn from_status(status: u16) -> Self {
    match status {
      401 => PluginError::Unauthorized,
      429 => PluginError::RateLimit,
      _ => PluginError::Unknown,
    }
  }

  /// Whether fixing credentials is the useful next step for the user.
  pub fn needs_credentials(&self) -> bool {
    matches!(self, PluginError::NoToken | PluginError::Unauthorized)
  }

  /// Message shown in the panel for this error.
  pub fn user_message(&self) -> &'static str {
    match self {
      PluginError::NoToken => {
        "The Trello plugin requires an API token for use. Please visit plugin settings."
      }
      PluginError::RateLimit => "The Trello API is rate limited. Please try again later.",
      PluginError::Unauthorized => {
        "The Trello API rejected your token. Please create a new token."
      }
      PluginError::Unknown | PluginError::Abort => {
        "The Trello API could not be reached. Please create a new token or try again later."
      }
    }
  }
}

pub type PluginResult<T> = Result<T, PluginError>;
