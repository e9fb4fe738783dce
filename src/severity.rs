//! Picks the one error worth showing when several slots failed at once.

use crate::error::PluginError;

/// Rank used for ordering. `Abort` never ranks; it is handled by the flow
/// that produced it and is ignored here.
fn rank(error: PluginError) -> u8 {
  match error {
    PluginError::Abort => 0,
    PluginError::NoToken => 1,
    PluginError::RateLimit | PluginError::Unknown => 2,
    PluginError::Unauthorized => 3,
  }
}

/// Return the most severe error among `errors`.
///
/// Ordering is `None < NoToken < RateLimit == Unknown < Unauthorized`.
/// Between `RateLimit` and `Unknown` the first one seen wins.
pub fn worst<I>(errors: I) -> Option<PluginError>
where
  I: IntoIterator<Item = Option<PluginError>>,
{
  errors
    .into_iter()
    .flatten()
    .filter(|e| rank(*e) > 0)
    .fold(None, |worst, err| match worst {
      Some(current) if rank(current) >= rank(err) => Some(current),
      _ => Some(err),
    })
}
