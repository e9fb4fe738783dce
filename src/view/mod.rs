//! Panel state: the connected card, its comments, list and checklists.

mod manager;
mod state;

pub use manager::{ViewHandle, ViewManager};
pub use state::{Phase, ViewSnapshot};
