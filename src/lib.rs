//! Mirror a connected Trello card, with its comments, list and checklists,
//! into a side panel, keeping it in sync with few network calls.

pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod flows;
pub mod links;
pub mod render;
pub mod severity;
pub mod trello;
pub mod view;
