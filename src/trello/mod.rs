//! Trello REST access: DTOs, the transport seam, the raw client and its
//! cached wrapper.

mod cache;
mod cached_client;
mod client;
#[cfg(test)]
pub(crate) mod testing;
mod transport;
pub mod types;

pub use cached_client::CachedTrelloClient;
pub use client::TrelloClient;
pub use transport::{ApiRequest, ApiResponse, Method, ReqwestTransport, Transport, TransportError};
