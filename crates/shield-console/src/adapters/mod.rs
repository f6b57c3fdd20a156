//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound ports over WebSocket and HTTP.

mod http_api;
mod ws_transport;

pub use http_api::{endpoint_url, receipts_url, HttpOffsecApi};
pub use ws_transport::WsFeedTransport;
