//! HTTP side of the ragchat front end.

pub mod api_client;
pub mod sse;

pub use api_client::BackendClient;
