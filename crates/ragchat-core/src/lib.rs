//! Domain layer of the ragchat front end: conversation state, the backend
//! contract, configuration and display formatting.

pub mod backend;
pub mod config;
pub mod error;
pub mod format;
pub mod session;

// Re-export common error type
pub use error::{RagchatError, Result};
