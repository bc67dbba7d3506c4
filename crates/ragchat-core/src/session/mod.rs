//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: the conversation state (`Session`)
//! - `message`: conversation turns (`Message`, `MessageRole`)
//! - `mode`: backend behavior profile (`QueryMode`)
//! - `quota`: free query allowance and email validation

mod message;
mod mode;
mod model;
mod quota;

// Re-export public API
pub use message::{GENERIC_FAILURE, Message, MessageRole};
pub use mode::QueryMode;
pub use model::Session;
pub use quota::{QUOTA_THRESHOLD, QuotaStatus, is_valid_email};
