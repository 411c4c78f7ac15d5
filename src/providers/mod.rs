//! Provider implementations for external services.
//!
//! - [`email`] - Mail sources (Gmail API)

pub mod email;
