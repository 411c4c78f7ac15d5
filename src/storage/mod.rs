//! Credential storage.
//!
//! The Gmail refresh token lives in the OS keychain; nothing else about a
//! scan is persisted.

mod keychain;

pub use keychain::{KeychainError, TokenStore};
