//! Mail source implementations.
//!
//! This module contains the [`MailSource`] trait and its Gmail
//! implementation, [`GmailSource`].
//!
//! # Architecture
//!
//! The scanner never talks to a mailbox API directly. A mail source exposes
//! three read-only operations (account address, recent thread ids, full
//! thread) and hides authentication and wire formats behind them, so the
//! analysis pipeline can be driven by an in-memory source in tests.
//!
//! # Example
//!
//! ```ignore
//! use forgot_to_reply::providers::email::{GmailSource, MailSource};
//!
//! async fn owner(source: &GmailSource) -> anyhow::Result<String> {
//!     Ok(source.account_email().await?)
//! }
//! ```

mod gmail;
mod traits;

pub use gmail::{GmailCredentials, GmailSource};
#[cfg(test)]
pub use traits::MockMailSource;
pub use traits::{MailSource, ProviderError, Result};
