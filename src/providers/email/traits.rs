//! Mail source trait definition.
//!
//! This module defines the [`MailSource`] trait: the read-only slice of a
//! mailbox API that the scanner needs. Implementations own authentication
//! and wire formats; callers only see domain types.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{RawThread, ThreadId};

/// Result type alias for mail source operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur during mail source operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, if known.
        retry_after_secs: Option<u64>,
    },

    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error, including undecodable responses.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Returns true if retrying with the same credentials cannot succeed.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

/// Read-only access to a single mailbox.
///
/// # Example
///
/// ```ignore
/// use forgot_to_reply::providers::email::MailSource;
///
/// async fn newest(source: &impl MailSource) -> anyhow::Result<()> {
///     let since = chrono::Utc::now().date_naive() - chrono::Days::new(7);
///     for id in source.list_recent_thread_ids(since, 10).await? {
///         let thread = source.get_thread(&id).await?;
///         println!("{id}: {} messages", thread.len());
///     }
///     Ok(())
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Returns the mailbox owner's address, lower-cased.
    async fn account_email(&self) -> Result<String>;

    /// Lists inbox threads with activity on or after `after`, newest first.
    ///
    /// # Arguments
    ///
    /// * `after` - Inclusive lower bound on the thread date
    /// * `limit` - Maximum number of ids to return
    async fn list_recent_thread_ids(&self, after: NaiveDate, limit: u32) -> Result<Vec<ThreadId>>;

    /// Fetches a complete thread with all messages, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] if the thread does not exist.
    async fn get_thread(&self, thread_id: &ThreadId) -> Result<RawThread>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        let auth_err = ProviderError::Authentication("token expired".to_string());
        assert_eq!(auth_err.to_string(), "authentication failed: token expired");

        let rate_err = ProviderError::RateLimited {
            retry_after_secs: Some(60),
        };
        assert!(rate_err.to_string().contains("rate limit"));

        let not_found = ProviderError::NotFound("thread-123".to_string());
        assert!(not_found.to_string().contains("not found"));
    }

    #[test]
    fn authentication_errors_are_flagged() {
        assert!(ProviderError::Authentication("x".into()).is_authentication());
        assert!(!ProviderError::Connection("x".into()).is_authentication());
    }
}
