//! OS keychain storage for the Gmail refresh token.
//!
//! Wraps the keyring crate; every call runs on the blocking pool since the
//! platform backends are synchronous.

use thiserror::Error;

/// Errors that can occur during keychain operations.
#[derive(Debug, Error)]
pub enum KeychainError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Failed to spawn blocking task: {0}")]
    TaskFailed(String),
}

/// Result type for keychain operations.
pub type Result<T> = std::result::Result<T, KeychainError>;

/// Stores the refresh token issued by the `authorize` flow.
///
/// Entries are namespaced by service name so tests can use their own.
#[derive(Debug, Clone)]
pub struct TokenStore {
    service_name: String,
}

impl TokenStore {
    /// Default keychain service name.
    pub const DEFAULT_SERVICE: &'static str = "forgot-to-reply";

    /// Keychain entry holding the Gmail refresh token.
    pub const GMAIL_REFRESH_TOKEN: &'static str = "gmail.refresh_token";

    /// Creates a store using the default service name.
    pub fn new() -> Self {
        Self::with_service(Self::DEFAULT_SERVICE)
    }

    /// Creates a store under a custom service name.
    pub fn with_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Returns the service name entries are stored under.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Saves the Gmail refresh token, replacing any previous one.
    pub async fn save_refresh_token(&self, token: &str) -> Result<()> {
        let entry = self.entry(Self::GMAIL_REFRESH_TOKEN);
        let token = token.to_string();

        tokio::task::spawn_blocking(move || {
            entry?.set_password(&token)?;
            Ok(())
        })
        .await
        .map_err(|e| KeychainError::TaskFailed(e.to_string()))?
    }

    /// Loads the Gmail refresh token, or `None` if `authorize` never ran.
    pub async fn refresh_token(&self) -> Result<Option<String>> {
        let entry = self.entry(Self::GMAIL_REFRESH_TOKEN);

        tokio::task::spawn_blocking(move || match entry?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(KeychainError::Keyring(e)),
        })
        .await
        .map_err(|e| KeychainError::TaskFailed(e.to_string()))?
    }

    /// Removes the Gmail refresh token. Removing an absent token succeeds.
    pub async fn clear_refresh_token(&self) -> Result<()> {
        let entry = self.entry(Self::GMAIL_REFRESH_TOKEN);

        tokio::task::spawn_blocking(move || match entry?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::Keyring(e)),
        })
        .await
        .map_err(|e| KeychainError::TaskFailed(e.to_string()))?
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(&self.service_name, key)?)
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}
