//! Gmail authorization.
//!
//! - [`ClientSecrets`]: the OAuth client downloaded from Google Cloud console
//! - [`authorize`]: browser consent with a loopback redirect, yielding a
//!   refresh token for the keychain

mod flow;
mod secrets;

pub use flow::{
    authorize, exchange_code, wait_for_redirect, AuthError, AuthorizationRequest, RedirectParams,
    RedirectQuery, GMAIL_READONLY_SCOPE,
};
pub use secrets::{
    find_secrets_file, ClientSecrets, SetupError, CLIENT_SECRET_FILES, SETUP_INSTRUCTIONS,
};
