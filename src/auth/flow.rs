//! Installed-app OAuth flow with a loopback redirect.
//!
//! The user approves access in a browser; Google then redirects to a
//! short-lived axum server on `127.0.0.1`, and the authorization code is
//! exchanged for a refresh token using PKCE.

use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl,
    Scope, TokenUrl,
};
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use url::Url;

use super::secrets::ClientSecrets;

/// Read-only Gmail access.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Errors from the authorization flow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid OAuth client configuration: {0}")]
    Configuration(String),

    #[error("redirect listener failed: {0}")]
    Io(#[from] io::Error),

    #[error("redirect listener stopped before Google called back")]
    ListenerClosed,

    #[error("malformed redirect request: {0}")]
    MalformedRedirect(String),

    #[error("authorization denied: {0}")]
    Denied(String),

    #[error("redirect state does not match the authorization request")]
    StateMismatch,

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("no refresh token was issued; remove the app's access in your Google account and authorize again")]
    MissingRefreshToken,
}

/// Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Query parameters Google appends to the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectParams {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct CodeExchangeResponse {
    refresh_token: Option<String>,
}

/// A pending authorization: the consent URL and the secrets needed to
/// complete it.
pub struct AuthorizationRequest {
    url: Url,
    csrf_state: CsrfToken,
    pkce_verifier: PkceCodeVerifier,
}

impl AuthorizationRequest {
    /// Builds the consent URL for read-only Gmail access with offline tokens.
    pub fn new(secrets: &ClientSecrets, redirect_uri: &str) -> Result<Self> {
        let config_err = |e: url::ParseError| AuthError::Configuration(e.to_string());

        let client = BasicClient::new(
            ClientId::new(secrets.client_id.clone()),
            secrets.client_secret.clone().map(ClientSecret::new),
            AuthUrl::new(secrets.auth_uri.clone()).map_err(config_err)?,
            Some(TokenUrl::new(secrets.token_uri.clone()).map_err(config_err)?),
        )
        .set_redirect_uri(RedirectUrl::new(redirect_uri.to_string()).map_err(config_err)?);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, csrf_state) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(GMAIL_READONLY_SCOPE.to_string()))
            .set_pkce_challenge(pkce_challenge)
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        Ok(Self {
            url,
            csrf_state,
            pkce_verifier,
        })
    }

    /// URL the user opens to grant access.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Rejects a redirect that does not carry this request's state.
    pub fn verify_state(&self, state: &str) -> Result<()> {
        if state == self.csrf_state.secret() {
            Ok(())
        } else {
            Err(AuthError::StateMismatch)
        }
    }

    /// PKCE verifier sent with the code exchange.
    pub fn pkce_verifier(&self) -> &PkceCodeVerifier {
        &self.pkce_verifier
    }
}

/// Runs the full flow and returns the refresh token.
///
/// `on_url` receives the consent URL once the listener is ready, so the
/// caller can print or open it.
pub async fn authorize<F>(
    secrets: &ClientSecrets,
    http: &reqwest::Client,
    on_url: F,
) -> Result<String>
where
    F: FnOnce(&Url),
{
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let redirect_uri = format!("http://{}", listener.local_addr()?);
    tracing::debug!(redirect_uri = %redirect_uri, "Listening for OAuth redirect");

    let request = AuthorizationRequest::new(secrets, &redirect_uri)?;
    on_url(request.url());

    let params = wait_for_redirect(listener).await?;
    request.verify_state(&params.state)?;

    tracing::info!("Authorization code received");
    exchange_code(
        http,
        secrets,
        &params.code,
        request.pkce_verifier(),
        &redirect_uri,
    )
    .await
}

/// Query string Google appends to the loopback redirect.
#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl RedirectQuery {
    /// Interprets the redirect. `Ok(None)` means the request carried neither
    /// a code nor an error and should be ignored.
    pub fn into_params(self) -> Result<Option<RedirectParams>> {
        if let Some(error) = self.error {
            return Err(AuthError::Denied(error));
        }
        match (self.code, self.state) {
            (Some(code), Some(state)) => Ok(Some(RedirectParams { code, state })),
            (Some(_), None) => Err(AuthError::MalformedRedirect(
                "redirect is missing the state parameter".to_string(),
            )),
            (None, _) => Ok(None),
        }
    }
}

type RedirectSender = Arc<Mutex<Option<oneshot::Sender<Result<RedirectParams>>>>>;

/// GET / on the loopback listener.
async fn oauth_callback(
    State(sender): State<RedirectSender>,
    Query(query): Query<RedirectQuery>,
) -> impl IntoResponse {
    let outcome = match query.into_params() {
        Ok(None) => return (StatusCode::OK, "Waiting for authorization."),
        Ok(Some(params)) => Ok(params),
        Err(e) => Err(e),
    };
    let response = match &outcome {
        Ok(_) => (
            StatusCode::OK,
            "Authorization complete. You can close this tab.",
        ),
        Err(_) => (
            StatusCode::BAD_REQUEST,
            "Authorization failed. See the terminal for details.",
        ),
    };

    match sender.lock().await.take() {
        Some(tx) => {
            let _ = tx.send(outcome);
        }
        None => tracing::debug!("Ignoring repeated OAuth redirect"),
    }
    response
}

/// Serves the loopback redirect on `listener` until Google calls back.
///
/// Requests to other paths (a browser fetching `/favicon.ico`) get a 404
/// and are otherwise ignored. The server shuts down once the redirect has
/// been answered.
pub async fn wait_for_redirect(listener: TcpListener) -> Result<RedirectParams> {
    let (redirect_tx, redirect_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let sender: RedirectSender = Arc::new(Mutex::new(Some(redirect_tx)));
    let app = Router::new()
        .route("/", get(oauth_callback))
        .with_state(sender);

    tokio::spawn(async move {
        let shutdown = async {
            let _ = stop_rx.await;
        };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            tracing::warn!(error = %e, "OAuth redirect listener failed");
        }
    });

    let outcome = redirect_rx.await.map_err(|_| AuthError::ListenerClosed);
    let _ = stop_tx.send(());
    outcome?
}

/// Trades an authorization code for a refresh token.
pub async fn exchange_code(
    http: &reqwest::Client,
    secrets: &ClientSecrets,
    code: &str,
    pkce_verifier: &PkceCodeVerifier,
    redirect_uri: &str,
) -> Result<String> {
    let mut params = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("client_id", secrets.client_id.as_str()),
        ("code_verifier", pkce_verifier.secret().as_str()),
    ];
    if let Some(secret) = &secrets.client_secret {
        params.push(("client_secret", secret.as_str()));
    }

    let response = http
        .post(&secrets.token_uri)
        .form(&params)
        .send()
        .await
        .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, "Token exchange rejected");
        return Err(AuthError::TokenExchange(format!("{}: {}", status, body)));
    }

    let tokens: CodeExchangeResponse = response
        .json()
        .await
        .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

    tokens.refresh_token.ok_or(AuthError::MissingRefreshToken)
}
