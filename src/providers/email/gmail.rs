//! Gmail API mail source.
//!
//! This module provides a [`MailSource`] implementation using the Gmail REST
//! API with a read-only OAuth 2.0 scope.
//!
//! # Authentication
//!
//! The source is built from [`GmailCredentials`]: the OAuth client pair plus
//! a refresh token obtained by [`crate::auth::authorize`]. Access tokens are
//! minted from the refresh token when [`GmailSource::authenticate`] runs.
//!
//! # API Usage
//!
//! This source uses the Gmail API v1:
//! - `users.getProfile` for the account address
//! - `users.threads.list` with an `in:inbox after:` query for recent threads
//! - `users.threads.get` with `format=full` for complete threads

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{MailSource, ProviderError, Result};
use crate::domain::{BodyPart, Header, MessageId, RawMessage, RawThread, ThreadId};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Gmail API thread list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadListResponse {
    threads: Option<Vec<ThreadRef>>,
    #[allow(dead_code)]
    next_page_token: Option<String>,
    #[allow(dead_code)]
    result_size_estimate: Option<u32>,
}

/// Thread reference returned by `threads.list`.
#[derive(Debug, Deserialize)]
struct ThreadRef {
    id: String,
}

/// Gmail API thread.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailThread {
    id: String,
    #[allow(dead_code)]
    history_id: Option<String>,
    messages: Option<Vec<GmailMessage>>,
}

/// Gmail API message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    label_ids: Option<Vec<String>>,
    snippet: Option<String>,
    payload: Option<GmailPart>,
    internal_date: Option<String>,
}

/// Gmail message part. The message payload uses the same shape, with headers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPart {
    mime_type: Option<String>,
    headers: Option<Vec<GmailHeader>>,
    body: Option<GmailBody>,
    parts: Option<Vec<GmailPart>>,
}

/// Gmail message header.
#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

/// Gmail message body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailBody {
    data: Option<String>,
    #[allow(dead_code)]
    size: Option<u32>,
}

/// Gmail profile response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    email_address: String,
}

/// OAuth token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    expires_in: u64,
    #[allow(dead_code)]
    token_type: String,
}

/// OAuth credentials for the Gmail API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailCredentials {
    /// OAuth refresh token.
    pub refresh_token: String,
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret, absent for public clients.
    pub client_secret: Option<String>,
}

/// Gmail API mail source.
///
/// # Example
///
/// ```ignore
/// use forgot_to_reply::providers::email::{GmailCredentials, GmailSource, MailSource};
///
/// let mut source = GmailSource::new(credentials);
/// source.authenticate().await?;
///
/// let me = source.account_email().await?;
/// ```
pub struct GmailSource {
    /// HTTP client for API requests.
    client: reqwest::Client,
    /// OAuth credentials.
    credentials: GmailCredentials,
    /// Current OAuth access token.
    access_token: Option<String>,
}

impl GmailSource {
    /// Creates a new Gmail source.
    ///
    /// The source is not authenticated until [`authenticate`](Self::authenticate) is called.
    pub fn new(credentials: GmailCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            access_token: None,
        }
    }

    /// Exchanges the refresh token for a fresh access token.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Authentication`] if Google rejects the
    /// refresh token (revoked, expired, or issued to another client).
    pub async fn authenticate(&mut self) -> Result<()> {
        let mut params = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        if let Some(secret) = &self.credentials.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse token response: {}", e)))?;

        self.access_token = Some(token_response.access_token);
        tracing::info!("Gmail source authenticated");
        Ok(())
    }

    /// Builds authorization headers for API requests.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let token = self
            .access_token
            .as_ref()
            .ok_or_else(|| ProviderError::Authentication("not authenticated".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ProviderError::Internal(format!("invalid header: {}", e)))?,
        );
        Ok(headers)
    }

    /// Makes an authenticated GET request to the Gmail API.
    async fn get<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T> {
        let headers = self.auth_headers()?;

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse response: {}", e)))
    }

    /// Maps an API error response to a [`ProviderError`].
    async fn handle_error(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            400 => ProviderError::InvalidRequest(body),
            401 | 403 => ProviderError::Authentication(format!("unauthorized: {}", body)),
            404 => ProviderError::NotFound(body),
            429 => ProviderError::RateLimited { retry_after_secs },
            _ => ProviderError::Internal(format!("API error ({}): {}", status, body)),
        }
    }

    /// Builds an endpoint URL under the Gmail API base.
    fn endpoint(path: &str) -> Result<Url> {
        Url::parse(&format!("{}{}", GMAIL_API_BASE, path))
            .map_err(|e| ProviderError::InvalidRequest(format!("bad endpoint {}: {}", path, e)))
    }

    /// Builds the `threads.list` URL for inbox threads after `after`.
    fn thread_list_url(after: NaiveDate, limit: u32) -> Result<Url> {
        let mut url = Self::endpoint("/threads")?;
        let query = format!("in:inbox after:{}", after.format("%Y/%m/%d"));
        url.query_pairs_mut()
            .append_pair("q", &query)
            .append_pair("maxResults", &limit.to_string());
        Ok(url)
    }

    /// Builds the `threads.get` URL for a full thread.
    fn thread_url(thread_id: &ThreadId) -> Result<Url> {
        let mut url = Self::endpoint("/threads/")?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidRequest("endpoint cannot be a base".to_string()))?
            .pop_if_empty()
            .push(thread_id.as_str());
        url.query_pairs_mut().append_pair("format", "full");
        Ok(url)
    }

    /// Converts a Gmail thread into the domain shape.
    fn convert_thread(thread: GmailThread) -> Result<RawThread> {
        let messages = thread
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| Self::convert_message(&thread.id, m))
            .collect::<Result<Vec<_>>>()?;
        Ok(RawThread::new(messages))
    }

    fn convert_message(thread_id: &str, msg: GmailMessage) -> Result<RawMessage> {
        let internal_date_ms = msg
            .internal_date
            .as_deref()
            .and_then(|d| d.parse::<i64>().ok())
            .ok_or_else(|| {
                ProviderError::Internal(format!(
                    "message {} in thread {} has invalid internalDate {:?}",
                    msg.id, thread_id, msg.internal_date
                ))
            })?;

        let (headers, payload) = match msg.payload {
            Some(mut part) => {
                let headers = part
                    .headers
                    .take()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|h| Header::new(h.name, h.value))
                    .collect();
                (headers, Self::convert_part(part))
            }
            None => (Vec::new(), BodyPart::multipart("multipart/mixed", Vec::new())),
        };

        Ok(RawMessage {
            id: MessageId::from(msg.id),
            headers,
            payload,
            internal_date_ms,
            labels: msg.label_ids.unwrap_or_default(),
            snippet: msg.snippet.unwrap_or_default(),
        })
    }

    /// Converts a Gmail part tree; parts with children become multipart nodes.
    fn convert_part(part: GmailPart) -> BodyPart {
        let mime_type = part.mime_type.unwrap_or_default();
        match part.parts {
            Some(children) if !children.is_empty() => BodyPart::Multipart {
                mime_type,
                parts: children.into_iter().map(Self::convert_part).collect(),
            },
            _ => BodyPart::Leaf {
                mime_type,
                data: part.body.and_then(|b| b.data).filter(|d| !d.is_empty()),
            },
        }
    }
}

#[async_trait]
impl MailSource for GmailSource {
    async fn account_email(&self) -> Result<String> {
        let profile: ProfileResponse = self.get(Self::endpoint("/profile")?).await?;
        Ok(profile.email_address.to_lowercase())
    }

    async fn list_recent_thread_ids(&self, after: NaiveDate, limit: u32) -> Result<Vec<ThreadId>> {
        let url = Self::thread_list_url(after, limit)?;
        let response: ThreadListResponse = self.get(url).await?;

        let ids: Vec<ThreadId> = response
            .threads
            .unwrap_or_default()
            .into_iter()
            .map(|t| ThreadId::from(t.id))
            .collect();
        tracing::debug!(count = ids.len(), %after, "listed recent threads");
        Ok(ids)
    }

    async fn get_thread(&self, thread_id: &ThreadId) -> Result<RawThread> {
        let response: GmailThread = self.get(Self::thread_url(thread_id)?).await?;
        Self::convert_thread(response)
    }
}
