//! Raw mailbox shapes handed over by a mail source.
//!
//! These mirror what a mailbox API returns for a thread fetched in full:
//! ordered messages, each with a header list, a MIME part tree, a
//! millisecond timestamp and a label set. Nothing here is interpreted yet;
//! that is the job of [`crate::analysis`].

use serde::{Deserialize, Serialize};

use super::MessageId;

/// Label marking a message the account owner has not opened.
pub const UNREAD_LABEL: &str = "UNREAD";

/// A conversation as fetched from the mailbox, oldest message first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawThread {
    /// Messages in chronological order.
    pub messages: Vec<RawMessage>,
}

impl RawThread {
    /// Creates a thread from messages already in chronological order.
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self { messages }
    }

    /// Returns the most recent message, if any.
    pub fn last_message(&self) -> Option<&RawMessage> {
        self.messages.last()
    }

    /// Number of messages in the thread.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the thread holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A single message inside a [`RawThread`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Provider identifier of the message.
    pub id: MessageId,
    /// Header name/value pairs in the order they appear.
    pub headers: Vec<Header>,
    /// Root of the MIME part tree.
    pub payload: BodyPart,
    /// Time the mailbox received the message, in epoch milliseconds.
    pub internal_date_ms: i64,
    /// Labels applied to the message (e.g. `INBOX`, `UNREAD`).
    pub labels: Vec<String>,
    /// Short plain-text preview supplied by the provider.
    pub snippet: String,
}

impl RawMessage {
    /// Returns true if the message carries the [`UNREAD_LABEL`].
    pub fn is_unread(&self) -> bool {
        self.labels.iter().any(|l| l == UNREAD_LABEL)
    }
}

/// A message header. Names compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name, e.g. `From`.
    pub name: String,
    /// Raw header value.
    pub value: String,
}

impl Header {
    /// Creates a header from a name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns true if this header's name matches `name`, ignoring ASCII case.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A node in a message's MIME tree.
///
/// Leaves carry inline data (base64url-encoded, as delivered by the
/// provider); multipart nodes carry child parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BodyPart {
    /// A part with (possibly absent) inline data.
    Leaf {
        /// MIME type, e.g. `text/plain`.
        mime_type: String,
        /// Base64url-encoded content, if the provider inlined it.
        data: Option<String>,
    },
    /// A container part such as `multipart/alternative`.
    Multipart {
        /// MIME type, e.g. `multipart/mixed`.
        mime_type: String,
        /// Child parts in document order.
        parts: Vec<BodyPart>,
    },
}

impl BodyPart {
    /// Creates a leaf part with inline data.
    pub fn leaf(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Leaf {
            mime_type: mime_type.into(),
            data: Some(data.into()),
        }
    }

    /// Creates a leaf part whose content was not inlined.
    pub fn empty(mime_type: impl Into<String>) -> Self {
        Self::Leaf {
            mime_type: mime_type.into(),
            data: None,
        }
    }

    /// Creates a multipart node.
    pub fn multipart(mime_type: impl Into<String>, parts: Vec<BodyPart>) -> Self {
        Self::Multipart {
            mime_type: mime_type.into(),
            parts,
        }
    }
}
