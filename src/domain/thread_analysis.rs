//! Per-thread reply assessment and its export shape.

use serde::{Deserialize, Serialize};

use super::ThreadId;

/// Outcome of analyzing one thread whose last message came from someone
/// other than the account owner and was not sent by an automated address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadAnalysis {
    /// Thread this analysis was computed for.
    pub thread_id: ThreadId,
    /// Subject of the last message.
    pub subject: String,
    /// Display name of the last sender.
    pub sender_name: String,
    /// Lower-cased address of the last sender.
    pub sender_email: String,
    /// Trimmed preview of the last message body (at most 500 characters,
    /// plus `...` when cut).
    pub last_message: String,
    /// Whole days since the last message arrived.
    pub days_ago: i64,
    /// Number of messages in the thread.
    pub message_count: usize,
    /// Whether the last message has been opened.
    pub is_read: bool,
    /// Reply urgency in `0..=100`.
    pub score: u8,
    /// Explanations for the score, in evaluation order.
    pub reasons: Vec<String>,
}

/// Returns the longest prefix of `text` holding at most `max` characters.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Serialized form of a [`ThreadAnalysis`] for JSON export.
///
/// Field names are part of the export contract consumed by other tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    /// Thread identifier.
    pub id: String,
    /// Sender display name.
    pub from: String,
    /// Sender address.
    pub email: String,
    /// Subject line.
    pub subject: String,
    /// Message preview.
    pub last_message: String,
    /// Whole days since the last message.
    pub days_ago: i64,
    /// Messages in the thread.
    pub message_count: usize,
    /// Whether the last message was read.
    pub is_read: bool,
    /// Reply urgency.
    pub score: u8,
    /// Score explanations.
    pub reasons: Vec<String>,
}

impl From<&ThreadAnalysis> for ExportRecord {
    fn from(analysis: &ThreadAnalysis) -> Self {
        Self {
            id: analysis.thread_id.0.clone(),
            from: analysis.sender_name.clone(),
            email: analysis.sender_email.clone(),
            subject: analysis.subject.clone(),
            last_message: analysis.last_message.clone(),
            days_ago: analysis.days_ago,
            message_count: analysis.message_count,
            is_read: analysis.is_read,
            score: analysis.score,
            reasons: analysis.reasons.clone(),
        }
    }
}
