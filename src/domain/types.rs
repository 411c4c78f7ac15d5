//! Core identifier types for domain entities.
//!
//! These newtype wrappers keep provider identifiers from being mixed up with
//! the free-form strings (subjects, addresses) that travel alongside them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an email thread (conversation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Unique identifier for an individual message within a thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_id_display() {
        let id = ThreadId::from("18c2f0a9b1");
        assert_eq!(id.to_string(), "18c2f0a9b1");
        assert_eq!(id.as_str(), "18c2f0a9b1");
    }

    #[test]
    fn thread_id_equality() {
        let id1 = ThreadId::from("thread-1");
        let id2 = ThreadId::from("thread-1".to_string());
        assert_eq!(id1, id2);
    }

    #[test]
    fn thread_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ThreadId::from("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn message_id_from_str() {
        let id: MessageId = "msg-42".into();
        assert_eq!(id.0, "msg-42");
    }
}
