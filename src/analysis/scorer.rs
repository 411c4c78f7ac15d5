//! Reply-need scoring.
//!
//! [`score_message`] turns a message body plus a little thread context into
//! an urgency score in `0..=100` and an ordered list of reasons. It performs
//! no I/O and reads no global state: the phrase tables arrive through
//! [`ScoringRules`].
//!
//! Signals, in evaluation order:
//!
//! 1. a literal `?` anywhere in the text (+30)
//! 2. the first action phrase found, in table order (its weight; later
//!    matches are ignored)
//! 3. age: over 30 days (+25), over 14 (+15), over 7 (+10)
//! 4. thread length: over 5 messages (+15), over 2 (+8)
//! 5. a closing phrase within the last 200 characters (-15)
//!
//! The sum is clamped into `0..=100`.

use serde::{Deserialize, Serialize};

/// Characters from the end of the text inspected for closing phrases.
pub const CLOSING_WINDOW_CHARS: usize = 200;

const QUESTION_WEIGHT: i32 = 30;
const CLOSING_PENALTY: i32 = 15;
const MAX_SCORE: i32 = 100;

const DEFAULT_ACTION_PHRASES: &[(&str, i32)] = &[
    ("let me know", 25),
    ("thoughts?", 30),
    ("what do you think", 28),
    ("can you", 20),
    ("could you", 20),
    ("would you", 18),
    ("please", 10),
    ("asap", 35),
    ("urgent", 35),
    ("waiting", 25),
    ("get back to me", 30),
    ("reply", 25),
    ("respond", 25),
    ("following up", 30),
    ("checking in", 25),
    ("any update", 30),
    ("free to", 15),
    ("available", 12),
    ("when can", 22),
];

const DEFAULT_CLOSING_PHRASES: &[&str] = &["thanks", "thank you", "cheers", "best", "regards"];

/// Phrase tables driving the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRules {
    /// Action phrases and their weights, in priority order.
    pub action_phrases: Vec<(String, i32)>,
    /// Sign-off phrases that lower urgency when they end a message.
    pub closing_phrases: Vec<String>,
}

impl ScoringRules {
    /// Builds rules from custom tables. Phrases are lower-cased so they can
    /// be matched against lower-cased text.
    pub fn new<P, C>(action_phrases: P, closing_phrases: C) -> Self
    where
        P: IntoIterator<Item = (String, i32)>,
        C: IntoIterator<Item = String>,
    {
        Self {
            action_phrases: action_phrases
                .into_iter()
                .map(|(phrase, weight)| (phrase.to_lowercase(), weight))
                .collect(),
            closing_phrases: closing_phrases
                .into_iter()
                .map(|phrase| phrase.to_lowercase())
                .collect(),
        }
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self::new(
            DEFAULT_ACTION_PHRASES
                .iter()
                .map(|(phrase, weight)| (phrase.to_string(), *weight)),
            DEFAULT_CLOSING_PHRASES.iter().map(|p| p.to_string()),
        )
    }
}

/// Result of scoring a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyScore {
    /// Urgency in `0..=100`.
    pub score: u8,
    /// One entry per contributing signal, in evaluation order.
    pub reasons: Vec<String>,
}

/// Scores how much `text` needs a reply.
///
/// `days_ago` is the age of the message in whole days and `message_count`
/// the length of its thread.
pub fn score_message(
    rules: &ScoringRules,
    text: &str,
    days_ago: i64,
    message_count: usize,
) -> ReplyScore {
    let mut score: i32 = 0;
    let mut reasons = Vec::new();
    let lower = text.to_lowercase();

    if text.contains('?') {
        score = score.saturating_add(QUESTION_WEIGHT);
        reasons.push("Contains question".to_string());
    }

    if let Some((phrase, weight)) = rules
        .action_phrases
        .iter()
        .find(|(phrase, _)| lower.contains(phrase.as_str()))
    {
        score = score.saturating_add(*weight);
        reasons.push(format!("Contains \"{}\"", phrase));
    }

    let age = if days_ago > 30 {
        Some((25, "Over a month old"))
    } else if days_ago > 14 {
        Some((15, "Over 2 weeks old"))
    } else if days_ago > 7 {
        Some((10, "Over a week old"))
    } else {
        None
    };
    if let Some((weight, reason)) = age {
        score = score.saturating_add(weight);
        reasons.push(reason.to_string());
    }

    let length = if message_count > 5 {
        Some((15, "Long thread"))
    } else if message_count > 2 {
        Some((8, "Active thread"))
    } else {
        None
    };
    if let Some((weight, reason)) = length {
        score = score.saturating_add(weight);
        reasons.push(reason.to_string());
    }

    let tail = tail_chars(&lower, CLOSING_WINDOW_CHARS);
    if rules
        .closing_phrases
        .iter()
        .any(|phrase| tail.contains(phrase.as_str()))
    {
        score = score.saturating_sub(CLOSING_PENALTY);
        reasons.push("Has closing phrase (lower priority)".to_string());
    }

    ReplyScore {
        score: score.clamp(0, MAX_SCORE) as u8,
        reasons,
    }
}

/// Returns the last `count` characters of `text`.
fn tail_chars(text: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    match text.char_indices().rev().nth(count - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}
