//! Single-thread analysis.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::extractor::{decode_body, extract_sender, extract_subject};
use super::scorer::{score_message, ScoringRules};
use crate::domain::{truncate_chars, RawThread, ThreadAnalysis, ThreadId};

/// Address fragments that identify automated senders.
pub const AUTOMATED_SENDER_MARKERS: &[&str] =
    &["noreply", "no-reply", "notifications", "mailer-daemon"];

/// Characters of the body kept in the preview.
pub const PREVIEW_CHARS: usize = 500;

/// Errors raised for threads whose contents cannot be interpreted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// The message timestamp lies outside the representable range.
    #[error("invalid timestamp {millis} ms on last message of thread {thread_id}")]
    InvalidTimestamp {
        /// Thread containing the message.
        thread_id: ThreadId,
        /// The offending epoch milliseconds.
        millis: i64,
    },
}

/// Returns true if `email` looks like a no-reply or notification address.
pub fn is_automated_sender(email: &str) -> bool {
    AUTOMATED_SENDER_MARKERS
        .iter()
        .any(|marker| email.contains(marker))
}

/// Analyzes a fetched thread as of `now`.
///
/// Returns `Ok(None)` when no reply is owed: the thread is empty, the
/// account owner sent the last message, or the last sender is automated.
pub fn analyze_thread(
    thread_id: &ThreadId,
    thread: &RawThread,
    account_email: &str,
    rules: &ScoringRules,
    now: DateTime<Utc>,
) -> Result<Option<ThreadAnalysis>, AnalysisError> {
    let Some(last) = thread.last_message() else {
        return Ok(None);
    };

    let sender = extract_sender(&last.headers);
    if sender.email == account_email.to_lowercase() {
        tracing::trace!(%thread_id, "last message sent by account owner");
        return Ok(None);
    }
    if is_automated_sender(&sender.email) {
        tracing::trace!(%thread_id, sender = %sender.email, "automated sender");
        return Ok(None);
    }

    let subject = extract_subject(&last.headers);
    let mut body = decode_body(&last.payload);
    if body.trim().is_empty() {
        body = last.snippet.clone();
    }

    let mut preview = truncate_chars(&body, PREVIEW_CHARS).trim().to_string();
    if body.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }

    let sent_at = DateTime::from_timestamp_millis(last.internal_date_ms).ok_or_else(|| {
        AnalysisError::InvalidTimestamp {
            thread_id: thread_id.clone(),
            millis: last.internal_date_ms,
        }
    })?;
    let days_ago = (now - sent_at).num_days().max(0);

    let message_count = thread.len();
    let scored = score_message(rules, &body, days_ago, message_count);

    Ok(Some(ThreadAnalysis {
        thread_id: thread_id.clone(),
        subject,
        sender_name: sender.name,
        sender_email: sender.email,
        last_message: preview,
        days_ago,
        message_count,
        is_read: !last.is_unread(),
        score: scored.score,
        reasons: scored.reasons,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BodyPart, Header, MessageId, RawMessage};
    use base64::prelude::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    const ACCOUNT: &str = "me@example.com";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn message(from: &str, body: &str, age: Duration, labels: &[&str]) -> RawMessage {
        RawMessage {
            id: MessageId::from("m"),
            headers: vec![
                Header::new("From", from),
                Header::new("Subject", "Project plan"),
            ],
            payload: BodyPart::multipart(
                "multipart/alternative",
                vec![BodyPart::leaf(
                    "text/plain",
                    BASE64_URL_SAFE_NO_PAD.encode(body.as_bytes()),
                )],
            ),
            internal_date_ms: (now() - age).timestamp_millis(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            snippet: "snippet text".to_string(),
        }
    }

    fn analyze(thread: &RawThread) -> Option<ThreadAnalysis> {
        analyze_thread(
            &ThreadId::from("t1"),
            thread,
            ACCOUNT,
            &ScoringRules::default(),
            now(),
        )
        .unwrap()
    }

    #[test]
    fn empty_thread_is_skipped() {
        assert!(analyze(&RawThread::default()).is_none());
    }

    #[test]
    fn own_last_message_is_skipped_case_insensitively() {
        let thread = RawThread::new(vec![message(
            "Me <ME@Example.com>",
            "Did you get it?",
            Duration::days(3),
            &[],
        )]);
        assert!(analyze(&thread).is_none());

        let thread = RawThread::new(vec![message(
            "Jane <Jane@X.com>",
            "hello",
            Duration::days(1),
            &[],
        )]);
        let result = analyze_thread(
            &ThreadId::from("t2"),
            &thread,
            "JANE@x.com",
            &ScoringRules::default(),
            now(),
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn automated_senders_are_skipped() {
        for from in [
            "updates@no-reply.example.com",
            "GitHub <notifications@github.com>",
            "noreply@shop.com",
            "MAILER-DAEMON@mx.example.com",
        ] {
            let thread =
                RawThread::new(vec![message(from, "Please respond", Duration::days(2), &[])]);
            assert!(analyze(&thread).is_none(), "{from} should be skipped");
        }
    }

    #[test]
    fn earlier_own_message_does_not_hide_thread() {
        let thread = RawThread::new(vec![
            message(ACCOUNT, "Here is the plan.", Duration::days(12), &[]),
            message("Bob <bob@co.com>", "Looks good", Duration::days(11), &[]),
        ]);
        assert!(analyze(&thread).is_some());
    }

    #[test]
    fn review_request_end_to_end() {
        let thread = RawThread::new(vec![
            message("Bob <bob@co.com>", "first", Duration::days(20), &[]),
            message(ACCOUNT, "second", Duration::days(15), &[]),
            message(
                "Bob <bob@co.com>",
                "Hey, can you review this? Thanks!",
                Duration::days(10) + Duration::hours(5),
                &["INBOX", "UNREAD"],
            ),
        ]);

        let analysis = analyze(&thread).unwrap();
        assert_eq!(analysis.thread_id, ThreadId::from("t1"));
        assert_eq!(analysis.sender_name, "Bob");
        assert_eq!(analysis.sender_email, "bob@co.com");
        assert_eq!(analysis.subject, "Project plan");
        assert_eq!(analysis.last_message, "Hey, can you review this? Thanks!");
        assert_eq!(analysis.days_ago, 10);
        assert_eq!(analysis.message_count, 3);
        assert!(!analysis.is_read);
        assert_eq!(analysis.score, 53);
        assert_eq!(
            analysis.reasons,
            vec![
                "Contains question",
                "Contains \"can you\"",
                "Over a week old",
                "Active thread",
                "Has closing phrase (lower priority)",
            ]
        );
    }

    #[test]
    fn long_body_preview_is_truncated() {
        let body = "a".repeat(600);
        let thread = RawThread::new(vec![message("bob@co.com", &body, Duration::days(1), &[])]);

        let analysis = analyze(&thread).unwrap();
        assert_eq!(analysis.last_message.len(), 503);
        assert!(analysis.last_message.ends_with("..."));
        assert_eq!(analysis.last_message[..500], body[..500]);
    }

    #[test]
    fn preview_is_trimmed() {
        let thread = RawThread::new(vec![message(
            "bob@co.com",
            "\n\n  hello there  \n",
            Duration::days(1),
            &[],
        )]);
        assert_eq!(analyze(&thread).unwrap().last_message, "hello there");
    }

    #[test]
    fn blank_body_falls_back_to_snippet() {
        let thread = RawThread::new(vec![message("bob@co.com", " \n\t", Duration::days(1), &[])]);
        let analysis = analyze(&thread).unwrap();
        assert_eq!(analysis.last_message, "snippet text");
    }

    #[test]
    fn read_state_follows_unread_label() {
        let thread = RawThread::new(vec![message("bob@co.com", "hi", Duration::days(1), &["INBOX"])]);
        assert!(analyze(&thread).unwrap().is_read);
    }

    #[test]
    fn future_timestamp_counts_as_today() {
        let thread = RawThread::new(vec![message("bob@co.com", "hi", -Duration::days(2), &[])]);
        assert_eq!(analyze(&thread).unwrap().days_ago, 0);
    }

    #[test]
    fn out_of_range_timestamp_is_an_error() {
        let mut msg = message("bob@co.com", "hi", Duration::days(1), &[]);
        msg.internal_date_ms = i64::MAX;
        let thread = RawThread::new(vec![msg]);

        let err = analyze_thread(
            &ThreadId::from("t9"),
            &thread,
            ACCOUNT,
            &ScoringRules::default(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidTimestamp { millis, .. } if millis == i64::MAX));
    }

    #[test]
    fn automated_marker_detection() {
        assert!(is_automated_sender("alerts@notifications.bank.com"));
        assert!(!is_automated_sender("bob@co.com"));
    }
}
