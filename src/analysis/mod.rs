//! The reply-analysis pipeline.
//!
//! ```text
//! RawThread -> extractor (sender, subject, body)
//!           -> analyzer  (filters, age, read state)
//!           -> scorer    (score + reasons)
//!           -> ThreadAnalysis
//! ```
//!
//! Everything here is synchronous and free of I/O; fetching threads and
//! ranking many analyses is done by [`crate::services::ScanService`].

mod analyzer;
mod extractor;
mod scorer;

pub use analyzer::{
    analyze_thread, is_automated_sender, AnalysisError, AUTOMATED_SENDER_MARKERS, PREVIEW_CHARS,
};
pub use extractor::{decode_body, decode_data, extract_sender, extract_subject, Sender};
pub use scorer::{score_message, ReplyScore, ScoringRules, CLOSING_WINDOW_CHARS};
