//! Domain layer types for forgot-to-reply.
//!
//! This module contains the raw mailbox shapes consumed by the analysis
//! pipeline and the records it produces.

mod message;
mod thread_analysis;
mod types;

pub use message::{BodyPart, Header, RawMessage, RawThread, UNREAD_LABEL};
pub(crate) use thread_analysis::truncate_chars;
pub use thread_analysis::{ExportRecord, ThreadAnalysis};
pub use types::{MessageId, ThreadId};
