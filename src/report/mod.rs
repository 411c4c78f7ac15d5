//! Presentation of scan results: a console report and a JSON export.

mod console;
mod export;

pub use console::{render_report, Tier};
pub use export::{export_json, to_records, ExportError};
