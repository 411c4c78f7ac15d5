//! JSON export of scan results.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{ExportRecord, ThreadAnalysis};

/// Errors writing the export file.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Converts analyses into export records, keeping their order.
pub fn to_records(results: &[ThreadAnalysis]) -> Vec<ExportRecord> {
    results.iter().map(ExportRecord::from).collect()
}

/// Writes every result to `path` as a pretty-printed JSON array.
///
/// Returns the number of records written.
pub fn export_json(results: &[ThreadAnalysis], path: &Path) -> Result<usize, ExportError> {
    let records = to_records(results);
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush().map_err(io_err)?;

    tracing::debug!(path = %path.display(), count = records.len(), "Exported results");
    Ok(records.len())
}
