//! Append-only CSV result store
//!
//! Rows are appended at flush boundaries. The header row is written once,
//! when the file is created; the sink never rewrites or deduplicates
//! earlier rows.

use crate::storage::{ensure_parent, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Column names of the result store
pub const RESULT_HEADERS: [&str; 3] = ["Company Name", "Email", "Source URL"];

/// One row of the result store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "Company Name")]
    pub name: String,

    #[serde(rename = "Email")]
    pub email: String,

    #[serde(rename = "Source URL")]
    pub source_url: String,
}

/// Appends company rows to a CSV file
#[derive(Debug, Clone)]
pub struct ResultSink {
    path: PathBuf,
}

impl ResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `rows`, writing the header first if the file is new
    ///
    /// The file is opened and closed within the call. Returns the number of
    /// rows written; an empty slice leaves the file untouched.
    pub fn append(&self, rows: &[ResultRow]) -> StorageResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        ensure_parent(&self.path)?;
        let is_new = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);

        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| StorageError::csv(&self.path, e))?;
        }
        writer
            .flush()
            .map_err(|e| StorageError::io(&self.path, e))?;

        Ok(rows.len())
    }
}

/// Reads every row of a result file
pub fn read_rows(path: &Path) -> StorageResult<Vec<ResultRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| StorageError::csv(path, e))?;

    reader
        .deserialize()
        .collect::<Result<Vec<ResultRow>, _>>()
        .map_err(|e| StorageError::csv(path, e))
}
