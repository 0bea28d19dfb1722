//! Storage module for persisting crawl progress and results
//!
//! This module handles:
//! - The checkpoint of fully processed batches, rewritten on every save
//! - The append-only CSV result store

mod checkpoint;
mod results;

pub use checkpoint::CheckpointStore;
pub use results::{read_rows, ResultRow, ResultSink, RESULT_HEADERS};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading or writing crawl files
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error on {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Creates the parent directory of `path` if it has one
pub(crate) fn ensure_parent(path: &Path) -> StorageResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))
        }
        _ => Ok(()),
    }
}
