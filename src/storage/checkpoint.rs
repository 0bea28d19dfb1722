//! Checkpoint of fully processed batches
//!
//! The checkpoint is a flat file with one absolute batch URL per line. It is
//! rewritten in full on every save: the content is a set, so only membership
//! matters. Writes go to a sibling temporary file that is renamed into place,
//! so a crash mid-save leaves the previous checkpoint intact.

use crate::storage::{ensure_parent, StorageError, StorageResult};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-backed set of completed batch URLs
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the completed batch set; a missing file is an empty set
    pub fn load(&self) -> StorageResult<BTreeSet<String>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut completed = BTreeSet::new();
        for record in reader.records() {
            let record = record.map_err(|e| StorageError::csv(&self.path, e))?;
            if let Some(url) = record.get(0).map(str::trim).filter(|u| !u.is_empty()) {
                completed.insert(url.to_string());
            }
        }

        tracing::debug!(
            "Loaded {} completed batches from {}",
            completed.len(),
            self.path.display()
        );
        Ok(completed)
    }

    /// Overwrites the checkpoint with `completed`
    ///
    /// URLs are stored trimmed and empty entries are dropped, the same
    /// normalization `load` applies, so `load` returns what was written.
    pub fn save(&self, completed: &BTreeSet<String>) -> StorageResult<()> {
        ensure_parent(&self.path)?;
        let tmp = self.tmp_path();

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp)
                .map_err(|e| StorageError::csv(&tmp, e))?;
            for url in completed.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
                writer
                    .write_record([url])
                    .map_err(|e| StorageError::csv(&tmp, e))?;
            }
            writer.flush().map_err(|e| StorageError::io(&tmp, e))?;
        }

        std::fs::rename(&tmp, &self.path).map_err(|e| StorageError::io(&self.path, e))?;
        tracing::debug!(
            "Saved {} completed batches to {}",
            completed.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Deletes the checkpoint so the next run starts from scratch
    pub fn clear(&self) -> StorageResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
