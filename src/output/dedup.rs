//! Deduplicated copy of the result store
//!
//! Resumed runs re-process the batches that were in flight when a run
//! stopped, so the same source URL can appear more than once.

use crate::storage::{ensure_parent, read_rows, StorageError, StorageResult};
use std::collections::HashSet;
use std::path::Path;

/// Writes the rows of `input` to `output`, keeping the first row per source URL
///
/// Returns the number of rows written. `output` is overwritten; it must not
/// be the input file.
pub fn deduplicate(input: &Path, output: &Path) -> StorageResult<usize> {
    if input == output {
        return Err(StorageError::io(
            output,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "output must differ from the input file",
            ),
        ));
    }

    let rows = read_rows(input)?;
    let total = rows.len();

    let mut seen = HashSet::new();
    let unique: Vec<_> = rows
        .into_iter()
        .filter(|row| seen.insert(row.source_url.clone()))
        .collect();

    ensure_parent(output)?;
    let mut writer = csv::Writer::from_path(output).map_err(|e| StorageError::csv(output, e))?;
    for row in &unique {
        writer
            .serialize(row)
            .map_err(|e| StorageError::csv(output, e))?;
    }
    writer.flush().map_err(|e| StorageError::io(output, e))?;

    tracing::info!(
        "Kept {} of {} rows ({} duplicates dropped)",
        unique.len(),
        total,
        total - unique.len()
    );
    Ok(unique.len())
}
