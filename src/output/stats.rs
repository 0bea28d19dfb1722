//! Statistics over the result store
//!
//! This module reads a result CSV back and summarizes what a run, or a
//! series of resumed runs, has produced so far.

use crate::crawler::{DEAD_LINK, NOT_AVAILABLE};
use crate::storage::{read_rows, StorageResult};
use std::collections::HashMap;
use std::path::Path;

/// Result file statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultStatistics {
    /// Total number of data rows
    pub total_rows: usize,

    /// Number of distinct source URLs
    pub unique_sources: usize,

    /// Rows repeating a source URL already seen earlier in the file
    pub duplicate_rows: usize,

    /// Source URLs that appear more than once
    pub duplicated_sources: usize,

    /// Rows for detail pages that could not be fetched
    pub dead_links: usize,

    /// Reachable rows without an email
    pub missing_emails: usize,

    /// Rows carrying an extracted email
    pub with_email: usize,
}

/// Loads statistics from a result file
///
/// # Arguments
///
/// * `path` - The result CSV to read
///
/// # Returns
///
/// * `Ok(ResultStatistics)` - Successfully summarized the file
/// * `Err(StorageError)` - The file is missing or not a result CSV
pub fn load_statistics(path: &Path) -> StorageResult<ResultStatistics> {
    let rows = read_rows(path)?;

    let mut per_source: HashMap<&str, usize> = HashMap::new();
    let mut stats = ResultStatistics {
        total_rows: rows.len(),
        ..Default::default()
    };

    for row in &rows {
        *per_source.entry(row.source_url.as_str()).or_default() += 1;

        if row.email == DEAD_LINK {
            stats.dead_links += 1;
        } else if row.email == NOT_AVAILABLE {
            stats.missing_emails += 1;
        } else {
            stats.with_email += 1;
        }
    }

    stats.unique_sources = per_source.len();
    stats.duplicate_rows = stats.total_rows - stats.unique_sources;
    stats.duplicated_sources = per_source.values().filter(|&&n| n > 1).count();

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
/// * `completed_batches` - Batches recorded in the checkpoint
pub fn print_statistics(stats: &ResultStatistics, completed_batches: usize) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Completed batches: {}", completed_batches);
    println!("  Total rows: {}", stats.total_rows);
    println!("  Unique source URLs: {}", stats.unique_sources);
    println!();

    println!("Rows by Outcome:");
    for (label, count) in [
        ("With email", stats.with_email),
        ("Missing email", stats.missing_emails),
        ("Dead links", stats.dead_links),
    ] {
        println!("  {}: {} ({:.1}%)", label, count, percentage(count, stats.total_rows));
    }
    println!();

    if stats.duplicate_rows > 0 {
        println!("Duplicates:");
        println!(
            "  {} extra rows across {} source URLs",
            stats.duplicate_rows, stats.duplicated_sources
        );
        println!("  Run with --dedup <OUTPUT> to write a deduplicated copy");
        println!();
    }

    println!(
        "Email Rate: {:.1}% ({} / {} rows)",
        percentage(stats.with_email, stats.total_rows),
        stats.with_email,
        stats.total_rows
    );
}

fn percentage(count: usize, total: usize) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
