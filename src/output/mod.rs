//! Output module for inspecting and maintaining the result store
//!
//! This module handles:
//! - Summarizing an existing result file (`--stats`)
//! - Writing a copy with one row per source URL (`--dedup`)

mod dedup;
pub mod stats;

pub use dedup::deduplicate;
pub use stats::{load_statistics, print_statistics, ResultStatistics};
