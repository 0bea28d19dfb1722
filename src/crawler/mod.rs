//! Crawler module for the directory harvest
//!
//! This module contains the core harvesting logic, including:
//! - Proxied HTTP fetching with retry and endpoint rotation
//! - HTML extraction of batch, listing and company links
//! - Pagination walking with empty-page confirmation
//! - Bounded fan-out and overall run coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod record;
mod workers;

pub use coordinator::{extract_company, run_harvest, Coordinator, DetailSettings, RunSummary};
pub use fetcher::{build_proxied_client, FetchSettings, FetchedPage, PageFetcher, ResilientFetcher};
pub use frontier::{ConfirmedPage, CrawlFrontier, FrontierSettings};
pub use parser::{
    decode_obfuscated_email, CompanyDetails, ConstructionDirectoryParser, DirectoryParser,
};
pub use record::{CompanyOutcome, CompanyRecord, DEAD_LINK, NOT_AVAILABLE};
pub use workers::WorkerPool;
