use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for dir-harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The directory being harvested
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Scheme and host every relative link is resolved against
    pub base_url: String,

    /// Path of the directory root page listing all batches
    #[serde(default = "default_directory_path")]
    pub directory_path: String,

    /// Query parameter carrying the listing page number
    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl SiteConfig {
    /// Absolute URL of the directory root page
    pub fn directory_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.directory_path.trim_start_matches('/')
        )
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight during a fan-out
    pub concurrency: usize,

    /// Number of completed batches between two flushes
    pub save_every: usize,

    /// Attempts per logical fetch, each through a freshly drawn proxy
    pub fetch_attempts: u32,

    /// Attempts per listing page before it is taken as the end of a batch
    pub page_attempts: u32,

    /// Fetches of a company page that shows neither a name nor an email
    /// before it is recorded as empty
    pub detail_attempts: u32,

    /// Upper bound on listing pages walked in one batch
    pub max_pages_per_batch: u32,

    /// Timeout for a single proxied request
    pub request_timeout_secs: u64,

    /// Fetch confirmed listing pages a second time instead of reusing the
    /// links seen while walking the pagination
    pub refetch_listing_pages: bool,

    /// Pause between two attempts of the same logical fetch
    pub fetch_retry_delay: DelayRange,

    /// Pause between two attempts on the same listing page
    pub page_retry_delay: DelayRange,

    /// Pause before fetching an empty company page again
    pub detail_retry_delay: DelayRange,

    /// Pause between two consecutive listing pages
    pub page_delay: DelayRange,

    /// Pause after each completed batch
    pub batch_pause: DelayRange,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 20,
            save_every: 10,
            fetch_attempts: 3,
            page_attempts: 3,
            detail_attempts: 3,
            max_pages_per_batch: 5000,
            request_timeout_secs: 15,
            refetch_listing_pages: false,
            fetch_retry_delay: DelayRange::none(),
            page_retry_delay: DelayRange::new(1000, 2000),
            detail_retry_delay: DelayRange::new(5000, 10000),
            page_delay: DelayRange::new(500, 1000),
            batch_pause: DelayRange::new(2000, 5000),
        }
    }
}

/// Proxy pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ProxyConfig {
    /// JSON endpoint listing `{ip, port}` proxies
    pub source_url: String,

    /// Seconds between two refreshes of the pool
    pub refresh_interval_secs: u64,

    /// Failures after which an endpoint leaves the active set
    pub eviction_threshold: u32,

    /// Timeout for the proxy source request
    pub source_timeout_secs: u64,

    /// How long a fetch waits for an empty pool to be refilled
    pub empty_pool_wait_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            source_url: "https://proxylist.geonode.com/api/proxy-list?limit=50&page=1&sort_by=lastChecked&sort_type=desc".to_string(),
            refresh_interval_secs: 300,
            eviction_threshold: 3,
            source_timeout_secs: 10,
            empty_pool_wait_secs: 300,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// File holding the completed batch URLs, one per line
    pub checkpoint_path: String,

    /// CSV file the company rows are appended to
    pub results_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: "batch_checkpoint.csv".to_string(),
            results_path: "construction_companies.csv".to_string(),
        }
    }
}

/// An inclusive range of milliseconds a randomized pause is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that never pauses
    pub const fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.max_ms == 0
    }

    /// Draws a duration uniformly from the range
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }

    /// Sleeps for a sampled duration; returns immediately for a zero range
    pub async fn pause(&self) {
        if !self.is_zero() {
            tokio::time::sleep(self.sample()).await;
        }
    }
}

fn default_directory_path() -> String {
    "/construction_directory.aspx".to_string()
}

fn default_page_param() -> String {
    "pagenum".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.93 Safari/537.36".to_string()
}
