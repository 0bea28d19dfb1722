//! Crawler coordinator - main harvest loop
//!
//! This module drives a run end to end:
//! - Loading the checkpoint and computing the pending batches
//! - Processing batches one at a time through the frontier and worker pool
//! - Flushing result rows and the checkpoint every few batches and at the end
//! - Reporting progress

use crate::config::{Config, DelayRange};
use crate::crawler::fetcher::{FetchSettings, PageFetcher, ResilientFetcher};
use crate::crawler::frontier::{CrawlFrontier, FrontierSettings};
use crate::crawler::parser::{ConstructionDirectoryParser, DirectoryParser};
use crate::crawler::record::{CompanyOutcome, CompanyRecord};
use crate::crawler::workers::WorkerPool;
use crate::proxy::{HttpProxySource, ProxyPool, ProxySource};
use crate::storage::{CheckpointStore, ResultRow, ResultSink};
use crate::HarvestError;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches_discovered: usize,
    pub batches_skipped: usize,
    pub batches_processed: usize,
    pub flushes: usize,
    pub rows_written: usize,
    pub extracted: usize,
    pub unreachable: usize,
    pub empty: usize,
}

impl RunSummary {
    /// Company URLs processed during the run
    pub fn companies(&self) -> usize {
        self.extracted + self.unreachable + self.empty
    }

    fn record(&mut self, outcome: &CompanyOutcome) {
        match outcome {
            CompanyOutcome::Extracted(_) => self.extracted += 1,
            CompanyOutcome::Unreachable { .. } => self.unreachable += 1,
            CompanyOutcome::EmptyButReachable { .. } => self.empty += 1,
        }
    }
}

/// Retry policy for company pages that load without any company fields
#[derive(Debug, Clone, Copy)]
pub struct DetailSettings {
    pub attempts: u32,
    pub retry_delay: DelayRange,
}

impl DetailSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            attempts: config.crawler.detail_attempts,
            retry_delay: config.crawler.detail_retry_delay,
        }
    }
}

#[derive(Debug, Clone)]
struct CoordinatorSettings {
    save_every: usize,
    batch_pause: DelayRange,
    refetch_listing_pages: bool,
    detail: DetailSettings,
}

/// Main harvest coordinator
pub struct Coordinator {
    frontier: CrawlFrontier,
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn DirectoryParser>,
    workers: WorkerPool,
    checkpoint: CheckpointStore,
    sink: ResultSink,
    settings: CoordinatorSettings,
}

impl Coordinator {
    /// Creates a coordinator over the given fetcher and parser
    ///
    /// # Errors
    ///
    /// Fails if the configured base URL cannot be parsed.
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<dyn DirectoryParser>,
    ) -> Result<Self, HarvestError> {
        let frontier = CrawlFrontier::new(
            Arc::clone(&fetcher),
            Arc::clone(&parser),
            FrontierSettings::from_config(config)?,
        );

        Ok(Self {
            frontier,
            fetcher,
            parser,
            workers: WorkerPool::new(config.crawler.concurrency),
            checkpoint: CheckpointStore::new(&config.output.checkpoint_path),
            sink: ResultSink::new(&config.output.results_path),
            settings: CoordinatorSettings {
                save_every: config.crawler.save_every.max(1),
                batch_pause: config.crawler.batch_pause,
                refetch_listing_pages: config.crawler.refetch_listing_pages,
                detail: DetailSettings::from_config(config),
            },
        })
    }

    /// Runs the harvest loop over every batch not yet checkpointed
    ///
    /// Batches are processed sequentially in discovery order. Rows and the
    /// checkpoint are flushed together every `save_every` batches and once
    /// more at the end, rows first.
    ///
    /// # Errors
    ///
    /// Fails if the directory root cannot be fetched or a flush fails.
    /// Per-page and per-company failures never abort the run.
    pub async fn run(&self) -> Result<RunSummary, HarvestError> {
        let mut summary = RunSummary::default();
        let mut completed = self.checkpoint.load()?;
        tracing::info!(
            "Loaded {} completed batches from {}",
            completed.len(),
            self.checkpoint.path().display()
        );

        let batches = self.frontier.discover_batches().await?;
        let pending: Vec<String> = batches
            .iter()
            .filter(|batch| !completed.contains(*batch))
            .cloned()
            .collect();

        summary.batches_discovered = batches.len();
        summary.batches_skipped = batches.len() - pending.len();
        tracing::info!(
            "{} batches pending, {} already done",
            pending.len(),
            summary.batches_skipped
        );

        let start_time = Instant::now();
        let mut buffer: Vec<ResultRow> = Vec::new();
        let mut since_flush = 0;

        for (index, batch_url) in pending.iter().enumerate() {
            tracing::info!(
                "Processing batch {}/{}: {}",
                index + 1,
                pending.len(),
                batch_url
            );

            let outcomes = self.process_batch(batch_url).await;
            for outcome in &outcomes {
                summary.record(outcome);
                buffer.push(outcome.to_row());
            }

            completed.insert(batch_url.clone());
            summary.batches_processed += 1;
            since_flush += 1;

            if since_flush >= self.settings.save_every {
                summary.rows_written += self.flush(&mut buffer, &completed)?;
                summary.flushes += 1;
                since_flush = 0;
            }

            log_progress(&summary, pending.len(), buffer.len(), start_time.elapsed());

            if index + 1 < pending.len() {
                self.settings.batch_pause.pause().await;
            }
        }

        summary.rows_written += self.flush(&mut buffer, &completed)?;
        summary.flushes += 1;

        tracing::info!(
            "Harvest complete: {} batches, {} companies ({} extracted, {} dead links, {} empty) in {:.1}s",
            summary.batches_processed,
            summary.companies(),
            summary.extracted,
            summary.unreachable,
            summary.empty,
            start_time.elapsed().as_secs_f64()
        );

        Ok(summary)
    }

    /// Turns one batch into one outcome per discovered company URL
    async fn process_batch(&self, batch_url: &str) -> Vec<CompanyOutcome> {
        let pages = self.frontier.discover_confirmed_pages(batch_url).await;
        if pages.is_empty() {
            tracing::warn!("No listing pages confirmed for {}", batch_url);
            return Vec::new();
        }

        let company_urls: Vec<String> = if self.settings.refetch_listing_pages {
            let frontier = &self.frontier;
            let page_urls: Vec<String> = pages.into_iter().map(|page| page.url).collect();
            self.workers
                .run_all(page_urls, |url: String| async move {
                    frontier.fetch_page_links(&url).await
                })
                .await
                .into_iter()
                .flatten()
                .collect()
        } else {
            pages.into_iter().flat_map(|page| page.links).collect()
        };

        tracing::info!("Found {} companies in {}", company_urls.len(), batch_url);

        let fetcher = self.fetcher.as_ref();
        let parser = self.parser.as_ref();
        let detail = &self.settings.detail;
        let outcomes = self
            .workers
            .run_all(company_urls, |url| extract_company(fetcher, parser, url, detail))
            .await;

        let dead: Vec<&str> = outcomes
            .iter()
            .filter(|outcome| outcome.is_unreachable())
            .map(|outcome| outcome.source_url())
            .collect();
        if !dead.is_empty() {
            tracing::warn!("{} dead links in {}", dead.len(), batch_url);
            tracing::debug!("Dead links: {:?}", dead);
        }

        outcomes
    }

    /// Appends the buffered rows, then saves the checkpoint
    fn flush(
        &self,
        buffer: &mut Vec<ResultRow>,
        completed: &BTreeSet<String>,
    ) -> Result<usize, HarvestError> {
        let written = self.sink.append(buffer)?;
        self.checkpoint.save(completed)?;
        buffer.clear();

        tracing::info!(
            "Saved {} rows to {} and {} completed batches",
            written,
            self.sink.path().display(),
            completed.len()
        );
        Ok(written)
    }
}

/// Fetches one company detail page and classifies the result
///
/// A page that loads without a name or an email is fetched again, up to
/// `settings.attempts` times in all, before it counts as empty. Never fails:
/// an exhausted fetch becomes [`CompanyOutcome::Unreachable`].
pub async fn extract_company(
    fetcher: &dyn PageFetcher,
    parser: &dyn DirectoryParser,
    url: String,
    settings: &DetailSettings,
) -> CompanyOutcome {
    let attempts = settings.attempts.max(1);

    for attempt in 1..=attempts {
        if attempt > 1 {
            settings.retry_delay.pause().await;
        }

        let page = match fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Dead link {}: {}", url, e);
                return CompanyOutcome::Unreachable { source_url: url };
            }
        };

        let details = parser.company_details(&page.body);
        if details.name.is_some() || details.email.is_some() {
            return CompanyOutcome::Extracted(CompanyRecord {
                name: details.name,
                email: details.email,
                source_url: url,
            });
        }

        tracing::warn!(
            "No company fields on {} attempt {}/{}",
            url,
            attempt,
            attempts
        );
    }

    CompanyOutcome::EmptyButReachable { source_url: url }
}

fn log_progress(summary: &RunSummary, total: usize, buffered: usize, elapsed: Duration) {
    let done = summary.batches_processed;
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        summary.companies() as f64 / secs
    } else {
        0.0
    };
    let eta = elapsed
        .checked_div(done as u32)
        .unwrap_or_default()
        .saturating_mul(total.saturating_sub(done) as u32);

    tracing::info!(
        "Progress: {}/{} batches, {} rows buffered, {:.2} companies/sec, ~{}s remaining",
        done,
        total,
        buffered,
        rate,
        eta.as_secs()
    );
}

/// Runs a complete harvest with the live proxy pool and HTTP fetcher
///
/// Starts the proxy refresh task, waits for the first proxy list, then
/// hands over to the [`Coordinator`]. The refresh task is stopped when the
/// run ends.
pub async fn run_harvest(config: &Config) -> Result<RunSummary, HarvestError> {
    let pool = Arc::new(ProxyPool::new(config.proxy.eviction_threshold));
    let source: Arc<dyn ProxySource> = Arc::new(HttpProxySource::new(
        config.proxy.source_url.clone(),
        Duration::from_secs(config.proxy.source_timeout_secs),
    )?);
    let refresh = pool.spawn_refresh(
        source,
        Duration::from_secs(config.proxy.refresh_interval_secs),
    );

    tracing::info!("Waiting for the first proxy list from {}", config.proxy.source_url);
    pool.wait_until_ready().await;
    tracing::info!("Proxy pool ready with {} endpoints", pool.len());

    let fetcher: Arc<dyn PageFetcher> = Arc::new(ResilientFetcher::new(
        Arc::clone(&pool),
        FetchSettings::from_config(config),
    ));
    let parser: Arc<dyn DirectoryParser> = Arc::new(ConstructionDirectoryParser::new());

    let result = match Coordinator::new(config, fetcher, parser) {
        Ok(coordinator) => coordinator.run().await,
        Err(e) => Err(e),
    };
    refresh.abort();
    result
}
