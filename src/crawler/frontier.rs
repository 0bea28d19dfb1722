//! Crawl frontier: batch discovery and pagination walking
//!
//! Listing pages of a batch are probed in order. A page only ends the batch
//! after every one of its attempts came back without company links, which
//! rides out the transient empty pages the directory serves under load.

use crate::config::{Config, DelayRange};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::DirectoryParser;
use crate::url::{absolutize, page_url};
use crate::HarvestError;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// A listing page known to hold company links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedPage {
    pub url: String,
    pub page_number: u32,
    /// Absolute company links seen when the page was confirmed
    pub links: Vec<String>,
}

/// Pagination walking settings
#[derive(Debug, Clone)]
pub struct FrontierSettings {
    pub base_url: Url,
    pub directory_url: String,
    pub page_param: String,
    pub page_attempts: u32,
    pub max_pages_per_batch: u32,
    pub page_retry_delay: DelayRange,
    pub page_delay: DelayRange,
}

impl FrontierSettings {
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        Ok(Self {
            base_url: Url::parse(&config.site.base_url)?,
            directory_url: config.site.directory_url(),
            page_param: config.site.page_param.clone(),
            page_attempts: config.crawler.page_attempts,
            max_pages_per_batch: config.crawler.max_pages_per_batch,
            page_retry_delay: config.crawler.page_retry_delay,
            page_delay: config.crawler.page_delay,
        })
    }
}

/// Walks the batch → listing page hierarchy of the directory
pub struct CrawlFrontier {
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn DirectoryParser>,
    settings: FrontierSettings,
}

impl CrawlFrontier {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<dyn DirectoryParser>,
        settings: FrontierSettings,
    ) -> Self {
        Self {
            fetcher,
            parser,
            settings,
        }
    }

    /// Fetches the directory root and returns the absolute batch URLs
    ///
    /// Duplicates are dropped, first-seen order is kept.
    ///
    /// # Errors
    ///
    /// Fails if the root page cannot be fetched: without it there is
    /// nothing to crawl.
    pub async fn discover_batches(&self) -> Result<Vec<String>, HarvestError> {
        let page = self.fetcher.fetch(&self.settings.directory_url).await?;
        let links = self.parser.batch_links(&page.body);
        let batches = dedup_in_order(self.resolve_links(&links));

        tracing::info!(
            "Found {} batch links on {}",
            batches.len(),
            self.settings.directory_url
        );
        Ok(batches)
    }

    /// Walks the pages of `batch_url` until one stays empty on every attempt
    ///
    /// Never fails: an unreachable page counts as an empty attempt, and the
    /// pages confirmed so far are returned.
    pub async fn discover_confirmed_pages(&self, batch_url: &str) -> Vec<ConfirmedPage> {
        let mut confirmed = Vec::new();
        let mut page_number = 1;

        loop {
            if page_number > self.settings.max_pages_per_batch {
                tracing::warn!(
                    "Stopping {} at the {}-page cap",
                    batch_url,
                    self.settings.max_pages_per_batch
                );
                break;
            }

            let url = page_url(batch_url, &self.settings.page_param, page_number);
            match self.confirm_page(&url, page_number).await {
                Some(links) => {
                    tracing::debug!("Confirmed page {} with {} companies", page_number, links.len());
                    confirmed.push(ConfirmedPage {
                        url,
                        page_number,
                        links,
                    });
                }
                None => {
                    tracing::info!(
                        "No companies on page {} after {} attempts, end of batch",
                        page_number,
                        self.settings.page_attempts
                    );
                    break;
                }
            }

            page_number += 1;
            self.settings.page_delay.pause().await;
        }

        confirmed
    }

    /// Fetches one listing page and returns its absolute company links
    ///
    /// A failed fetch yields no links. Used when confirmed pages are
    /// fetched a second time in the page fan-out.
    pub async fn fetch_page_links(&self, url: &str) -> Vec<String> {
        match self.fetcher.fetch(url).await {
            Ok(page) => {
                let links = self.resolve_links(&self.parser.company_links(&page.body));
                tracing::debug!("Found {} companies on {}", links.len(), url);
                links
            }
            Err(e) => {
                tracing::warn!("Failed to scrape {}: {}", url, e);
                Vec::new()
            }
        }
    }

    /// Tries a listing page up to `page_attempts` times
    async fn confirm_page(&self, url: &str, page_number: u32) -> Option<Vec<String>> {
        let attempts = self.settings.page_attempts.max(1);

        for attempt in 1..=attempts {
            if attempt > 1 {
                self.settings.page_retry_delay.pause().await;
            }

            match self.fetcher.fetch(url).await {
                Ok(page) => {
                    let links = self.resolve_links(&self.parser.company_links(&page.body));
                    if !links.is_empty() {
                        return Some(links);
                    }
                    tracing::warn!(
                        "No companies found on page {} attempt {}/{}",
                        page_number,
                        attempt,
                        attempts
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to scrape {} attempt {}/{}: {}",
                        url,
                        attempt,
                        attempts,
                        e
                    );
                }
            }
        }

        None
    }

    fn resolve_links(&self, links: &[String]) -> Vec<String> {
        links
            .iter()
            .filter_map(|link| match absolutize(&self.settings.base_url, link) {
                Ok(url) => Some(url.to_string()),
                Err(e) => {
                    tracing::warn!("Skipping unusable link {:?}: {}", link, e);
                    None
                }
            })
            .collect()
    }
}

fn dedup_in_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}
