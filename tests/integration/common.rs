//! Shared fixtures: a scripted fetcher, directory HTML builders and configs

use async_trait::async_trait;
use dir_harvest::config::{Config, CrawlerConfig, DelayRange, OutputConfig, ProxyConfig, SiteConfig};
use dir_harvest::crawler::{FetchedPage, PageFetcher};
use dir_harvest::HarvestError;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

pub const BASE_URL: &str = "https://www.directory.test";
pub const DIRECTORY_URL: &str = "https://www.directory.test/construction_directory.aspx";

/// Serves fixed bodies per URL and records every request
///
/// URLs marked dead fail like an exhausted fetch; unknown URLs return an
/// empty page. A queued body is served once, ahead of the fixed page.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, String>,
    queued: Mutex<HashMap<String, Vec<String>>>,
    dead: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    /// Serves `body` on the next fetch of `url` only
    pub fn once(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push(body.into());
        self
    }

    pub fn dead(mut self, url: impl Into<String>) -> Self {
        self.dead.insert(url.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, HarvestError> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.dead.contains(url) {
            return Err(HarvestError::FetchExhausted {
                url: url.to_string(),
                attempts: 3,
            });
        }

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(url)
            .filter(|bodies| !bodies.is_empty())
            .map(|bodies| bodies.remove(0));

        Ok(FetchedPage {
            url: url.to_string(),
            body: queued
                .or_else(|| self.pages.get(url).cloned())
                .unwrap_or_default(),
        })
    }
}

pub fn batch_url(batch: usize) -> String {
    format!("{}/batch-{}/", BASE_URL, batch)
}

pub fn company_url(batch: usize, company: usize) -> String {
    format!("{}/batch-{}/company-{}/", BASE_URL, batch, company)
}

/// Directory root linking to `/batch-0/` .. `/batch-{count-1}/`
pub fn root_html(count: usize) -> String {
    let blocks: String = (0..count)
        .map(|i| {
            format!(
                r#"<div class="col-md-4 d-flex no-wrap align-items-center"><a href="/batch-{}/">Batch {}</a></div>"#,
                i, i
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", blocks)
}

/// Listing page with one block per company link
pub fn listing_html(links: &[String]) -> String {
    let blocks: String = links
        .iter()
        .map(|link| {
            format!(
                r#"<div class="col companyListButtons"><div class="companyListListingLink"><a href="{}">View</a></div></div>"#,
                link
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", blocks)
}

pub fn detail_html(name: &str, email: &str) -> String {
    format!(
        r#"<html><body>
            <h2 class="listingTitle"><span>{}</span></h2>
            <span id="cphMain_lblCLEmail"><a href="mailto:{}">Email</a></span>
        </body></html>"#,
        name, email
    )
}

/// A fetcher scripting `count` single-page batches of `per_batch` companies
pub fn directory(count: usize, per_batch: usize) -> ScriptedFetcher {
    let mut fetcher = ScriptedFetcher::default().page(DIRECTORY_URL, root_html(count));
    for batch in 0..count {
        let links: Vec<String> = (0..per_batch).map(|c| company_url(batch, c)).collect();
        fetcher = fetcher.page(batch_url(batch), listing_html(&links));
        for (company, link) in links.iter().enumerate() {
            fetcher = fetcher.page(
                link.clone(),
                detail_html(
                    &format!("Company {}-{}", batch, company),
                    &format!("info{}@batch{}.test", company, batch),
                ),
            );
        }
    }
    fetcher
}

/// A config with every pause disabled, writing into `dir`
pub fn test_config(dir: &Path, save_every: usize) -> Config {
    Config {
        site: SiteConfig {
            base_url: BASE_URL.to_string(),
            directory_path: "/construction_directory.aspx".to_string(),
            page_param: "pagenum".to_string(),
            user_agent: "TestHarvester/1.0".to_string(),
        },
        crawler: CrawlerConfig {
            concurrency: 4,
            save_every,
            fetch_retry_delay: DelayRange::none(),
            page_retry_delay: DelayRange::none(),
            detail_retry_delay: DelayRange::none(),
            page_delay: DelayRange::none(),
            batch_pause: DelayRange::none(),
            ..Default::default()
        },
        proxy: ProxyConfig::default(),
        output: OutputConfig {
            checkpoint_path: dir.join("checkpoint.csv").to_string_lossy().into_owned(),
            results_path: dir.join("results.csv").to_string_lossy().into_owned(),
        },
    }
}
