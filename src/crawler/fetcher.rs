//! Resilient HTTP fetcher
//!
//! This module handles every page request of the crawl:
//! - Drawing a random endpoint from the proxy pool per attempt
//! - Building proxied HTTP clients with the configured user agent
//! - Retrying through a different endpoint on any failure
//! - Reporting failed endpoints back to the pool

use crate::config::{Config, DelayRange};
use crate::proxy::ProxyPool;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Proxied clients kept around before the cache is reset
const CLIENT_CACHE_LIMIT: usize = 256;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: String,
    /// Page body content
    pub body: String,
}

/// Performs one logical GET and returns the page body
///
/// The crawl pipeline only talks to this trait, so it can be driven by a
/// scripted fetcher in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, HarvestError>;
}

/// Knobs of the retry loop
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub max_attempts: u32,
    pub request_timeout: Duration,
    pub retry_delay: DelayRange,
    pub empty_pool_wait: Duration,
    pub user_agent: String,
}

impl FetchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.crawler.fetch_attempts,
            request_timeout: Duration::from_secs(config.crawler.request_timeout_secs),
            retry_delay: config.crawler.fetch_retry_delay,
            empty_pool_wait: Duration::from_secs(config.proxy.empty_pool_wait_secs),
            user_agent: config.site.user_agent.clone(),
        }
    }
}

/// Fetcher that routes every attempt through a random pool endpoint
pub struct ResilientFetcher {
    pool: Arc<ProxyPool>,
    settings: FetchSettings,
    clients: Mutex<HashMap<String, Client>>,
}

impl ResilientFetcher {
    pub fn new(pool: Arc<ProxyPool>, settings: FetchSettings) -> Self {
        Self {
            pool,
            settings,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached client for `endpoint`, building it on first use
    fn client_for(&self, endpoint: &str) -> Result<Client, HarvestError> {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(client) = clients.get(endpoint) {
            return Ok(client.clone());
        }

        if clients.len() >= CLIENT_CACHE_LIMIT {
            clients.clear();
        }
        let client = build_proxied_client(endpoint, &self.settings)?;
        clients.insert(endpoint.to_string(), client.clone());
        Ok(client)
    }

    /// Draws an endpoint, waiting for a refill if the pool is empty
    async fn draw_endpoint(&self) -> Option<String> {
        match self.pool.get_random() {
            Ok(endpoint) => Some(endpoint),
            Err(_) => {
                tracing::warn!(
                    "Proxy pool is empty, waiting up to {:?} for a refresh",
                    self.settings.empty_pool_wait
                );
                if self.pool.wait_ready_for(self.settings.empty_pool_wait).await {
                    self.pool.get_random().ok()
                } else {
                    None
                }
            }
        }
    }

    /// Issues one GET through `endpoint`
    async fn attempt(&self, endpoint: &str, url: &str) -> Result<FetchedPage, HarvestError> {
        let client = self.client_for(endpoint)?;
        let transport = |source: reqwest::Error| HarvestError::Transport {
            url: url.to_string(),
            source,
        };

        let response = client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(HarvestError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        Ok(FetchedPage {
            url: url.to_string(),
            body,
        })
    }
}

#[async_trait]
impl PageFetcher for ResilientFetcher {
    /// Fetches `url`, rotating proxies on every failed attempt
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200 | Return the page |
    /// | Any other status | Report endpoint, retry with a new one |
    /// | Transport error | Report endpoint, retry with a new one |
    /// | Pool empty | Wait for a refresh; attempt fails on timeout |
    /// | Attempts used up | `FetchExhausted` |
    async fn fetch(&self, url: &str) -> Result<FetchedPage, HarvestError> {
        let attempts = self.settings.max_attempts.max(1);

        for attempt in 1..=attempts {
            if attempt > 1 {
                self.settings.retry_delay.pause().await;
            }

            let Some(endpoint) = self.draw_endpoint().await else {
                tracing::warn!("No proxy available for {} (attempt {})", url, attempt);
                continue;
            };

            match self.attempt(&endpoint, url).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    tracing::debug!(
                        "Attempt {}/{} for {} via {} failed: {}",
                        attempt,
                        attempts,
                        url,
                        endpoint,
                        e
                    );
                    self.pool.report_failure(&endpoint);
                }
            }
        }

        Err(HarvestError::FetchExhausted {
            url: url.to_string(),
            attempts,
        })
    }
}

/// Builds an HTTP client sending every request through `endpoint`
pub fn build_proxied_client(endpoint: &str, settings: &FetchSettings) -> Result<Client, HarvestError> {
    let proxy = Proxy::all(endpoint)?;

    let client = Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.request_timeout)
        .connect_timeout(Duration::from_secs(10).min(settings.request_timeout))
        .proxy(proxy)
        .gzip(true)
        .brotli(true)
        .build()?;
    Ok(client)
}
