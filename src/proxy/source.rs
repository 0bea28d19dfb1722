//! Proxy listing sources
//!
//! The pool refreshes itself from a third-party JSON endpoint listing free
//! proxies. Both a bare array of `{ip, port}` objects and the geonode
//! envelope (`{"data": [...]}`) are accepted.

use crate::HarvestError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Something that can produce a fresh list of proxy endpoints
#[async_trait]
pub trait ProxySource: Send + Sync {
    /// Returns endpoints formatted as `http://ip:port`
    async fn fetch_endpoints(&self) -> Result<Vec<String>, HarvestError>;
}

/// A proxy listing served over HTTP as JSON
pub struct HttpProxySource {
    client: Client,
    url: String,
}

impl HttpProxySource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, HarvestError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ProxySource for HttpProxySource {
    async fn fetch_endpoints(&self) -> Result<Vec<String>, HarvestError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| HarvestError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::BadStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_proxy_list(&body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProxyListing {
    Envelope { data: Vec<ProxyEntry> },
    Bare(Vec<ProxyEntry>),
}

#[derive(Debug, Deserialize)]
struct ProxyEntry {
    ip: String,
    port: Port,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Port {
    Number(u16),
    Text(String),
}

impl Port {
    fn as_u16(&self) -> Option<u16> {
        match self {
            Port::Number(n) => Some(*n),
            Port::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Parses a proxy listing document into `http://ip:port` endpoints
///
/// Entries with an empty ip or an unparsable port are skipped.
pub fn parse_proxy_list(body: &str) -> Result<Vec<String>, HarvestError> {
    let listing: ProxyListing = serde_json::from_str(body)
        .map_err(|e| HarvestError::ProxySource(format!("invalid proxy listing: {}", e)))?;

    let entries = match listing {
        ProxyListing::Envelope { data } => data,
        ProxyListing::Bare(entries) => entries,
    };

    let endpoints = entries
        .iter()
        .filter_map(|entry| {
            let ip = entry.ip.trim();
            let port = entry.port.as_u16()?;
            if ip.is_empty() {
                tracing::debug!("Skipping proxy entry with empty ip");
                return None;
            }
            Some(format!("http://{}:{}", ip, port))
        })
        .collect();

    Ok(endpoints)
}
