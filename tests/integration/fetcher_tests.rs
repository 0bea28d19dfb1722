//! Proxied fetches through a mock server acting as the HTTP proxy
//!
//! For a plain-http target reqwest sends the absolute URL to the proxy, so
//! the mock server sees the target path and can answer for it.

use dir_harvest::config::DelayRange;
use dir_harvest::crawler::{FetchSettings, PageFetcher, ResilientFetcher};
use dir_harvest::{HarvestError, ProxyPool};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Nothing listens on port 1, so connections fail fast
const DEAD_PROXY: &str = "http://127.0.0.1:1";

fn settings(max_attempts: u32) -> FetchSettings {
    FetchSettings {
        max_attempts,
        request_timeout: Duration::from_secs(5),
        retry_delay: DelayRange::none(),
        empty_pool_wait: Duration::from_millis(50),
        user_agent: "TestHarvester/1.0".to_string(),
    }
}

#[tokio::test]
async fn test_fetch_through_proxy() {
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/construction_directory.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>root</html>"))
        .expect(1)
        .mount(&proxy)
        .await;

    let pool = Arc::new(ProxyPool::with_endpoints(3, [proxy.uri()]));
    let fetcher = ResilientFetcher::new(pool.clone(), settings(3));

    let page = fetcher
        .fetch("http://directory.test/construction_directory.aspx")
        .await
        .unwrap();

    assert_eq!(page.body, "<html>root</html>");
    assert_eq!(pool.failure_count(&proxy.uri()), 0);
}

#[tokio::test]
async fn test_rotates_past_dead_proxy() {
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listing/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&proxy)
        .await;

    // Threshold 1: a dead endpoint is gone after its first failure, so the
    // second draw can only land on the live one.
    let pool = Arc::new(ProxyPool::with_endpoints(
        1,
        [DEAD_PROXY.to_string(), proxy.uri()],
    ));
    let fetcher = ResilientFetcher::new(pool.clone(), settings(2));

    let page = fetcher.fetch("http://directory.test/listing/").await.unwrap();

    assert_eq!(page.body, "ok");
    assert!(pool.snapshot().active.contains(&proxy.uri()));
}

#[tokio::test]
async fn test_bad_status_evicts_and_exhausts() {
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&proxy)
        .await;

    let pool = Arc::new(ProxyPool::with_endpoints(3, [proxy.uri()]));
    let fetcher = ResilientFetcher::new(pool.clone(), settings(3));

    let result = fetcher.fetch("http://directory.test/company/1/").await;

    assert!(matches!(
        result,
        Err(HarvestError::FetchExhausted { attempts: 3, .. })
    ));
    assert!(pool.is_empty());
}

#[tokio::test]
async fn test_non_200_success_is_a_failure() {
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&proxy)
        .await;

    let pool = Arc::new(ProxyPool::with_endpoints(3, [proxy.uri()]));
    let fetcher = ResilientFetcher::new(pool.clone(), settings(1));

    assert!(fetcher.fetch("http://directory.test/").await.is_err());
    assert_eq!(pool.failure_count(&proxy.uri()), 1);
}

#[tokio::test]
async fn test_empty_pool_waits_for_refill() {
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("late"))
        .mount(&proxy)
        .await;

    let pool = Arc::new(ProxyPool::new(3));
    let mut settings = settings(1);
    settings.empty_pool_wait = Duration::from_secs(5);
    let fetcher = ResilientFetcher::new(pool.clone(), settings);

    let refill = {
        let pool = pool.clone();
        let endpoint = proxy.uri();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            pool.replace(vec![endpoint]);
        })
    };

    let page = fetcher.fetch("http://directory.test/").await.unwrap();
    assert_eq!(page.body, "late");
    refill.await.unwrap();
}
