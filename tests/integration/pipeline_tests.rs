//! End-to-end harvest runs against a scripted directory

use crate::common::*;
use dir_harvest::crawler::{ConstructionDirectoryParser, Coordinator, DirectoryParser, PageFetcher};
use dir_harvest::storage::{read_rows, CheckpointStore};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn coordinator(config: &dir_harvest::Config, fetcher: &Arc<ScriptedFetcher>) -> Coordinator {
    let fetcher: Arc<dyn PageFetcher> = fetcher.clone();
    let parser: Arc<dyn DirectoryParser> = Arc::new(ConstructionDirectoryParser::new());
    Coordinator::new(config, fetcher, parser).unwrap()
}

/// Batch URLs in the order their first listing page was requested
fn batch_order(fetcher: &ScriptedFetcher, count: usize) -> Vec<String> {
    let batches: Vec<String> = (0..count).map(batch_url).collect();
    fetcher
        .calls()
        .into_iter()
        .filter(|url| batches.contains(url))
        .fold(Vec::new(), |mut seen, url| {
            if !seen.contains(&url) {
                seen.push(url);
            }
            seen
        })
}

#[tokio::test]
async fn test_resume_skips_checkpointed_batches() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 10);

    let done: BTreeSet<String> = [0, 2, 4, 6, 8].into_iter().map(batch_url).collect();
    let checkpoint = CheckpointStore::new(&config.output.checkpoint_path);
    checkpoint.save(&done).unwrap();

    let fetcher = Arc::new(directory(12, 2));
    let summary = coordinator(&config, &fetcher).run().await.unwrap();

    assert_eq!(summary.batches_discovered, 12);
    assert_eq!(summary.batches_skipped, 5);
    assert_eq!(summary.batches_processed, 7);
    assert_eq!(summary.flushes, 1);
    assert_eq!(summary.rows_written, 14);

    let expected: Vec<String> = [1, 3, 5, 7, 9, 10, 11].into_iter().map(batch_url).collect();
    assert_eq!(batch_order(&fetcher, 12), expected);
    for batch in [0, 2, 4, 6, 8] {
        assert_eq!(fetcher.calls_to(&batch_url(batch)), 0);
    }

    let saved = checkpoint.load().unwrap();
    assert_eq!(saved.len(), 12);
    assert!((0..12).all(|b| saved.contains(&batch_url(b))));
}

#[tokio::test]
async fn test_every_company_yields_one_row() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 2);

    let fetcher = Arc::new(directory(5, 3));
    let summary = coordinator(&config, &fetcher).run().await.unwrap();

    // Two periodic flushes plus the final one
    assert_eq!(summary.flushes, 3);
    assert_eq!(summary.extracted, 15);

    let rows = read_rows(Path::new(&config.output.results_path)).unwrap();
    assert_eq!(rows.len(), 15);

    let sources: BTreeSet<String> = rows.iter().map(|r| r.source_url.clone()).collect();
    let expected: BTreeSet<String> = (0..5)
        .flat_map(|b| (0..3).map(move |c| company_url(b, c)))
        .collect();
    assert_eq!(sources, expected);

    let acme = rows
        .iter()
        .find(|r| r.source_url == company_url(3, 1))
        .unwrap();
    assert_eq!(acme.name, "Company 3-1");
    assert_eq!(acme.email, "info1@batch3.test");

    let raw = std::fs::read_to_string(&config.output.results_path).unwrap();
    assert_eq!(raw.matches("Company Name,Email,Source URL").count(), 1);
}

#[tokio::test]
async fn test_unreachable_and_empty_details() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 10);

    let fetcher = Arc::new(
        directory(1, 3)
            .dead(company_url(0, 1))
            .page(company_url(0, 2), "<html><body><p>Listing removed</p></body></html>"),
    );
    let summary = coordinator(&config, &fetcher).run().await.unwrap();

    assert_eq!(summary.extracted, 1);
    assert_eq!(summary.unreachable, 1);
    assert_eq!(summary.empty, 1);
    // The empty page is tried once per detail attempt before it counts
    assert_eq!(fetcher.calls_to(&company_url(0, 2)), 3);
    assert_eq!(fetcher.calls_to(&company_url(0, 1)), 1);

    let rows = read_rows(Path::new(&config.output.results_path)).unwrap();
    assert_eq!(rows.len(), 3);

    let dead = rows.iter().find(|r| r.source_url == company_url(0, 1)).unwrap();
    assert_eq!((dead.name.as_str(), dead.email.as_str()), ("Dead Link", "Dead Link"));

    let empty = rows.iter().find(|r| r.source_url == company_url(0, 2)).unwrap();
    assert_eq!((empty.name.as_str(), empty.email.as_str()), ("N/A", "N/A"));
}

#[tokio::test]
async fn test_interstitial_detail_page_is_retried() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 10);

    let interstitial = "<html><body><p>Press the button to continue</p></body></html>";
    let fetcher = Arc::new(directory(1, 1).once(company_url(0, 0), interstitial));
    let summary = coordinator(&config, &fetcher).run().await.unwrap();

    assert_eq!(summary.extracted, 1);
    assert_eq!(summary.empty, 0);
    assert_eq!(fetcher.calls_to(&company_url(0, 0)), 2);

    let rows = read_rows(Path::new(&config.output.results_path)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Company 0-0");
    assert_eq!(rows[0].email, "info0@batch0.test");
}

#[tokio::test]
async fn test_multi_page_batch() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 10);

    let page2 = format!("{}?pagenum=2", batch_url(0));
    let page3 = format!("{}?pagenum=3", batch_url(0));
    let extra = format!("{}/extra-company/", BASE_URL);

    let fetcher = Arc::new(
        directory(1, 2)
            .page(page2.clone(), listing_html(&["/extra-company/".to_string()]))
            .page(extra.clone(), detail_html("Extra Ltd", "extra@company.test")),
    );
    let summary = coordinator(&config, &fetcher).run().await.unwrap();

    assert_eq!(summary.extracted, 3);
    assert_eq!(fetcher.calls_to(&page2), 1);
    // The empty third page is tried once per page attempt
    assert_eq!(fetcher.calls_to(&page3), 3);
    assert_eq!(fetcher.calls_to(&extra), 1);
}

#[tokio::test]
async fn test_listing_pages_fetched_once_by_default() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 10);

    let fetcher = Arc::new(directory(2, 2));
    coordinator(&config, &fetcher).run().await.unwrap();

    assert_eq!(fetcher.calls_to(&batch_url(0)), 1);
    assert_eq!(fetcher.calls_to(&batch_url(1)), 1);
}

#[tokio::test]
async fn test_refetch_listing_pages() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), 10);
    config.crawler.refetch_listing_pages = true;

    let fetcher = Arc::new(directory(2, 2));
    let summary = coordinator(&config, &fetcher).run().await.unwrap();

    assert_eq!(summary.extracted, 4);
    assert_eq!(fetcher.calls_to(&batch_url(0)), 2);
    assert_eq!(fetcher.calls_to(&batch_url(1)), 2);
}

#[tokio::test]
async fn test_unreachable_root_aborts_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 10);

    let fetcher = Arc::new(directory(3, 1).dead(DIRECTORY_URL));
    let result = coordinator(&config, &fetcher).run().await;

    assert!(result.is_err());
    assert!(!Path::new(&config.output.results_path).exists());
    assert!(!Path::new(&config.output.checkpoint_path).exists());
}

#[tokio::test]
async fn test_second_run_finds_nothing_pending() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 10);

    let fetcher = Arc::new(directory(3, 1));
    coordinator(&config, &fetcher).run().await.unwrap();

    let again = Arc::new(directory(3, 1));
    let summary = coordinator(&config, &again).run().await.unwrap();

    assert_eq!(summary.batches_skipped, 3);
    assert_eq!(summary.batches_processed, 0);
    assert_eq!(again.calls(), vec![DIRECTORY_URL.to_string()]);

    let rows = read_rows(Path::new(&config.output.results_path)).unwrap();
    assert_eq!(rows.len(), 3);
}
