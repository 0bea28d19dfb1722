use crate::config::types::{Config, CrawlerConfig, DelayRange, OutputConfig, ProxyConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_proxy_config(&config.proxy)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the directory site settings
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url has no host: '{}'",
            config.base_url
        )));
    }

    if config.page_param.is_empty()
        || !config
            .page_param
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "page-param must be a non-empty identifier, got '{}'",
            config.page_param
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 200 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 200, got {}",
            config.concurrency
        )));
    }

    if config.save_every < 1 {
        return Err(ConfigError::Validation(format!(
            "save-every must be >= 1, got {}",
            config.save_every
        )));
    }

    if config.fetch_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch-attempts must be >= 1, got {}",
            config.fetch_attempts
        )));
    }

    if config.page_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "page-attempts must be >= 1, got {}",
            config.page_attempts
        )));
    }

    if config.detail_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "detail-attempts must be >= 1, got {}",
            config.detail_attempts
        )));
    }

    if config.max_pages_per_batch < 1 {
        return Err(ConfigError::Validation(
            "max-pages-per-batch must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    validate_delay("fetch-retry-delay", &config.fetch_retry_delay)?;
    validate_delay("page-retry-delay", &config.page_retry_delay)?;
    validate_delay("detail-retry-delay", &config.detail_retry_delay)?;
    validate_delay("page-delay", &config.page_delay)?;
    validate_delay("batch-pause", &config.batch_pause)?;

    Ok(())
}

/// Validates proxy pool configuration
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    Url::parse(&config.source_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy source-url: {}", e)))?;

    if config.refresh_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "refresh-interval-secs must be >= 1".to_string(),
        ));
    }

    if config.source_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "source-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.eviction_threshold < 1 {
        return Err(ConfigError::Validation(
            "eviction-threshold must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-path cannot be empty".to_string(),
        ));
    }

    if config.results_path.is_empty() {
        return Err(ConfigError::Validation(
            "results-path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path == config.results_path {
        return Err(ConfigError::Validation(
            "checkpoint-path and results-path must differ".to_string(),
        ));
    }

    Ok(())
}

fn validate_delay(name: &str, range: &DelayRange) -> Result<(), ConfigError> {
    if range.min_ms > range.max_ms {
        return Err(ConfigError::Validation(format!(
            "{} min-ms ({}) exceeds max-ms ({})",
            name, range.min_ms, range.max_ms
        )));
    }
    Ok(())
}
