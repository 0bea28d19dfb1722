//! Outbound proxy management
//!
//! This module contains:
//! - The shared proxy pool with failure-based eviction
//! - The background refresh task
//! - Proxy listing sources

mod pool;
mod source;

pub use pool::{PoolSnapshot, ProxyPool, DEFAULT_EVICTION_THRESHOLD};
pub use source::{parse_proxy_list, HttpProxySource, ProxySource};
