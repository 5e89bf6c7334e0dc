//! Configuration structures for the cache cascade.
//!
//! Loaded via `toml::from_str` over a file read with
//! `std::fs::read_to_string`, with `serde(default = ...)` on every tunable
//! so a partial file is still valid (see DESIGN.md for why the `config`
//! crate isn't used here).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Bloom filter sizing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloomConfig {
    #[serde(default = "default_bloom_estimated_items")]
    pub estimated_items: u64,
    #[serde(default = "default_bloom_false_positive_rate")]
    pub false_positive_rate: f64,
    #[serde(default = "default_bloom_slots")]
    pub slots: usize,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            estimated_items: default_bloom_estimated_items(),
            false_positive_rate: default_bloom_false_positive_rate(),
            slots: default_bloom_slots(),
        }
    }
}

fn default_bloom_estimated_items() -> u64 {
    1_000_000
}
fn default_bloom_false_positive_rate() -> f64 {
    0.01
}
fn default_bloom_slots() -> usize {
    4
}

/// Top-level cascade configuration: provider order, upload queue budget,
/// coalescing behavior, and bloom sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Providers are registered in this order; it is also the fetch probe
    /// order.
    #[serde(default)]
    pub provider_order: Vec<String>,
    #[serde(default = "default_max_upload_queue_bytes")]
    pub max_upload_queue_bytes: u64,
    #[serde(default = "default_enable_request_coalescing")]
    pub enable_request_coalescing: bool,
    #[serde(
        default = "default_coalescing_timeout_ms",
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub coalescing_timeout: Option<std::time::Duration>,
    #[serde(default)]
    pub coalescing_timeout_ms: Option<u64>,
    #[serde(default)]
    pub bloom: BloomConfig,
}

fn default_max_upload_queue_bytes() -> u64 {
    256 * 1024 * 1024
}
fn default_enable_request_coalescing() -> bool {
    true
}
fn default_coalescing_timeout_ms() -> Option<std::time::Duration> {
    None
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            provider_order: Vec::new(),
            max_upload_queue_bytes: default_max_upload_queue_bytes(),
            enable_request_coalescing: default_enable_request_coalescing(),
            coalescing_timeout: None,
            coalescing_timeout_ms: Some(1000),
            bloom: BloomConfig::default(),
        }
    }
}

impl CascadeConfig {
    /// Resolves the effective coalescing timeout in milliseconds, honoring
    /// either the humantime `coalescing_timeout` field (e.g. `"2s"`) used
    /// by hand-written config files or the plain-integer
    /// `coalescing_timeout_ms` field used by generated ones.
    pub fn coalescing_timeout_ms(&self) -> u64 {
        if let Some(d) = self.coalescing_timeout {
            return d.as_millis() as u64;
        }
        self.coalescing_timeout_ms.unwrap_or(1000)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from '{path}'"))?;
        Ok(config)
    }
}

/// Syntax-version and routing-level knobs, kept separate from the cascade
/// config so a routing-only embedder does not need to depend on cache
/// tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Supported syntax version range, inclusive. The engine currently
    /// only ships `v1`; kept configurable so a future version bump is a
    /// data change, not a code change.
    #[serde(default = "default_min_syntax_version")]
    pub min_syntax_version: u32,
    #[serde(default = "default_max_syntax_version")]
    pub max_syntax_version: u32,
}

fn default_min_syntax_version() -> u32 {
    1
}
fn default_max_syntax_version() -> u32 {
    1
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            min_syntax_version: default_min_syntax_version(),
            max_syntax_version: default_max_syntax_version(),
        }
    }
}
