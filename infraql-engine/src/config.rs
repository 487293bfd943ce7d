use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Engine configuration consumed by the core; everything plugin-specific
/// passes through the registry opaquely as the plugin's own config value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Result-cache settings.
    pub cache: CacheConfig,
    /// Executor settings.
    pub executor: ExecutorConfig,
}

/// Result-cache settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether caching is enabled at all.
    pub enabled: bool,
    /// Default time-to-live of a cache entry, in milliseconds.
    pub default_ttl_ms: u64,
    /// Maximum number of entries before the oldest is evicted.
    pub max_size: usize,
    /// Per-table TTL overrides, in milliseconds. Fast-churn tables want
    /// shorter values than slow instance catalogues.
    pub per_table_ttl: HashMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_ms: 5 * 60 * 1000,
            max_size: 100,
            per_table_ttl: HashMap::new(),
        }
    }
}

/// Executor settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Cap on rows returned when the caller omits `LIMIT`.
    pub default_max_results: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_max_results: 10_000,
        }
    }
}
