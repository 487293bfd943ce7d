//! TTL-bounded, size-bounded result cache keyed by canonical query
//! fingerprints.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CacheConfig;
use crate::types::{Filter, QueryOptions, QueryResult};

static GLOBAL_CACHE: Lazy<Arc<QueryCache>> =
    Lazy::new(|| Arc::new(QueryCache::new(CacheConfig::default())));

/// The process-wide cache used by the production wiring. Tests and embedders
/// should prefer constructing an isolated [`QueryCache`] and injecting it.
pub fn global_cache() -> Arc<QueryCache> {
    GLOBAL_CACHE.clone()
}

/// A fingerprint → result map with per-table TTL and size-bounded eviction.
///
/// All mutation happens under one mutex; reads from concurrent queries and
/// writes from completing queries stay consistent.
pub struct QueryCache {
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    enabled: bool,
    entries: HashMap<String, CacheEntry>,
    default_ttl: Duration,
    table_ttl: HashMap<String, Duration>,
    max_size: usize,
    hits: u64,
    misses: u64,
    /// Monotonic insertion counter; the entry with the lowest sequence is
    /// the eviction victim.
    sequence: u64,
}

struct CacheEntry {
    result: QueryResult,
    table: String,
    inserted_at: Instant,
    ttl: Duration,
    hits: u64,
    approx_size: usize,
    sequence: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

impl QueryCache {
    /// Creates a cache from the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                enabled: config.enabled,
                entries: HashMap::new(),
                default_ttl: Duration::from_millis(config.default_ttl_ms),
                table_ttl: config
                    .per_table_ttl
                    .into_iter()
                    .map(|(table, ms)| (table, Duration::from_millis(ms)))
                    .collect(),
                max_size: config.max_size.max(1),
                hits: 0,
                misses: 0,
                sequence: 0,
            }),
        }
    }

    /// The canonical fingerprint of a fetch. Serialization through
    /// serde_json keeps map keys sorted, so value-equal inputs fingerprint
    /// identically regardless of field insertion order.
    pub fn fingerprint(table: &str, filters: &[Filter], options: &QueryOptions) -> String {
        let filters = serde_json::to_string(filters).unwrap_or_default();
        let options = serde_json::to_string(options).unwrap_or_default();
        format!("{}|{}|{}", table, filters, options)
    }

    /// Looks up a cached result. Expired entries are dropped on read and
    /// reported as misses.
    pub fn get(&self, table: &str, filters: &[Filter], options: &QueryOptions) -> Option<QueryResult> {
        let key = Self::fingerprint(table, filters, options);
        let inner = &mut *self.inner.lock();
        if !inner.enabled {
            return None;
        }
        let now = Instant::now();
        match inner.entries.get_mut(&key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.hits += 1;
                let result = entry.result.clone();
                inner.hits += 1;
                debug!(table, "cache hit");
                Some(result)
            }
            Some(_) => {
                inner.entries.remove(&key);
                inner.misses += 1;
                debug!(table, "cache entry expired");
                None
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Stores a result. When the cache is full, the oldest entry (lowest
    /// insertion sequence) is evicted first.
    pub fn set(
        &self,
        table: &str,
        filters: &[Filter],
        options: &QueryOptions,
        result: QueryResult,
    ) {
        let key = Self::fingerprint(table, filters, options);
        let approx_size = serde_json::to_string(&result).map(|s| s.len()).unwrap_or(0);
        let mut inner = self.inner.lock();
        if !inner.enabled {
            return;
        }
        if !inner.entries.contains_key(&key) && inner.entries.len() >= inner.max_size {
            if let Some(victim) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.sequence)
                .map(|(key, _)| key.clone())
            {
                debug!(key = %victim, "evicting oldest cache entry");
                inner.entries.remove(&victim);
            }
        }
        let ttl = inner
            .table_ttl
            .get(table)
            .copied()
            .unwrap_or(inner.default_ttl);
        inner.sequence += 1;
        let sequence = inner.sequence;
        inner.entries.insert(
            key,
            CacheEntry {
                result,
                table: table.to_string(),
                inserted_at: Instant::now(),
                ttl,
                hits: 0,
                approx_size,
                sequence,
            },
        );
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Drops the entries of one table.
    pub fn clear_table(&self, table: &str) {
        self.inner.lock().entries.retain(|_, entry| entry.table != table);
    }

    /// Changes the default TTL applied to tables without an override.
    pub fn set_default_ttl(&self, ttl: Duration) {
        self.inner.lock().default_ttl = ttl;
    }

    /// Overrides the TTL of one table.
    pub fn set_table_ttl(&self, table: impl Into<String>, ttl: Duration) {
        self.inner.lock().table_ttl.insert(table.into(), ttl);
    }

    /// Enables or disables the cache; disabling clears all entries
    /// atomically.
    pub fn set_enabled(&self, enabled: bool) {
        let mut inner = self.inner.lock();
        inner.enabled = enabled;
        if !enabled {
            inner.entries.clear();
        }
    }

    /// Drops expired entries eagerly.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.inner.lock().entries.retain(|_, entry| !entry.is_expired(now));
    }

    /// Aggregate and per-entry statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let now = Instant::now();
        let lookups = inner.hits + inner.misses;
        let mut entries: Vec<_> = inner
            .entries
            .values()
            .map(|entry| CacheEntryStats {
                table: entry.table.clone(),
                hits: entry.hits,
                age_ms: now.duration_since(entry.inserted_at).as_millis() as u64,
                approx_size_bytes: entry.approx_size,
            })
            .collect();
        entries.sort_by(|a, b| a.table.cmp(&b.table).then(a.age_ms.cmp(&b.age_ms)));
        CacheStats {
            enabled: inner.enabled,
            entry_count: inner.entries.len(),
            max_size: inner.max_size,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
            entries,
        }
    }
}

/// Aggregate cache statistics with a per-entry breakdown.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheStats {
    /// Whether the cache currently accepts entries.
    pub enabled: bool,
    /// Live entry count.
    pub entry_count: usize,
    /// Eviction threshold.
    pub max_size: usize,
    /// Lookup hits since construction.
    pub hits: u64,
    /// Lookup misses since construction.
    pub misses: u64,
    /// hits / (hits + misses), zero when no lookups happened.
    pub hit_rate: f64,
    /// Per-entry details, sorted by table then age.
    pub entries: Vec<CacheEntryStats>,
}

/// Statistics of one cache entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheEntryStats {
    /// The table the entry caches.
    pub table: String,
    /// Hits served by this entry.
    pub hits: u64,
    /// Age since insertion.
    pub age_ms: u64,
    /// Approximate serialized size.
    pub approx_size_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnInfo;
    use crate::types::ColumnType;
    use infraql_ast::CompareOp;
    use serde_json::json;

    fn result(marker: &str) -> QueryResult {
        let mut row = crate::types::Row::new();
        row.insert("marker".to_string(), json!(marker));
        QueryResult::new(
            vec![ColumnInfo::new("marker", ColumnType::String)],
            vec![row],
        )
    }

    fn config(max_size: usize, default_ttl_ms: u64) -> CacheConfig {
        CacheConfig {
            enabled: true,
            default_ttl_ms,
            max_size,
            per_table_ttl: HashMap::new(),
        }
    }

    fn filters(field: &str, value: serde_json::Value) -> Vec<Filter> {
        vec![Filter {
            field: field.to_string(),
            op: CompareOp::Eq,
            value,
            second_value: None,
        }]
    }

    #[test]
    fn equal_inputs_share_a_slot_and_any_change_misses() {
        let cache = QueryCache::new(config(10, 60_000));
        let options = QueryOptions {
            limit: Some(5),
            ..QueryOptions::default()
        };
        cache.set("services", &filters("env", json!("prod")), &options, result("a"));

        assert!(cache
            .get("services", &filters("env", json!("prod")), &options)
            .is_some());
        // different filter value
        assert!(cache
            .get("services", &filters("env", json!("staging")), &options)
            .is_none());
        // different table
        assert!(cache
            .get("deployments", &filters("env", json!("prod")), &options)
            .is_none());
        // different options
        assert!(cache
            .get("services", &filters("env", json!("prod")), &QueryOptions::default())
            .is_none());
    }

    #[test]
    fn expired_entries_are_dropped_on_read() {
        let cache = QueryCache::new(config(10, 0));
        cache.set("services", &[], &QueryOptions::default(), result("a"));
        assert!(cache.get("services", &[], &QueryOptions::default()).is_none());
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[test]
    fn oldest_entry_is_evicted_at_capacity() {
        let cache = QueryCache::new(config(3, 60_000));
        for table in ["t1", "t2", "t3", "t4"] {
            cache.set(table, &[], &QueryOptions::default(), result(table));
        }
        assert!(cache.get("t1", &[], &QueryOptions::default()).is_none());
        for table in ["t2", "t3", "t4"] {
            assert!(cache.get(table, &[], &QueryOptions::default()).is_some());
        }
    }

    #[test]
    fn disabling_clears_all_entries() {
        let cache = QueryCache::new(config(10, 60_000));
        cache.set("services", &[], &QueryOptions::default(), result("a"));
        cache.set_enabled(false);
        assert_eq!(cache.stats().entry_count, 0);
        assert!(cache.get("services", &[], &QueryOptions::default()).is_none());

        cache.set_enabled(true);
        cache.set("services", &[], &QueryOptions::default(), result("a"));
        assert!(cache.get("services", &[], &QueryOptions::default()).is_some());
    }

    #[test]
    fn per_table_ttl_overrides_the_default() {
        let cache = QueryCache::new(config(10, 60_000));
        cache.set_table_ttl("deployments", Duration::from_millis(0));
        cache.set("deployments", &[], &QueryOptions::default(), result("a"));
        cache.set("services", &[], &QueryOptions::default(), result("b"));
        assert!(cache.get("deployments", &[], &QueryOptions::default()).is_none());
        assert!(cache.get("services", &[], &QueryOptions::default()).is_some());
    }

    #[test]
    fn clear_table_only_drops_that_table() {
        let cache = QueryCache::new(config(10, 60_000));
        cache.set("services", &[], &QueryOptions::default(), result("a"));
        cache.set("deployments", &[], &QueryOptions::default(), result("b"));
        cache.clear_table("services");
        assert!(cache.get("services", &[], &QueryOptions::default()).is_none());
        assert!(cache.get("deployments", &[], &QueryOptions::default()).is_some());
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let cache = QueryCache::new(config(10, 60_000));
        cache.set("services", &[], &QueryOptions::default(), result("a"));
        cache.get("services", &[], &QueryOptions::default());
        cache.get("deployments", &[], &QueryOptions::default());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.entries.len(), 1);
        assert_eq!(stats.entries[0].hits, 1);
    }

    #[test]
    fn fingerprints_ignore_map_insertion_order() {
        // rows serialize through sorted maps, so two value-equal results
        // fingerprint identically; the filter list itself is ordered
        let a = QueryCache::fingerprint("t", &filters("env", json!({"b": 1, "a": 2})), &QueryOptions::default());
        let b = QueryCache::fingerprint("t", &filters("env", json!({"a": 2, "b": 1})), &QueryOptions::default());
        assert_eq!(a, b);
    }
}
