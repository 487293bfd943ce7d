//! Plugin lifecycle, lookup and fan-out dispatch.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::plugin::DataSource;
use crate::types::{
    Filter, HealthStatus, QueryContext, QueryOptions, QueryResult, TableInfo, TraceHop, Value,
};

/// One table of the aggregated catalogue, annotated with its owning source.
///
/// The entry carries the source name rather than a plugin handle; dispatch
/// re-looks the plugin up by name.
#[derive(Clone, Debug)]
pub struct CatalogEntry {
    /// The owning source.
    pub source: String,
    /// The table it exposes.
    pub table: TableInfo,
}

/// Registry of data-source plugins: lifecycle, lookup, and parallel
/// fan-out over all live sources.
///
/// The maps tolerate concurrent reads from catalogue aggregation while a
/// query executes; writes happen at process startup/shutdown and are
/// serialized by the locks.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, Arc<dyn DataSource>>>,
    initialized: RwLock<HashSet<String>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin and initializes it exactly once. A duplicate name
    /// is rejected; an initialization failure removes the entry again and
    /// propagates with its cause preserved.
    pub async fn register(
        &self,
        plugin: Arc<dyn DataSource>,
        config: &Value,
    ) -> EngineResult<()> {
        let name = plugin.name().to_string();
        {
            let mut plugins = self.plugins.write();
            if plugins.contains_key(&name) {
                return Err(EngineError::plugin(
                    &name,
                    "Registration failed",
                    "a plugin with this name is already registered",
                ));
            }
            plugins.insert(name.clone(), plugin.clone());
        }
        match plugin.initialize(config).await {
            Ok(()) => {
                self.initialized.write().insert(name.clone());
                debug!(plugin = %name, "plugin registered");
                Ok(())
            }
            Err(cause) => {
                self.plugins.write().remove(&name);
                Err(EngineError::plugin_call(
                    &name,
                    "Initialization failed",
                    cause,
                ))
            }
        }
    }

    /// Removes a plugin, invoking its `cleanup` best-effort first.
    pub async fn unregister(&self, name: &str) {
        let plugin = self.plugins.write().remove(name);
        self.initialized.write().remove(name);
        if let Some(plugin) = plugin {
            if let Err(err) = plugin.cleanup().await {
                warn!(plugin = %name, error = %err, "plugin cleanup failed");
            }
        }
    }

    /// The names of all registered plugins, sorted.
    pub fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.plugins.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn get(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        self.plugins.read().get(name).cloned()
    }

    fn initialized_plugins(&self) -> Vec<(String, Arc<dyn DataSource>)> {
        let initialized = self.initialized.read();
        self.plugins
            .read()
            .iter()
            .filter(|(name, _)| initialized.contains(*name))
            .map(|(name, plugin)| (name.clone(), plugin.clone()))
            .collect()
    }

    /// Aggregates the catalogues of every initialized plugin concurrently.
    /// A failing plugin is logged and omitted; the listing is sorted by
    /// (source, table) to be deterministic despite the concurrent fan-out.
    pub async fn tables_all(&self, ctx: &QueryContext) -> Vec<CatalogEntry> {
        let plugins = self.initialized_plugins();
        let fetches = plugins.iter().map(|(name, plugin)| async move {
            let result = self
                .guarded(name, "Table listing failed", ctx, plugin.tables())
                .await;
            (name, result)
        });
        let mut entries = Vec::new();
        for (name, result) in join_all(fetches).await {
            match result {
                Ok(tables) => entries.extend(tables.into_iter().map(|table| CatalogEntry {
                    source: name.clone(),
                    table,
                })),
                Err(err) => warn!(plugin = %name, error = %err, "omitting plugin from catalogue"),
            }
        }
        entries.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| a.table.name.cmp(&b.table.name))
        });
        entries
    }

    /// Dispatches one table fetch to the named plugin.
    pub async fn query(
        &self,
        source: &str,
        table: &str,
        filters: &[Filter],
        options: &QueryOptions,
        ctx: &QueryContext,
    ) -> EngineResult<QueryResult> {
        let plugin = self
            .get(source)
            .ok_or_else(|| EngineError::execution(format!("Unknown source '{}'", source)))?;
        self.guarded(source, "Query failed", ctx, plugin.query(table, filters, options))
            .await
    }

    /// Follows an identifier through the named sources in parallel. Sources
    /// that fail, or do not implement tracing, are logged and skipped. The
    /// merged hops are sorted ascending by their parsed timestamp, falling
    /// back to byte order for unparsable ones.
    pub async fn trace(
        &self,
        identifier: &str,
        value: &Value,
        sources: &[String],
        ctx: &QueryContext,
    ) -> Vec<TraceHop> {
        let plugins: Vec<_> = sources
            .iter()
            .filter_map(|name| match self.get(name) {
                Some(plugin) => Some((name.clone(), plugin)),
                None => {
                    warn!(source = %name, "skipping unknown trace source");
                    None
                }
            })
            .collect();
        let fetches = plugins.iter().map(|(name, plugin)| async move {
            let result = self
                .guarded(name, "Trace failed", ctx, plugin.trace(identifier, value))
                .await;
            (name, result)
        });

        let mut hops = Vec::new();
        for (name, result) in join_all(fetches).await {
            match result {
                Ok(Some(source_hops)) => hops.extend(source_hops),
                Ok(None) => debug!(source = %name, "source does not implement trace"),
                Err(err) => warn!(source = %name, error = %err, "omitting source from trace"),
            }
        }
        hops.sort_by_cached_key(|hop| {
            let instant = DateTime::parse_from_rfc3339(&hop.timestamp)
                .ok()
                .map(|dt| dt.with_timezone(&Utc));
            (instant, hop.timestamp.clone())
        });
        hops
    }

    /// Probes every initialized plugin concurrently. Failures and timeouts
    /// downgrade to `healthy = false` with the error message.
    pub async fn health_all(&self, ctx: &QueryContext) -> Vec<(String, HealthStatus)> {
        let plugins = self.initialized_plugins();
        let probes = plugins.iter().map(|(name, plugin)| async move {
            let started = Instant::now();
            let result = self
                .guarded(name, "Health check failed", ctx, plugin.health_check())
                .await;
            let latency_ms = started.elapsed().as_millis() as u64;
            let status = match result {
                Ok(mut status) => {
                    status.latency_ms.get_or_insert(latency_ms);
                    status
                }
                Err(err) => HealthStatus {
                    healthy: false,
                    message: Some(err.to_string()),
                    latency_ms: Some(latency_ms),
                },
            };
            (name.clone(), status)
        });
        let mut statuses = join_all(probes).await;
        statuses.sort_by(|a, b| a.0.cmp(&b.0));
        statuses
    }

    /// Drains every plugin's `cleanup` at process shutdown.
    pub async fn shutdown(&self) {
        let names = self.plugin_names();
        for name in names {
            self.unregister(&name).await;
        }
    }

    /// Races a plugin call against the caller's cancellation signal and the
    /// per-call timeout, and wraps failures as plugin-kind errors with the
    /// cause preserved.
    async fn guarded<T>(
        &self,
        plugin: &str,
        operation: &str,
        ctx: &QueryContext,
        call: impl Future<Output = EngineResult<T>>,
    ) -> EngineResult<T> {
        let bounded = async {
            match ctx.timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(EngineError::Cancelled {
                        plugin: plugin.to_string(),
                        operation: operation.to_string(),
                        message: format!("timed out after {}ms", limit.as_millis()),
                    }),
                },
                None => call.await,
            }
        };
        let result = tokio::select! {
            biased;
            _ = ctx.cancellation.cancelled() => Err(EngineError::Cancelled {
                plugin: plugin.to_string(),
                operation: operation.to_string(),
                message: "cancelled by caller".to_string(),
            }),
            result = bounded => result,
        };
        result.map_err(|err| match err {
            err @ EngineError::Cancelled { .. } => err,
            err @ EngineError::Plugin { .. } => err,
            cause => EngineError::plugin_call(plugin, operation, cause),
        })
    }
}
