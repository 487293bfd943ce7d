//! Statement execution: dispatch by statement kind, with the SELECT
//! pipeline carrying all of the relational logic.

mod aggregate;
mod join;
mod select;

use std::sync::Arc;
use std::time::Instant;

use infraql_ast::{CacheAction, CacheStmt, DescribeStmt, ShowStmt, ShowTarget, Statement, TraceStmt};
use serde_json::json;
use tracing::debug;

use crate::cache::QueryCache;
use crate::config::ExecutorConfig;
use crate::error::{EngineError, EngineResult};
use crate::eval;
use crate::registry::{CatalogEntry, PluginRegistry};
use crate::types::{
    CacheResult, DescribeResult, ExecutionResult, QueryContext, ShowResult, TraceResult, Value,
};

/// Executes parsed statements against the registry, with results cached
/// through the injected cache.
///
/// The executor holds only references to the registry and the cache;
/// plugins never reach back into it.
pub struct Executor {
    registry: Arc<PluginRegistry>,
    cache: Arc<QueryCache>,
    config: ExecutorConfig,
}

impl Executor {
    /// Creates an executor over the given registry and cache.
    pub fn new(registry: Arc<PluginRegistry>, cache: Arc<QueryCache>, config: ExecutorConfig) -> Self {
        Self {
            registry,
            cache,
            config,
        }
    }

    /// The registry this executor dispatches to.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// The cache this executor records results in.
    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Executes one statement.
    pub async fn execute(
        &self,
        statement: &Statement,
        ctx: &QueryContext,
    ) -> EngineResult<ExecutionResult> {
        let started = Instant::now();
        let result = match statement {
            Statement::Select(stmt) => {
                ExecutionResult::Query(self.execute_select(stmt, ctx, started).await?)
            }
            Statement::Trace(stmt) => {
                ExecutionResult::Trace(self.execute_trace(stmt, ctx).await?)
            }
            Statement::Describe(stmt) => {
                ExecutionResult::Describe(self.execute_describe(stmt, ctx).await?)
            }
            Statement::Show(stmt) => ExecutionResult::Show(self.execute_show(stmt, ctx).await?),
            Statement::Cache(stmt) => ExecutionResult::Cache(self.execute_cache(stmt)?),
        };
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "statement executed");
        Ok(result)
    }

    /// Resolves a table in the aggregated catalogue, enforcing that table
    /// names are unique across the union of live plugins.
    fn resolve_table<'a>(
        catalog: &'a [CatalogEntry],
        table: &str,
    ) -> EngineResult<&'a CatalogEntry> {
        let mut owners = catalog.iter().filter(|entry| entry.table.name == table);
        let first = owners
            .next()
            .ok_or_else(|| EngineError::execution(format!("Unknown table '{}'", table)))?;
        if let Some(second) = owners.next() {
            return Err(EngineError::execution(format!(
                "Ambiguous table '{}' (owned by '{}' and '{}')",
                table, first.source, second.source
            )));
        }
        Ok(first)
    }

    async fn execute_trace(
        &self,
        stmt: &TraceStmt,
        ctx: &QueryContext,
    ) -> EngineResult<TraceResult> {
        let value = eval::literal_to_value(&stmt.value);
        let hops = self
            .registry
            .trace(&stmt.identifier, &value, &stmt.through, ctx)
            .await;
        let total_hops = hops.len();
        Ok(TraceResult {
            identifier: stmt.identifier.clone(),
            value,
            hops,
            total_hops,
        })
    }

    async fn execute_describe(
        &self,
        stmt: &DescribeStmt,
        ctx: &QueryContext,
    ) -> EngineResult<DescribeResult> {
        let catalog = self.registry.tables_all(ctx).await;
        let entry = Self::resolve_table(&catalog, &stmt.table)?;
        Ok(DescribeResult {
            table: entry.table.name.clone(),
            source: entry.source.clone(),
            columns: entry.table.columns.clone(),
        })
    }

    async fn execute_show(&self, stmt: &ShowStmt, ctx: &QueryContext) -> EngineResult<ShowResult> {
        let items: Vec<Value> = match stmt.what {
            ShowTarget::Tables => self
                .registry
                .tables_all(ctx)
                .await
                .into_iter()
                .map(|entry| {
                    json!({
                        "source": entry.source,
                        "table": entry.table.name,
                        "description": entry.table.description,
                        "row_count": entry.table.row_count,
                    })
                })
                .collect(),
            ShowTarget::Plugins => self
                .registry
                .health_all(ctx)
                .await
                .into_iter()
                .map(|(name, status)| {
                    json!({
                        "name": name,
                        "healthy": status.healthy,
                        "message": status.message,
                        "latency_ms": status.latency_ms,
                    })
                })
                .collect(),
            ShowTarget::Sources => self
                .registry
                .plugin_names()
                .into_iter()
                .map(Value::String)
                .collect(),
        };
        Ok(ShowResult {
            what: stmt.what,
            items,
        })
    }

    fn execute_cache(&self, stmt: &CacheStmt) -> EngineResult<CacheResult> {
        match stmt.action {
            CacheAction::Show => Ok(CacheResult {
                action: "SHOW".to_string(),
                message: None,
                stats: Some(self.cache.stats()),
            }),
            CacheAction::Clear => {
                let message = match &stmt.table {
                    Some(table) => {
                        self.cache.clear_table(table);
                        format!("Cleared cache entries for table '{}'", table)
                    }
                    None => {
                        self.cache.clear();
                        "Cache cleared".to_string()
                    }
                };
                Ok(CacheResult {
                    action: "CLEAR".to_string(),
                    message: Some(message),
                    stats: None,
                })
            }
            CacheAction::SetTtl => {
                let ttl_ms = stmt.ttl_ms.ok_or_else(|| {
                    EngineError::execution("CACHE SET TTL requires a millisecond value")
                })?;
                let ttl = std::time::Duration::from_millis(ttl_ms);
                let message = match &stmt.table {
                    Some(table) => {
                        self.cache.set_table_ttl(table.clone(), ttl);
                        format!("TTL for table '{}' set to {}ms", table, ttl_ms)
                    }
                    None => {
                        self.cache.set_default_ttl(ttl);
                        format!("Default TTL set to {}ms", ttl_ms)
                    }
                };
                Ok(CacheResult {
                    action: "SET TTL".to_string(),
                    message: Some(message),
                    stats: None,
                })
            }
        }
    }
}
