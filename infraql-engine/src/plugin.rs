//! The narrow capability surface every data source implements.

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::types::{Filter, HealthStatus, QueryOptions, QueryResult, TableInfo, TraceHop, Value};

/// A data-source plugin: a black box owning some tables.
///
/// `filters` is the pushdown subset of the WHERE clause; a source may honour
/// any subset of it (re-applying what it honours itself), because the
/// executor re-runs the full predicate post-fetch. All I/O points are async
/// and are raced against the caller's cancellation signal by the registry,
/// so implementations release their resources simply by being dropped.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The unique name this source registers under.
    fn name(&self) -> &str;

    /// Called exactly once at registration, with the plugin's opaque
    /// configuration value.
    async fn initialize(&self, config: &Value) -> EngineResult<()> {
        let _ = config;
        Ok(())
    }

    /// The tables this source owns.
    async fn tables(&self) -> EngineResult<Vec<TableInfo>>;

    /// Fetches rows of one table, honouring whatever subset of `filters`
    /// and `options` the source supports.
    async fn query(
        &self,
        table: &str,
        filters: &[Filter],
        options: &QueryOptions,
    ) -> EngineResult<QueryResult>;

    /// Follows an identifier through this source. `Ok(None)` means the
    /// source does not support tracing and is skipped by the fan-out.
    async fn trace(&self, identifier: &str, value: &Value) -> EngineResult<Option<Vec<TraceHop>>> {
        let _ = (identifier, value);
        Ok(None)
    }

    /// Reports whether the source is usable.
    async fn health_check(&self) -> EngineResult<HealthStatus> {
        Ok(HealthStatus::healthy())
    }

    /// Releases resources at unregistration; failures are logged, never
    /// re-raised.
    async fn cleanup(&self) -> EngineResult<()> {
        Ok(())
    }
}
