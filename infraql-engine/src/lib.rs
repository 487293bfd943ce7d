//! # infraql-engine
//!
//! infraql-engine executes parsed statements against registered data-source
//! plugins: it resolves tables through the plugin registry, pushes the
//! filterable prefix of the predicate down to the owning source, applies the
//! relational operators in-process, and caches eligible results.

#![deny(missing_docs)]
#![deny(unused_imports)]

mod cache;
mod config;
mod error;
mod eval;
mod executor;
mod mock;
mod plugin;
mod registry;
mod retry;
mod types;

pub use self::{
    cache::{global_cache, CacheEntryStats, CacheStats, QueryCache},
    config::{CacheConfig, EngineConfig, ExecutorConfig},
    error::{EngineError, EngineResult},
    executor::Executor,
    mock::MockSource,
    plugin::DataSource,
    registry::{CatalogEntry, PluginRegistry},
    retry::{retry_with_backoff, RetryPolicy},
    types::{
        CacheResult, ColumnInfo, ColumnType, DescribeResult, ExecutionResult, Filter,
        HealthStatus, OrderSpec, QueryContext, QueryOptions, QueryResult, Row, ShowResult,
        TableInfo, TraceHop, TraceResult, Value,
    },
};
