//! # infraql
//!
//! infraql is a read-only, SQL-like query engine over heterogeneous
//! infrastructure data sources. Query text is lexed and parsed into a
//! statement tree, the leaf fetches fan out to the owning data-source
//! plugins, and the relational operators (projection, selection, join,
//! grouping, aggregation, ordering, pagination) run in-process. Alongside
//! `SELECT` there are `TRACE` (follow an identifier across sources),
//! `DESCRIBE`, `SHOW` and cache-control statements.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use infraql::{Engine, EngineConfig, MockSource};
//!
//! # async fn demo() -> infraql::EngineResult<()> {
//! let engine = Engine::new(EngineConfig::default());
//! engine
//!     .register(Arc::new(MockSource::new()), &serde_json::json!({}))
//!     .await?;
//! let result = engine
//!     .execute("SELECT name, status FROM services WHERE environment = 'production'")
//!     .await?;
//! println!("{:?}", result);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(unused_imports)]

use std::sync::Arc;

pub use infraql_ast::*;
pub use infraql_core::{Keyword, Location, Token, TokenKind};
pub use infraql_engine::{
    global_cache, retry_with_backoff, CacheConfig, CacheResult, CacheStats, CatalogEntry,
    ColumnInfo, ColumnType, DataSource, DescribeResult, EngineConfig, EngineError, EngineResult,
    ExecutionResult, Executor, ExecutorConfig, Filter, HealthStatus, MockSource, OrderSpec,
    PluginRegistry, QueryCache, QueryContext, QueryOptions, QueryResult, RetryPolicy, Row,
    ShowResult, TableInfo, TraceHop, TraceResult, Value,
};
pub use infraql_lexer::{Lexer, LexerError};
pub use infraql_parser::{parse, Parser, ParserError};

/// The assembled engine: registry, cache and executor wired from one
/// configuration value.
pub struct Engine {
    registry: Arc<PluginRegistry>,
    cache: Arc<QueryCache>,
    executor: Executor,
}

impl Engine {
    /// Creates an engine with its own registry and an isolated cache.
    pub fn new(config: EngineConfig) -> Self {
        let registry = Arc::new(PluginRegistry::new());
        let cache = Arc::new(QueryCache::new(config.cache));
        Self::with_parts(registry, cache, config.executor)
    }

    /// Creates an engine over existing parts, e.g. the process-global cache
    /// from [`global_cache`].
    pub fn with_parts(
        registry: Arc<PluginRegistry>,
        cache: Arc<QueryCache>,
        config: ExecutorConfig,
    ) -> Self {
        let executor = Executor::new(registry.clone(), cache.clone(), config);
        Self {
            registry,
            cache,
            executor,
        }
    }

    /// The plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// The result cache.
    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Registers and initializes a data source.
    pub async fn register(
        &self,
        plugin: Arc<dyn DataSource>,
        config: &Value,
    ) -> EngineResult<()> {
        self.registry.register(plugin, config).await
    }

    /// Parses and executes one statement with a default context. Callers
    /// split multi-statement input on `;` boundaries first.
    pub async fn execute(&self, text: &str) -> EngineResult<ExecutionResult> {
        self.execute_with(text, &QueryContext::default()).await
    }

    /// Parses and executes one statement with the given cancellation and
    /// timeout context.
    pub async fn execute_with(
        &self,
        text: &str,
        ctx: &QueryContext,
    ) -> EngineResult<ExecutionResult> {
        let statement = parse(text)?;
        self.executor.execute(&statement, ctx).await
    }

    /// Unregisters every plugin, draining their cleanup hooks.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}
