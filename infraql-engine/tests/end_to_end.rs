//! End-to-end scenarios against the registered mock source.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use infraql_engine::{
    CacheConfig, DataSource, EngineResult, ExecutionResult, Executor, ExecutorConfig, Filter,
    MockSource, PluginRegistry, QueryCache, QueryContext, QueryOptions, QueryResult, Row,
    TableInfo, Value,
};

/// A source that returns every row regardless of pushdown, to check that
/// the executor's post-fetch re-evaluation keeps results identical.
struct OpaqueSource {
    table: String,
}

#[async_trait]
impl DataSource for OpaqueSource {
    fn name(&self) -> &str {
        "opaque"
    }

    async fn tables(&self) -> EngineResult<Vec<TableInfo>> {
        Ok(vec![TableInfo {
            name: self.table.clone(),
            description: None,
            columns: vec![],
            row_count: None,
        }])
    }

    async fn query(
        &self,
        _table: &str,
        _filters: &[Filter],
        _options: &QueryOptions,
    ) -> EngineResult<QueryResult> {
        let rows = MockSource::new()
            .query("services", &[], &QueryOptions::default())
            .await?
            .rows;
        Ok(QueryResult::new(vec![], rows))
    }
}

/// A wide synthetic table for exercising the truncation cap.
struct BigSource {
    rows: usize,
}

#[async_trait]
impl DataSource for BigSource {
    fn name(&self) -> &str {
        "big"
    }

    async fn tables(&self) -> EngineResult<Vec<TableInfo>> {
        Ok(vec![TableInfo {
            name: "events".to_string(),
            description: None,
            columns: vec![],
            row_count: Some(self.rows as u64),
        }])
    }

    async fn query(
        &self,
        _table: &str,
        _filters: &[Filter],
        _options: &QueryOptions,
    ) -> EngineResult<QueryResult> {
        let rows = (0..self.rows)
            .map(|seq| {
                let mut row = Row::new();
                row.insert("seq".to_string(), json!(seq));
                row
            })
            .collect();
        Ok(QueryResult::new(vec![], rows))
    }
}

async fn executor() -> Executor {
    let registry = Arc::new(PluginRegistry::new());
    registry
        .register(Arc::new(MockSource::new()), &json!({}))
        .await
        .unwrap();
    let cache = Arc::new(QueryCache::new(CacheConfig::default()));
    Executor::new(registry, cache, ExecutorConfig::default())
}

async fn run(executor: &Executor, text: &str) -> ExecutionResult {
    let statement = infraql_parser::parse(text).unwrap();
    executor
        .execute(&statement, &QueryContext::default())
        .await
        .unwrap()
}

async fn query(executor: &Executor, text: &str) -> QueryResult {
    run(executor, text).await.into_query().unwrap()
}

fn names(result: &QueryResult) -> Vec<String> {
    result
        .rows
        .iter()
        .map(|row| row["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn select_star_returns_all_services() {
    let executor = executor().await;
    let result = query(&executor, "SELECT * FROM services").await;
    assert_eq!(result.row_count, 3);
    assert_eq!(result.source.as_deref(), Some("mock"));
    let columns: Vec<_> = result.columns.iter().map(|c| c.name.as_str()).collect();
    for expected in [
        "id",
        "name",
        "environment",
        "version",
        "status",
        "cpu_usage",
        "memory_usage",
    ] {
        assert!(columns.contains(&expected), "missing column {}", expected);
    }
}

#[tokio::test]
async fn projection_and_where_narrow_the_result() {
    let executor = executor().await;
    let result = query(
        &executor,
        "SELECT name, status FROM services WHERE environment = 'production'",
    )
    .await;
    assert_eq!(result.row_count, 2);
    for row in &result.rows {
        assert_eq!(row.keys().collect::<Vec<_>>(), ["name", "status"]);
        let name = row["name"].as_str().unwrap();
        assert!(name == "api-gateway" || name == "auth-service");
    }
}

#[tokio::test]
async fn order_by_sorts_ascending() {
    let executor = executor().await;
    let result = query(&executor, "SELECT name FROM services ORDER BY name ASC").await;
    assert_eq!(names(&result), ["api-gateway", "auth-service", "data-processor"]);
}

#[tokio::test]
async fn order_by_is_stable_for_equal_keys() {
    let executor = executor().await;
    let result = query(
        &executor,
        "SELECT name, environment FROM services ORDER BY environment ASC",
    )
    .await;
    // both production rows keep their pre-sort relative order
    assert_eq!(names(&result), ["api-gateway", "auth-service", "data-processor"]);
}

#[tokio::test]
async fn count_star_counts_rows() {
    let executor = executor().await;
    let result = query(&executor, "SELECT COUNT(*) AS total FROM services").await;
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0]["total"], json!(3));
}

#[tokio::test]
async fn group_by_with_count() {
    let executor = executor().await;
    let result = query(
        &executor,
        "SELECT status, COUNT(*) AS count FROM services GROUP BY status",
    )
    .await;
    assert_eq!(result.row_count, 2);
    let mut by_status: Vec<_> = result
        .rows
        .iter()
        .map(|row| (row["status"].as_str().unwrap(), row["count"].as_i64().unwrap()))
        .collect();
    by_status.sort();
    assert_eq!(by_status, [("active", 2), ("degraded", 1)]);
}

#[tokio::test]
async fn sum_over_deployment_replicas() {
    let executor = executor().await;
    let result = query(&executor, "SELECT SUM(replicas) AS s FROM deployments").await;
    assert_eq!(result.rows, vec![Row::from([("s".to_string(), json!(6))])]);
}

#[tokio::test]
async fn aggregate_laws_hold_across_partitions() {
    let executor = executor().await;
    let total = query(&executor, "SELECT SUM(replicas) AS s FROM deployments").await;
    let succeeded = query(
        &executor,
        "SELECT SUM(replicas) AS s FROM deployments WHERE status = 'succeeded'",
    )
    .await;
    let failed = query(
        &executor,
        "SELECT SUM(replicas) AS s FROM deployments WHERE status != 'succeeded'",
    )
    .await;
    let sum = |r: &QueryResult| r.rows[0]["s"].as_i64().unwrap();
    assert_eq!(sum(&total), sum(&succeeded) + sum(&failed));

    let avg = query(&executor, "SELECT AVG(replicas) AS a FROM deployments").await;
    let count = query(&executor, "SELECT COUNT(replicas) AS n FROM deployments").await;
    let expected = sum(&total) as f64 / count.rows[0]["n"].as_i64().unwrap() as f64;
    assert!((avg.rows[0]["a"].as_f64().unwrap() - expected).abs() < 1e-9);
}

#[tokio::test]
async fn inner_join_pairs_matching_keys() {
    let executor = executor().await;
    let result = query(
        &executor,
        "SELECT * FROM services INNER JOIN deployments ON services.id = deployments.service_id",
    )
    .await;
    assert_eq!(result.row_count, 3);
    for row in &result.rows {
        assert_eq!(row["services.id"], row["deployments.service_id"]);
    }
}

#[tokio::test]
async fn left_join_null_pads_missing_incidents() {
    let executor = executor().await;
    let result = query(
        &executor,
        "SELECT * FROM services LEFT JOIN incidents ON services.id = incidents.service_id",
    )
    .await;
    // every left row survives
    assert!(result.row_count >= 3);
    let unmatched = result
        .rows
        .iter()
        .find(|row| row["services.id"] == json!("svc-2"))
        .unwrap();
    assert_eq!(unmatched["incidents.id"], Value::Null);
}

#[tokio::test]
async fn limit_and_offset_paginate() {
    let executor = executor().await;
    let result = query(
        &executor,
        "SELECT name FROM services ORDER BY name ASC LIMIT 1 OFFSET 1",
    )
    .await;
    assert_eq!(names(&result), ["auth-service"]);
    assert_eq!(result.row_count, 1);
    assert_eq!(result.total_count, 3);
}

#[tokio::test]
async fn projection_reordering_permutes_columns_and_keys_alike() {
    let executor = executor().await;
    let ab = query(&executor, "SELECT name, status FROM services").await;
    let ba = query(&executor, "SELECT status, name FROM services").await;
    let column_names = |r: &QueryResult| {
        r.columns.iter().map(|c| c.name.clone()).collect::<Vec<_>>()
    };
    assert_eq!(column_names(&ab), ["name", "status"]);
    assert_eq!(column_names(&ba), ["status", "name"]);
    assert_eq!(ab.rows, ba.rows);
}

#[tokio::test]
async fn pushdown_neutrality_against_an_opaque_source() {
    let executor = executor().await;
    executor
        .registry()
        .register(
            Arc::new(OpaqueSource {
                table: "raw_services".to_string(),
            }),
            &json!({}),
        )
        .await
        .unwrap();
    let pushed = query(
        &executor,
        "SELECT name FROM services WHERE environment = 'production' ORDER BY name ASC",
    )
    .await;
    let unpushed = query(
        &executor,
        "SELECT name FROM raw_services WHERE environment = 'production' ORDER BY name ASC",
    )
    .await;
    assert_eq!(pushed.rows, unpushed.rows);
}

#[tokio::test]
async fn unbounded_results_are_truncated_with_a_warning() {
    let executor = executor().await;
    executor
        .registry()
        .register(Arc::new(BigSource { rows: 12_500 }), &json!({}))
        .await
        .unwrap();
    let result = query(&executor, "SELECT * FROM events").await;
    assert_eq!(result.row_count, 10_000);
    assert_eq!(result.total_count, 12_500);
    assert!(result.truncated);
    assert!(result.warning.as_deref().unwrap().contains("LIMIT"));

    // an explicit LIMIT is never truncated
    let result = query(&executor, "SELECT * FROM events LIMIT 12000").await;
    assert_eq!(result.row_count, 12_000);
    assert!(!result.truncated);
}

#[tokio::test]
async fn repeated_cacheable_queries_share_a_slot() {
    let executor = executor().await;
    let first = query(&executor, "SELECT name FROM services").await;
    let second = query(&executor, "SELECT name FROM services").await;
    assert_eq!(first.rows, second.rows);
    let stats = executor.cache().stats();
    assert_eq!(stats.hits, 1);

    // a join is not cacheable
    let _ = query(
        &executor,
        "SELECT * FROM services INNER JOIN deployments ON services.id = deployments.service_id",
    )
    .await;
    assert_eq!(executor.cache().stats().entry_count, 1);
}

#[tokio::test]
async fn trace_follows_a_service_across_tables() {
    let executor = executor().await;
    let result = run(&executor, "TRACE service_id = 'svc-1' THROUGH mock").await;
    let trace = match result {
        ExecutionResult::Trace(trace) => trace,
        other => panic!("expected trace result, got {:?}", other),
    };
    assert_eq!(trace.identifier, "service_id");
    assert_eq!(trace.total_hops, trace.hops.len());
    assert!(trace.hops.iter().any(|hop| hop.table == "services"));
    assert!(trace.hops.iter().any(|hop| hop.table == "deployments"));
    assert!(trace
        .hops
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
}

#[tokio::test]
async fn describe_reports_the_owning_source_schema() {
    let executor = executor().await;
    let result = run(&executor, "DESCRIBE deployments").await;
    match result {
        ExecutionResult::Describe(describe) => {
            assert_eq!(describe.table, "deployments");
            assert_eq!(describe.source, "mock");
            assert!(describe.columns.iter().any(|c| c.name == "replicas"));
        }
        other => panic!("expected describe result, got {:?}", other),
    }
}

#[tokio::test]
async fn show_lists_tables_and_sources() {
    let executor = executor().await;
    match run(&executor, "SHOW TABLES").await {
        ExecutionResult::Show(show) => assert_eq!(show.items.len(), 3),
        other => panic!("expected show result, got {:?}", other),
    }
    match run(&executor, "SHOW SOURCES").await {
        ExecutionResult::Show(show) => assert_eq!(show.items, vec![json!("mock")]),
        other => panic!("expected show result, got {:?}", other),
    }
    match run(&executor, "SHOW PLUGINS").await {
        ExecutionResult::Show(show) => {
            assert_eq!(show.items.len(), 1);
            assert_eq!(show.items[0]["healthy"], json!(true));
        }
        other => panic!("expected show result, got {:?}", other),
    }
}

#[tokio::test]
async fn cache_statements_control_the_injected_cache() {
    let executor = executor().await;
    let _ = query(&executor, "SELECT name FROM services").await;
    match run(&executor, "SHOW CACHE").await {
        ExecutionResult::Cache(cache) => {
            let stats = cache.stats.unwrap();
            assert_eq!(stats.entry_count, 1);
        }
        other => panic!("expected cache result, got {:?}", other),
    }
    match run(&executor, "CACHE CLEAR").await {
        ExecutionResult::Cache(cache) => {
            assert!(cache.message.unwrap().contains("cleared"));
        }
        other => panic!("expected cache result, got {:?}", other),
    }
    assert_eq!(executor.cache().stats().entry_count, 0);

    match run(&executor, "CACHE SET TTL deployments 60000").await {
        ExecutionResult::Cache(cache) => {
            assert!(cache.message.unwrap().contains("deployments"));
        }
        other => panic!("expected cache result, got {:?}", other),
    }
}

#[tokio::test]
async fn unknown_tables_are_execution_errors() {
    let executor = executor().await;
    let statement = infraql_parser::parse("SELECT * FROM droplets").unwrap();
    let err = executor
        .execute(&statement, &QueryContext::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "EXECUTION_ERROR");
    assert!(err.to_string().contains("droplets"));
}
