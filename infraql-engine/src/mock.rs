//! A synthetic in-memory source with three fixed tables, used as the
//! reference fixture by the test suite and for offline demos.

use async_trait::async_trait;
use infraql_ast::Combinator;
use serde_json::json;

use crate::error::{EngineError, EngineResult};
use crate::eval;
use crate::plugin::DataSource;
use crate::types::{
    ColumnInfo, ColumnType, Filter, QueryOptions, QueryResult, Row, TableInfo, TraceHop, Value,
};

/// The synthetic `mock` source: `services`, `deployments` and `incidents`.
///
/// The source honours filter pushdown (re-applying the filters itself) and
/// leaves pagination and ordering to the executor.
pub struct MockSource {
    name: String,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// Creates the mock source under its default name `mock`.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
        }
    }

    fn table_rows(table: &str) -> Option<Vec<Value>> {
        match table {
            "services" => Some(vec![
                json!({
                    "id": "svc-1",
                    "name": "api-gateway",
                    "environment": "production",
                    "version": "1.4.2",
                    "status": "active",
                    "cpu_usage": 34.5,
                    "memory_usage": 62.1,
                    "created_at": "2024-03-01T08:00:00Z",
                }),
                json!({
                    "id": "svc-2",
                    "name": "auth-service",
                    "environment": "production",
                    "version": "2.1.0",
                    "status": "active",
                    "cpu_usage": 21.3,
                    "memory_usage": 48.7,
                    "created_at": "2024-03-01T08:05:00Z",
                }),
                json!({
                    "id": "svc-3",
                    "name": "data-processor",
                    "environment": "staging",
                    "version": "0.9.1",
                    "status": "degraded",
                    "cpu_usage": 78.2,
                    "memory_usage": 91.4,
                    "created_at": "2024-03-02T10:00:00Z",
                }),
            ]),
            "deployments" => Some(vec![
                json!({
                    "id": "dep-1",
                    "service_id": "svc-1",
                    "version": "1.4.2",
                    "replicas": 2,
                    "status": "succeeded",
                    "deployed_at": "2024-03-10T12:00:00Z",
                }),
                json!({
                    "id": "dep-2",
                    "service_id": "svc-2",
                    "version": "2.1.0",
                    "replicas": 3,
                    "status": "succeeded",
                    "deployed_at": "2024-03-11T09:30:00Z",
                }),
                json!({
                    "id": "dep-3",
                    "service_id": "svc-3",
                    "version": "0.9.1",
                    "replicas": 1,
                    "status": "failed",
                    "deployed_at": "2024-03-12T16:45:00Z",
                }),
            ]),
            "incidents" => Some(vec![
                json!({
                    "id": "inc-1",
                    "service_id": "svc-1",
                    "severity": "low",
                    "title": "Latency spike on /v1/routes",
                    "status": "resolved",
                    "created_at": "2024-03-12T22:40:00Z",
                }),
                json!({
                    "id": "inc-2",
                    "service_id": "svc-3",
                    "severity": "high",
                    "title": "Elevated error rate after deploy",
                    "status": "open",
                    "created_at": "2024-03-13T02:12:00Z",
                }),
            ]),
            _ => None,
        }
    }

    /// The column rows of each hop carry their timestamp under a
    /// table-specific column.
    fn timestamp_column(table: &str) -> &'static str {
        match table {
            "deployments" => "deployed_at",
            _ => "created_at",
        }
    }

    fn rows_of(&self, table: &str) -> EngineResult<Vec<Row>> {
        let rows = Self::table_rows(table).ok_or_else(|| {
            EngineError::plugin(
                &self.name,
                "Query failed",
                format!("Unknown table '{}'", table),
            )
        })?;
        Ok(rows
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(map) => Some(map.into_iter().collect::<Row>()),
                _ => None,
            })
            .collect())
    }
}

#[async_trait]
impl DataSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tables(&self) -> EngineResult<Vec<TableInfo>> {
        Ok(vec![
            TableInfo {
                name: "services".to_string(),
                description: Some("Synthetic service inventory".to_string()),
                columns: vec![
                    ColumnInfo::new("id", ColumnType::String),
                    ColumnInfo::new("name", ColumnType::String),
                    ColumnInfo::new("environment", ColumnType::String),
                    ColumnInfo::new("version", ColumnType::String),
                    ColumnInfo::new("status", ColumnType::String),
                    ColumnInfo::new("cpu_usage", ColumnType::Number),
                    ColumnInfo::new("memory_usage", ColumnType::Number),
                    ColumnInfo::new("created_at", ColumnType::Date),
                ],
                row_count: Some(3),
            },
            TableInfo {
                name: "deployments".to_string(),
                description: Some("Synthetic deployment history".to_string()),
                columns: vec![
                    ColumnInfo::new("id", ColumnType::String),
                    ColumnInfo::new("service_id", ColumnType::String),
                    ColumnInfo::new("version", ColumnType::String),
                    ColumnInfo::new("replicas", ColumnType::Number),
                    ColumnInfo::new("status", ColumnType::String),
                    ColumnInfo::new("deployed_at", ColumnType::Date),
                ],
                row_count: Some(3),
            },
            TableInfo {
                name: "incidents".to_string(),
                description: Some("Synthetic incident log".to_string()),
                columns: vec![
                    ColumnInfo::new("id", ColumnType::String),
                    ColumnInfo::new("service_id", ColumnType::String),
                    ColumnInfo::new("severity", ColumnType::String),
                    ColumnInfo::new("title", ColumnType::String),
                    ColumnInfo::new("status", ColumnType::String),
                    ColumnInfo::new("created_at", ColumnType::Date),
                ],
                row_count: Some(2),
            },
        ])
    }

    async fn query(
        &self,
        table: &str,
        filters: &[Filter],
        _options: &QueryOptions,
    ) -> EngineResult<QueryResult> {
        let rows: Vec<Row> = self
            .rows_of(table)?
            .into_iter()
            .filter(|row| eval::matches_predicate(row, filters, Combinator::And))
            .collect();
        let columns = self
            .tables()
            .await?
            .into_iter()
            .find(|info| info.name == table)
            .map(|info| info.columns)
            .unwrap_or_default();
        let mut result = QueryResult::new(columns, rows);
        result.source = Some(self.name.clone());
        Ok(result)
    }

    async fn trace(&self, identifier: &str, value: &Value) -> EngineResult<Option<Vec<TraceHop>>> {
        let mut hops = Vec::new();
        for table in ["services", "deployments", "incidents"] {
            let timestamp_column = Self::timestamp_column(table);
            for row in self.rows_of(table)? {
                // an identifier like `service_id` also matches the `id` of
                // the entity it refers to
                let matched = row.get(identifier) == Some(value)
                    || (identifier.ends_with("_id") && row.get("id") == Some(value));
                if !matched {
                    continue;
                }
                let timestamp = row
                    .get(timestamp_column)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                hops.push(TraceHop {
                    source: self.name.clone(),
                    table: table.to_string(),
                    timestamp,
                    data: Value::Object(row.into_iter().collect()),
                });
            }
        }
        Ok(Some(hops))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infraql_ast::CompareOp;

    #[tokio::test]
    async fn filters_are_applied_by_the_source() {
        let mock = MockSource::new();
        let filters = vec![Filter {
            field: "environment".to_string(),
            op: CompareOp::Eq,
            value: json!("production"),
            second_value: None,
        }];
        let result = mock
            .query("services", &filters, &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(result.row_count, 2);
        assert!(result
            .rows
            .iter()
            .all(|row| row["environment"] == json!("production")));
    }

    #[tokio::test]
    async fn unknown_tables_are_plugin_errors() {
        let mock = MockSource::new();
        let err = mock
            .query("droplets", &[], &QueryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PLUGIN_ERROR");
    }

    #[tokio::test]
    async fn trace_follows_an_id_across_tables() {
        let mock = MockSource::new();
        let hops = mock
            .trace("service_id", &json!("svc-1"))
            .await
            .unwrap()
            .unwrap();
        let tables: Vec<_> = hops.iter().map(|hop| hop.table.as_str()).collect();
        assert!(tables.contains(&"services"));
        assert!(tables.contains(&"deployments"));
        assert!(tables.contains(&"incidents"));
        assert!(hops.iter().all(|hop| !hop.timestamp.is_empty()));
    }
}
