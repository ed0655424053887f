//! PostgreSQL executor using `tokio-postgres` and `deadpool`.

use crate::config::{Settings, postgres_url};
use crate::database::pool::{PoolMetrics, PoolMetricsSnapshot};
use crate::database::result::{ScalarResult, ScalarValue};
use crate::database::traits::ScalarExecutor;
use crate::error::{DbResult, ExecutionError, PREVIEW_CHARS, preview};
use crate::security::ValidatedStatement;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::{
    Config as DeadpoolConfig, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::Type;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info, instrument, warn};

/// PostgreSQL scalar executor.
pub struct PostgresExecutor {
    pool: Pool,
    metrics: Arc<PoolMetrics>,
    query_timeout: Duration,
}

impl PostgresExecutor {
    /// Create a pool from settings and verify that a connection can be made.
    pub async fn new(settings: &Settings) -> DbResult<Self> {
        let url = postgres_url(&settings.database_url)
            .map_err(|e| ExecutionError::ConnectionFailed(e.to_string()))?;

        let mut deadpool_config = DeadpoolConfig::new();
        deadpool_config.url = Some(url);
        deadpool_config.pool = Some(PoolConfig::new(settings.pool_size));
        deadpool_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = deadpool_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ExecutionError::ConnectionFailed(e.to_string()))?;

        // Test connection
        let _conn = pool
            .get()
            .await
            .map_err(|e| ExecutionError::ConnectionFailed(e.to_string()))?;

        info!(
            "PostgreSQL connection pool created with max size {}",
            settings.pool_size
        );

        Ok(Self {
            pool,
            metrics: Arc::new(PoolMetrics::new()),
            query_timeout: settings.db_timeout,
        })
    }

    pub fn metrics(&self) -> PoolMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Run the statement in a read-only transaction and capture its shape.
    async fn run(&self, sql: &str) -> DbResult<ScalarResult> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|_| ExecutionError::PoolExhausted)?;

        let tx = conn
            .build_transaction()
            .read_only(true)
            .start()
            .await
            .map_err(|e| query_failed(e, sql))?;

        // Cancel the query server-side too; dropping the future only abandons it.
        tx.batch_execute(&statement_timeout_sql(self.query_timeout))
            .await
            .map_err(|e| query_failed(e, sql))?;

        let stmt = tx.prepare(sql).await.map_err(|e| query_failed(e, sql))?;
        let rows = tx
            .query(&stmt, &[])
            .await
            .map_err(|e| self.query_error(e, sql))?;

        let columns = stmt.columns();
        let Some(row) = rows.first() else {
            return Ok(ScalarResult::empty(columns.len()));
        };

        Ok(ScalarResult {
            rows: rows.len(),
            columns: columns.len(),
            value: columns.first().map(|c| read_first_column(row, c.type_())),
        })
    }

    /// A cancellation by `statement_timeout` is reported as a timeout.
    fn query_error(&self, e: tokio_postgres::Error, sql: &str) -> ExecutionError {
        if e.code() == Some(&SqlState::QUERY_CANCELED) {
            ExecutionError::Timeout(self.query_timeout.as_millis() as u64)
        } else {
            query_failed(e, sql)
        }
    }
}

#[async_trait]
impl ScalarExecutor for PostgresExecutor {
    fn name(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self, statement), fields(db = "postgres"))]
    async fn fetch_scalar(&self, statement: &ValidatedStatement) -> DbResult<i64> {
        let sql = statement.as_str();
        debug!("Executing query: {}", preview(sql, PREVIEW_CHARS));

        let shaped = match timeout(self.query_timeout, self.run(sql)).await {
            Ok(Ok(shaped)) => shaped,
            Ok(Err(e @ ExecutionError::Timeout(_))) => {
                self.metrics.record_timeout();
                warn!("Query cancelled by statement_timeout");
                return Err(e);
            }
            Ok(Err(e)) => {
                self.metrics.record_query_error();
                return Err(e);
            }
            Err(_) => {
                self.metrics.record_timeout();
                warn!("Query timed out after {:?}", self.query_timeout);
                return Err(ExecutionError::Timeout(
                    self.query_timeout.as_millis() as u64,
                ));
            }
        };

        debug!(
            rows = shaped.rows,
            columns = shaped.columns,
            result_type = shaped.value.as_ref().map_or("none", |v| v.type_name()),
            "Query executed"
        );

        let number = shaped.into_number(sql).inspect_err(|_| {
            self.metrics.record_query_error();
        })?;
        self.metrics.record_query_executed();
        Ok(number)
    }

    async fn health_check(&self) -> DbResult<()> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| ExecutionError::ConnectionFailed(e.to_string()))?;
        conn.simple_query("SELECT 1")
            .await
            .map_err(|e| ExecutionError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

/// `SET LOCAL` scoped to the current transaction; whole milliseconds, at least 1.
fn statement_timeout_sql(limit: Duration) -> String {
    format!("SET LOCAL statement_timeout = {}", limit.as_millis().max(1))
}

fn query_failed(e: tokio_postgres::Error, sql: &str) -> ExecutionError {
    ExecutionError::QueryFailed {
        message: e.to_string(),
        preview: preview(sql, PREVIEW_CHARS),
    }
}

/// Decode the first column of `row` according to its PostgreSQL type.
fn read_first_column(row: &Row, ty: &Type) -> ScalarValue {
    let decoded = if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(0)
            .map(|v| v.map(|v| ScalarValue::Int(i64::from(v))))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(0)
            .map(|v| v.map(|v| ScalarValue::Int(i64::from(v))))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(0)
            .map(|v| v.map(ScalarValue::Int))
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(0)
            .map(|v| v.map(|v| ScalarValue::Float(f64::from(v))))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(0)
            .map(|v| v.map(ScalarValue::Float))
    } else if *ty == Type::NUMERIC {
        row.try_get::<_, Option<Decimal>>(0)
            .map(|v| v.map(ScalarValue::Decimal))
    } else if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(0)
            .map(|v| v.map(ScalarValue::Bool))
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
        row.try_get::<_, Option<String>>(0)
            .map(|v| v.map(ScalarValue::String))
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<DateTime<Utc>>>(0)
            .map(|v| v.map(ScalarValue::DateTime))
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(0)
            .map(|v| v.map(ScalarValue::NaiveDateTime))
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<NaiveDate>>(0)
            .map(|v| v.map(ScalarValue::Date))
    } else {
        return ScalarValue::Unsupported(ty.name().to_string());
    };

    match decoded {
        Ok(Some(value)) => value,
        Ok(None) => ScalarValue::Null,
        Err(e) => {
            debug!("Failed to decode {} value: {}", ty.name(), e);
            ScalarValue::Unsupported(ty.name().to_string())
        }
    }
}
