//! Query executor trait.

use crate::error::DbResult;
use crate::security::ValidatedStatement;
use async_trait::async_trait;

/// Async executor that turns a validated statement into one number.
///
/// Implementations: [`PostgresExecutor`](crate::database::PostgresExecutor).
#[async_trait]
pub trait ScalarExecutor: Send + Sync {
    /// Returns the executor name (e.g., "postgres").
    fn name(&self) -> &'static str;

    /// Executes the statement and returns its single numeric value.
    ///
    /// Zero rows or NULL yield 0.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Timeout`](crate::error::ExecutionError::Timeout)
    /// if the query exceeds the configured timeout,
    /// [`ExecutionError::NotScalar`](crate::error::ExecutionError::NotScalar) if
    /// the result has more than one row or column, and
    /// [`ExecutionError::BooleanResult`](crate::error::ExecutionError::BooleanResult) /
    /// [`ExecutionError::NonNumeric`](crate::error::ExecutionError::NonNumeric)
    /// for values that are not numbers.
    async fn fetch_scalar(&self, statement: &ValidatedStatement) -> DbResult<i64>;

    /// Checks that the backing database is reachable.
    async fn health_check(&self) -> DbResult<()>;
}
