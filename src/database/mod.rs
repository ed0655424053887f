//! Database access layer.
//!
//! Executes validated statements against PostgreSQL and reduces the result
//! to a single number.

pub mod pool;
pub mod postgres;
pub mod result;
pub mod traits;

pub use pool::{PoolMetrics, PoolMetricsSnapshot};
pub use postgres::PostgresExecutor;
pub use result::{ScalarResult, ScalarValue};
pub use traits::ScalarExecutor;
