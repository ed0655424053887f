//! MCP server that answers analytics questions about videos with a single
//! number.
//!
//! A language model turns each question into SQL. The statement is extracted
//! from the model output, checked against a fixed set of safety rules and
//! only then executed read-only against PostgreSQL.
//!
//! # Example
//!
//! ```
//! use video_stats_mcp::security::guard;
//!
//! let statement = guard("```sql\nSELECT COUNT(*) FROM videos;\n```").unwrap();
//! assert_eq!(statement.as_str(), "SELECT COUNT(*) FROM videos");
//!
//! assert!(guard("DROP TABLE videos").is_err());
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod protocol;
pub mod security;
pub mod server;
pub mod tools;

pub use config::Settings;
pub use database::{PostgresExecutor, ScalarExecutor};
pub use error::{McpError, Result};
pub use llm::{OpenRouterClient, SqlGenerator};
pub use pipeline::{Answer, QuestionPipeline};
pub use protocol::{McpServer, McpServerBuilder};
pub use security::{RateLimiter, ValidatedStatement, guard};
pub use server::{McpHandler, ServerState};
