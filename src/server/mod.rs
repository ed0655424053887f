//! MCP server implementation.

pub mod handler;
pub mod state;

pub use handler::{INSTRUCTIONS, McpHandler};
pub use state::ServerState;
