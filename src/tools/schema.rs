//! `describe_schema` tool.

use crate::define_tool;
use crate::error::Result;
use crate::llm::SCHEMA_DESCRIPTION;
use crate::protocol::{CallToolResult, Tool};
use crate::tools::registry::ToolHandler;
use async_trait::async_trait;
use serde_json::Value;

/// Returns the schema description the model sees with every question.
pub struct DescribeSchemaTool;

#[async_trait]
impl ToolHandler for DescribeSchemaTool {
    fn definition(&self) -> Tool {
        define_tool! {
            name: "describe_schema",
            description: "Describe the tables and columns questions can be answered from.",
            schema: {"type": "object", "properties": {}}
        }
    }

    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        Ok(CallToolResult::text(SCHEMA_DESCRIPTION.trim()))
    }
}
