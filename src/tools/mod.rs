//! MCP tool definitions and registry.

pub mod ask;
pub mod registry;
pub mod schema;
pub mod validate;

pub use ask::AskQuestionTool;
pub use registry::{ToolHandler, ToolRegistry, parse_arguments};
pub use schema::DescribeSchemaTool;
pub use validate::{ValidateSqlTool, Verdict};

use crate::pipeline::QuestionPipeline;
use std::sync::Arc;

/// Create and register all tools.
pub fn create_registry(pipeline: Arc<QuestionPipeline>) -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register(AskQuestionTool::new(pipeline));
    registry.register(ValidateSqlTool);
    registry.register(DescribeSchemaTool);
    registry
}
