//! `ask_question` tool: natural-language question in, one number out.

use crate::define_tool;
use crate::error::{Result, ToolError};
use crate::pipeline::QuestionPipeline;
use crate::protocol::{CallToolResult, Tool};
use crate::tools::registry::{ToolHandler, parse_arguments};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Rate-limit key used when the caller does not identify a user.
pub const DEFAULT_USER: &str = "mcp-client";

#[derive(Debug, Deserialize)]
pub struct AskQuestionArgs {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

pub struct AskQuestionTool {
    pipeline: Arc<QuestionPipeline>,
}

impl AskQuestionTool {
    pub fn new(pipeline: Arc<QuestionPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl ToolHandler for AskQuestionTool {
    fn definition(&self) -> Tool {
        define_tool! {
            name: "ask_question",
            description: "Answer an analytics question about videos and their hourly snapshots. \
                The question is translated to a single aggregate SQL query, checked for safety \
                and executed read-only. Returns one number.",
            schema: {
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "Question in natural language, e.g. 'How many videos are there?'"
                    },
                    "user_id": {
                        "type": "string",
                        "description": "Identifier of the asking user, used for rate limiting"
                    }
                },
                "required": ["question"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "ask_question"))]
    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: AskQuestionArgs = parse_arguments(arguments)?;
        let question = args
            .question
            .ok_or_else(|| ToolError::MissingArgument("question".into()))?;
        let user = args.user_id.as_deref().unwrap_or(DEFAULT_USER);

        let answer = self.pipeline.answer(user, &question).await?;
        Ok(CallToolResult::text(answer.value.to_string()))
    }
}
