//! MCP request handler implementation.

use crate::error::ProtocolResult;
use crate::protocol::{
    CallToolParams, CallToolResult, Handler, InitializeParams, InitializeResult, ListToolsResult,
    MCP_VERSION, ServerCapabilities, ServerInfo, ToolsCapability,
};
use crate::server::state::ServerState;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Greeting returned to the client on initialize.
pub const INSTRUCTIONS: &str = "Ask an analytics question about videos and get a number back. \
    Use 'ask_question' with a question such as 'How many videos are there?' or \
    'How many views were gained on 2025-12-01?'. \
    Use 'describe_schema' to see the available data and 'validate_sql' to check a query \
    against the safety rules without running it.";

pub struct McpHandler {
    state: Arc<ServerState>,
}

impl McpHandler {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }
}

#[async_trait]
impl Handler for McpHandler {
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult> {
        info!(
            "Initialize request from {} v{}",
            params.client_info.name, params.client_info.version
        );
        self.state.set_client_info(params.client_info);

        Ok(InitializeResult {
            protocol_version: MCP_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: self.state.settings.name.to_string(),
                version: self.state.settings.version.to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        })
    }

    async fn initialized(&self) -> ProtocolResult<()> {
        info!("Server initialized successfully");
        Ok(())
    }

    async fn shutdown(&self) -> ProtocolResult<()> {
        info!(
            tool_calls = self.state.tool_calls(),
            tracked_users = self.state.pipeline.rate_limiter().status().tracked_users,
            "Shutdown request received"
        );
        Ok(())
    }

    async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
        let tools = self.state.tools.list();
        debug!("Listing {} tools", tools.len());
        Ok(ListToolsResult { tools })
    }

    async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult> {
        let call = self.state.next_tool_call();
        debug!(call, "Tool call: {}", params.name);

        match self.state.tools.execute(params).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(call, error = %e, "Tool execution failed");
                Ok(CallToolResult::error(e.user_message()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::database::ScalarExecutor;
    use crate::error::{DbResult, LlmResult};
    use crate::llm::{RetryPolicy, SqlGenerator};
    use crate::pipeline::QuestionPipeline;
    use crate::protocol::ClientInfo;
    use crate::security::{RateLimiter, ValidatedStatement};
    use serde_json::json;
    use std::time::Duration;

    /// Echoes the question back as model output.
    struct EchoGenerator;

    #[async_trait]
    impl SqlGenerator for EchoGenerator {
        async fn generate(&self, question: &str) -> LlmResult<String> {
            Ok(question.to_string())
        }
    }

    struct ConstExecutor(i64);

    #[async_trait]
    impl ScalarExecutor for ConstExecutor {
        fn name(&self) -> &'static str {
            "const"
        }

        async fn fetch_scalar(&self, _statement: &ValidatedStatement) -> DbResult<i64> {
            Ok(self.0)
        }

        async fn health_check(&self) -> DbResult<()> {
            Ok(())
        }
    }

    fn handler() -> McpHandler {
        let pipeline = QuestionPipeline::new(
            Arc::new(EchoGenerator),
            Arc::new(ConstExecutor(1337)),
            Arc::new(RateLimiter::new(Duration::from_secs(3))),
            RetryPolicy::default(),
        );
        let state = ServerState::new(Settings::default(), Arc::new(pipeline));
        McpHandler::new(Arc::new(state))
    }

    fn call(name: &str, arguments: serde_json::Value) -> CallToolParams {
        CallToolParams {
            name: name.into(),
            arguments,
        }
    }

    #[tokio::test]
    async fn test_initialize_greets_and_records_client() {
        let handler = handler();
        let result = handler
            .initialize(InitializeParams {
                protocol_version: MCP_VERSION.into(),
                capabilities: json!({}),
                client_info: ClientInfo {
                    name: "inspector".into(),
                    version: "1.0".into(),
                },
            })
            .await
            .unwrap();

        assert_eq!(result.instructions.as_deref(), Some(INSTRUCTIONS));
        assert!(result.capabilities.tools.is_some());
        assert!(handler.state().is_initialized());
        assert_eq!(handler.state().client_info().unwrap().name, "inspector");
    }

    #[tokio::test]
    async fn test_lists_three_tools() {
        let tools = handler().list_tools().await.unwrap().tools;
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["ask_question", "describe_schema", "validate_sql"]);
    }

    #[tokio::test]
    async fn test_ask_question_returns_number() {
        let result = handler()
            .call_tool(call(
                "ask_question",
                json!({"question": "SELECT COUNT(*) FROM videos", "user_id": "42"}),
            ))
            .await
            .unwrap();
        assert!(!result.is_error());
        assert_eq!(result.text_content(), "1337");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ask_question_failures_use_user_messages() {
        let handler = handler();

        let result = handler
            .call_tool(call("ask_question", json!({"question": "DROP TABLE videos"})))
            .await
            .unwrap();
        assert!(result.is_error());
        assert_eq!(
            result.text_content(),
            "Could not process the question. Try rephrasing it."
        );

        let result = handler
            .call_tool(call("ask_question", json!({})))
            .await
            .unwrap();
        assert_eq!(result.text_content(), "Please send a text question.");
    }

    #[tokio::test]
    async fn test_ask_question_rate_limited() {
        let handler = handler();
        let args = json!({"question": "SELECT SUM(views_count) FROM videos", "user_id": "7"});

        let first = handler.call_tool(call("ask_question", args.clone())).await.unwrap();
        assert!(!first.is_error());

        let second = handler.call_tool(call("ask_question", args)).await.unwrap();
        assert!(second.is_error());
        assert!(second.text_content().starts_with("Too many requests."));
        assert_eq!(handler.state().tool_calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let result = handler()
            .call_tool(call("execute_query", json!({"query": "SELECT 1"})))
            .await
            .unwrap();
        assert!(result.is_error());
    }
}
