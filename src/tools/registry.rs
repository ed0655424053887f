//! Tool registry for dynamic tool registration.

use crate::error::{Result, ToolError};
use crate::protocol::{CallToolParams, CallToolResult, Tool};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> Tool;
    async fn execute(&self, arguments: Value) -> Result<CallToolResult>;
}

pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    pub fn register<T: ToolHandler + 'static>(&self, tool: T) {
        let definition = tool.definition();
        let name = definition.name.clone();
        debug!("Registering tool: {}", name);
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).map(|r| Arc::clone(&*r))
    }

    /// Tool definitions sorted by name.
    pub fn list(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.iter().map(|r| r.value().definition()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub async fn execute(&self, params: CallToolParams) -> Result<CallToolResult> {
        let tool = self
            .get(&params.name)
            .ok_or_else(|| ToolError::NotFound(params.name.clone()))?;

        tool.execute(params.arguments).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode tool arguments; absent arguments decode as an empty object.
pub fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()).into())
}

#[macro_export]
macro_rules! define_tool {
    (
        name: $name:expr,
        description: $desc:expr,
        schema: $schema:tt
    ) => {
        $crate::protocol::Tool {
            name: $name.into(),
            description: Some($desc.into()),
            input_schema: serde_json::json!($schema),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::McpError;
    use serde::Deserialize;

    struct EchoTool(&'static str);

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn definition(&self) -> Tool {
            define_tool! {
                name: self.0,
                description: "Echo the tool name",
                schema: {"type": "object", "properties": {}}
            }
        }

        async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
            Ok(CallToolResult::text(self.0))
        }
    }

    #[test]
    fn test_registry_lists_sorted() {
        let registry = ToolRegistry::new();
        registry.register(EchoTool("validate_sql"));
        registry.register(EchoTool("ask_question"));
        registry.register(EchoTool("describe_schema"));

        assert_eq!(registry.len(), 3);
        assert!(registry.get("unknown").is_none());

        let names: Vec<String> = registry.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["ask_question", "describe_schema", "validate_sql"]);
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let registry = ToolRegistry::new();
        registry.register(EchoTool("ask_question"));

        let result = registry
            .execute(CallToolParams {
                name: "ask_question".into(),
                arguments: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(result.text_content(), "ask_question");

        let err = registry
            .execute(CallToolParams {
                name: "execute_query".into(),
                arguments: Value::Null,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Tool(ToolError::NotFound(_))));
    }

    #[test]
    fn test_parse_arguments() {
        #[derive(Debug, Deserialize)]
        struct Args {
            #[serde(default)]
            user_id: Option<String>,
        }

        let args: Args = parse_arguments(Value::Null).unwrap();
        assert!(args.user_id.is_none());

        let err = parse_arguments::<Args>(serde_json::json!({"user_id": 5})).unwrap_err();
        assert!(matches!(err, McpError::Tool(ToolError::InvalidArguments(_))));
    }
}
