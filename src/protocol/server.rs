//! MCP server loop with lifecycle management.

use crate::error::{McpError, ProtocolError, Result};
use crate::protocol::handler::{Dispatcher, Handler};
use crate::protocol::transport::{StdioTransport, Transport};
use crate::protocol::types::*;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No initialize request yet.
    Created,
    /// Initialize answered, awaiting the initialized notification.
    Initializing,
    Running,
    ShuttingDown,
    Stopped,
}

impl Lifecycle {
    /// Methods allowed before the client has sent `initialize`.
    fn accepts(self, method: &str) -> bool {
        match self {
            Self::Created => matches!(method, "initialize" | "ping"),
            Self::ShuttingDown | Self::Stopped => false,
            Self::Initializing | Self::Running => true,
        }
    }
}

pub struct McpServer<H: Handler> {
    info: ServerInfo,
    handler: Arc<H>,
    lifecycle: RwLock<Lifecycle>,
}

impl<H: Handler> McpServer<H> {
    pub fn new(handler: H, info: ServerInfo) -> Self {
        Self {
            info,
            handler: Arc::new(handler),
            lifecycle: RwLock::new(Lifecycle::Created),
        }
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.read().await
    }

    /// Serve over stdin/stdout until EOF or shutdown.
    #[instrument(skip(self), fields(server = %self.info.name))]
    pub async fn run(&self) -> Result<()> {
        let transport = StdioTransport::stdio();
        self.run_with_transport(&transport).await
    }

    /// Serve over any transport until EOF or shutdown.
    pub async fn run_with_transport<T: Transport>(&self, transport: &T) -> Result<()> {
        info!(
            "Starting MCP server: {} v{}",
            self.info.name, self.info.version
        );

        let dispatcher = Dispatcher::new(Arc::clone(&self.handler));

        loop {
            let message = match transport.read_message().await {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    debug!("EOF received, shutting down");
                    break;
                }
                Err(McpError::Protocol(e @ ProtocolError::ParseError)) => {
                    let response = JsonRpcResponse::fail(None, JsonRpcError::from(&e));
                    if let Err(e) = transport.write_response(&response).await {
                        error!("Failed to send error response: {}", e);
                    }
                    continue;
                }
                Err(e) => {
                    error!("Transport error: {}", e);
                    *self.lifecycle.write().await = Lifecycle::Stopped;
                    return Err(e);
                }
            };

            let request = match message {
                Message::Request(request) => request,
                Message::Response(response) => {
                    warn!("Unexpected response received: {:?}", response.id);
                    continue;
                }
            };

            let is_notification = request.is_notification();
            let method = request.method.clone();

            let current = self.lifecycle().await;
            let response = if current.accepts(&method) {
                let response = dispatcher.dispatch(request).await;
                if !response.is_error() {
                    self.advance(&method).await;
                }
                response
            } else {
                warn!(?current, "Rejecting {} outside of session", method);
                JsonRpcResponse::fail(
                    request.id,
                    JsonRpcError::from(&ProtocolError::NotInitialized),
                )
            };

            if !is_notification && let Err(e) = transport.write_response(&response).await {
                error!("Failed to send response: {}", e);
            }

            if self.lifecycle().await == Lifecycle::ShuttingDown {
                info!("Shutdown request received");
                break;
            }
        }

        *self.lifecycle.write().await = Lifecycle::Stopped;
        info!("Server stopped");
        Ok(())
    }

    async fn advance(&self, method: &str) {
        let mut lifecycle = self.lifecycle.write().await;
        match method {
            "initialize" if *lifecycle == Lifecycle::Created => {
                *lifecycle = Lifecycle::Initializing;
            }
            "initialized" | "notifications/initialized"
                if *lifecycle == Lifecycle::Initializing =>
            {
                *lifecycle = Lifecycle::Running;
                info!("Server initialized and running");
            }
            "shutdown" => {
                *lifecycle = Lifecycle::ShuttingDown;
            }
            _ => {}
        }
    }
}

pub struct McpServerBuilder<H: Handler> {
    handler: Option<H>,
    name: String,
    version: String,
}

impl<H: Handler> McpServerBuilder<H> {
    pub fn new() -> Self {
        Self {
            handler: None,
            name: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }

    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn build(self) -> Result<McpServer<H>> {
        let handler = self.handler.ok_or_else(|| McpError::Internal {
            message: "Handler is required".into(),
        })?;

        Ok(McpServer::new(
            handler,
            ServerInfo {
                name: self.name,
                version: self.version,
            },
        ))
    }
}

impl<H: Handler> Default for McpServerBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolResult;
    use crate::protocol::transport::LineTransport;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};

    struct EchoHandler;

    #[async_trait]
    impl Handler for EchoHandler {
        async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult> {
            Ok(InitializeResult {
                protocol_version: params.protocol_version,
                capabilities: ServerCapabilities::default(),
                server_info: ServerInfo {
                    name: "test".into(),
                    version: "1.0".into(),
                },
                instructions: None,
            })
        }

        async fn initialized(&self) -> ProtocolResult<()> {
            Ok(())
        }

        async fn shutdown(&self) -> ProtocolResult<()> {
            Ok(())
        }

        async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
            Ok(ListToolsResult { tools: vec![] })
        }

        async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult> {
            Ok(CallToolResult::text(params.name))
        }
    }

    fn server() -> Arc<McpServer<EchoHandler>> {
        Arc::new(McpServerBuilder::new().handler(EchoHandler).build().unwrap())
    }

    /// Start the server on in-memory pipes; returns the client ends.
    fn serve(
        server: Arc<McpServer<EchoHandler>>,
    ) -> (
        DuplexStream,
        Lines<BufReader<DuplexStream>>,
        tokio::task::JoinHandle<Result<()>>,
    ) {
        let (client_in, server_in) = tokio::io::duplex(4096);
        let (server_out, client_out) = tokio::io::duplex(4096);
        let task = tokio::spawn(async move {
            let transport = LineTransport::new(BufReader::new(server_in), server_out);
            server.run_with_transport(&transport).await
        });
        (client_in, BufReader::new(client_out).lines(), task)
    }

    async fn send(input: &mut DuplexStream, message: Value) {
        let mut line = message.to_string();
        line.push('\n');
        input.write_all(line.as_bytes()).await.unwrap();
    }

    async fn receive(output: &mut Lines<BufReader<DuplexStream>>) -> Value {
        let line = output.next_line().await.unwrap().unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[test]
    fn test_server_builder() {
        let server = McpServerBuilder::new()
            .handler(EchoHandler)
            .name("video-stats")
            .version("0.1.0")
            .build()
            .unwrap();

        assert_eq!(server.info.name, "video-stats");
        assert_eq!(server.info.version, "0.1.0");
    }

    #[tokio::test]
    async fn test_full_session() {
        let server = server();
        let (mut input, mut output, task) = serve(server.clone());

        send(
            &mut input,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {
                "protocolVersion": MCP_VERSION,
                "clientInfo": {"name": "client", "version": "1"}
            }}),
        )
        .await;
        let response = receive(&mut output).await;
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], MCP_VERSION);

        send(&mut input, json!({"jsonrpc": "2.0", "method": "initialized"})).await;
        send(
            &mut input,
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "describe_schema"}}),
        )
        .await;
        // The notification produced no response, so the next line answers id 2.
        let response = receive(&mut output).await;
        assert_eq!(response["id"], 2);
        assert_eq!(response["result"]["content"][0]["text"], "describe_schema");
        assert_eq!(server.lifecycle().await, Lifecycle::Running);

        send(&mut input, json!({"jsonrpc": "2.0", "id": 3, "method": "shutdown"})).await;
        let response = receive(&mut output).await;
        assert_eq!(response["id"], 3);

        task.await.unwrap().unwrap();
        assert_eq!(server.lifecycle().await, Lifecycle::Stopped);
    }

    #[tokio::test]
    async fn test_rejects_calls_before_initialize() {
        let (mut input, mut output, task) = serve(server());

        send(&mut input, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
        let response = receive(&mut output).await;
        assert_eq!(response["error"]["code"], -32002);

        send(&mut input, json!({"jsonrpc": "2.0", "id": 2, "method": "ping"})).await;
        let response = receive(&mut output).await;
        assert_eq!(response["result"], json!({}));

        drop(input);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_parse_error_keeps_serving() {
        let (mut input, mut output, task) = serve(server());

        input.write_all(b"not json\n").await.unwrap();
        let response = receive(&mut output).await;
        assert_eq!(response["error"]["code"], -32700);
        assert!(response["id"].is_null());

        send(&mut input, json!({"jsonrpc": "2.0", "id": 9, "method": "ping"})).await;
        assert_eq!(receive(&mut output).await["id"], 9);

        drop(input);
        task.await.unwrap().unwrap();
    }
}
