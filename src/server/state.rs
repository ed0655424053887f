//! Server state management.

use crate::config::Settings;
use crate::pipeline::QuestionPipeline;
use crate::protocol::ClientInfo;
use crate::tools::ToolRegistry;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct ServerState {
    pub settings: Settings,
    pub pipeline: Arc<QuestionPipeline>,
    pub tools: ToolRegistry,
    client_info: RwLock<Option<ClientInfo>>,
    tool_calls: AtomicU64,
}

impl ServerState {
    pub fn new(settings: Settings, pipeline: Arc<QuestionPipeline>) -> Self {
        let tools = crate::tools::create_registry(Arc::clone(&pipeline));
        Self {
            settings,
            pipeline,
            tools,
            client_info: RwLock::new(None),
            tool_calls: AtomicU64::new(0),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.client_info.read().is_some()
    }

    pub fn set_client_info(&self, client_info: ClientInfo) {
        *self.client_info.write() = Some(client_info);
    }

    pub fn client_info(&self) -> Option<ClientInfo> {
        self.client_info.read().clone()
    }

    /// Counts a tool call and returns its sequence number.
    pub fn next_tool_call(&self) -> u64 {
        self.tool_calls.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn tool_calls(&self) -> u64 {
        self.tool_calls.load(Ordering::SeqCst)
    }
}
