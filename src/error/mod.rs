//! Error types for the video analytics server.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.

use std::borrow::Cow;
use thiserror::Error;

/// Maximum number of characters of a SQL statement echoed in errors and logs.
pub const PREVIEW_CHARS: usize = 100;

/// Returns at most `max` characters of `text`, respecting char boundaries.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Main error type for the server.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: Cow<'static, str> },
}

impl From<SqlRejection> for McpError {
    fn from(rejection: SqlRejection) -> Self {
        Self::Security(SecurityError::Rejected(rejection))
    }
}

impl McpError {
    /// Short sentence safe to show to the person who asked the question.
    ///
    /// Never includes SQL, driver messages or upstream response bodies.
    pub fn user_message(&self) -> Cow<'static, str> {
        match self {
            Self::Security(SecurityError::RateLimited { retry_after_secs }) => format!(
                "Too many requests. Please wait {} s before asking again.",
                retry_after_secs
            )
            .into(),
            Self::Tool(ToolError::MissingArgument(_)) => {
                "Please send a text question.".into()
            }
            Self::Tool(ToolError::InvalidArguments(_)) | Self::Tool(ToolError::NotFound(_)) => {
                "The request could not be understood.".into()
            }
            Self::Security(SecurityError::Rejected(_))
            | Self::Llm(_)
            | Self::Execution(_) => {
                "Could not process the question. Try rephrasing it.".into()
            }
            _ => "Internal error. Please try again later.".into(),
        }
    }
}

/// JSON-RPC 2.0 and MCP protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Parse error: invalid JSON")]
    ParseError,

    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(Cow<'static, str>),

    #[error("Internal error: {0}")]
    InternalError(Cow<'static, str>),

    #[error("Server not initialized")]
    NotInitialized,
}

impl ProtocolError {
    /// Returns the JSON-RPC 2.0 error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::InternalError(_) => -32603,
            Self::NotInitialized => -32002,
        }
    }
}

/// A candidate statement failed one of the SQL guard rules.
///
/// Each variant is one rule; the first failing rule decides the variant.
/// `preview` holds at most [`PREVIEW_CHARS`] characters of the statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlRejection {
    #[error("SQL must start with SELECT. Query: {preview}")]
    NotASelect { preview: String },

    #[error("SQL contains forbidden keyword: {keyword}")]
    ForbiddenKeyword { keyword: String, preview: String },

    #[error("SQL must use an aggregate function (COUNT, SUM, AVG, MIN, MAX)")]
    MissingAggregate { preview: String },
}

impl SqlRejection {
    /// Stable identifier of the violated rule.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::NotASelect { .. } => "not_a_select",
            Self::ForbiddenKeyword { .. } => "forbidden_keyword",
            Self::MissingAggregate { .. } => "missing_aggregate",
        }
    }

    /// Bounded preview of the offending statement.
    pub fn preview(&self) -> &str {
        match self {
            Self::NotASelect { preview }
            | Self::ForbiddenKeyword { preview, .. }
            | Self::MissingAggregate { preview } => preview,
        }
    }
}

/// Security-related errors.
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error(transparent)]
    Rejected(#[from] SqlRejection),

    #[error("Rate limit exceeded: retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// Language-model client errors.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM request timed out after {0}ms")]
    Timeout(u64),

    #[error("LLM HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid LLM response format: {0}")]
    InvalidResponse(Cow<'static, str>),

    #[error("LLM returned an empty completion")]
    EmptyCompletion,
}

impl LlmError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse(_) | Self::EmptyCompletion => false,
        }
    }
}

/// Query execution errors.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("SQL execution failed: {message}. Query: {preview}")]
    QueryFailed { message: String, preview: String },

    #[error("Query timeout after {0}ms")]
    Timeout(u64),

    #[error("SQL returned {rows} row(s) and {columns} column(s), expected a single scalar. Query: {preview}")]
    NotScalar {
        rows: usize,
        columns: usize,
        preview: String,
    },

    #[error("SQL returned boolean ({value}), expected numeric. Query: {preview}")]
    BooleanResult { value: bool, preview: String },

    #[error("SQL returned non-numeric result: {type_name} = {value}. Query: {preview}")]
    NonNumeric {
        type_name: String,
        value: String,
        preview: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required variable: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
}

/// Tool execution errors.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(Cow<'static, str>),
}

/// Result type alias for McpError.
pub type Result<T> = std::result::Result<T, McpError>;

/// Result type alias for ExecutionError.
pub type DbResult<T> = std::result::Result<T, ExecutionError>;

/// Result type alias for LlmError.
pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Result type alias for ProtocolError.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Result type alias for SecurityError.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;
