//! Error types for the Xpoz SDK

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the SDK
#[derive(Error, Debug)]
pub enum Error {
    /// No API key could be resolved when building the client
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Transport could not reach the server or the session is not open
    #[error("Connection error: {0}")]
    Connection(String),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed JSON-RPC or MCP envelope
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server flagged a tool call as failed
    #[error("MCP tool error ({tool}): {message}")]
    Tool { tool: String, message: String },

    /// Polling gave up before the operation reached a terminal state
    #[error("Operation {operation_id} timed out after {elapsed_seconds:.0}s")]
    OperationTimeout {
        operation_id: String,
        elapsed_seconds: f64,
    },

    /// The server reported the operation as failed
    #[error("Operation {operation_id} failed: {error}")]
    OperationFailed { operation_id: String, error: String },

    /// The operation was cancelled server-side
    #[error("Operation {operation_id} was cancelled")]
    OperationCancelled { operation_id: String },

    /// Pagination navigation outside `[1, total_pages]`
    #[error("Page {page} out of range (1-{total_pages})")]
    OutOfRange { page: i64, total_pages: i64 },

    /// The result carried no export operation to resolve
    #[error("CSV export not available for this result")]
    ExportUnavailable,

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid arguments or an unparseable record
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a new authentication error
    pub fn authentication(msg: impl Into<String>) -> Self {
        Error::Authentication(msg.into())
    }

    /// Create a new connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Error::Connection(msg.into())
    }

    /// Create a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a new tool error
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// The operation id carried by a poller outcome, if this is one
    pub fn operation_id(&self) -> Option<&str> {
        match self {
            Error::OperationTimeout { operation_id, .. }
            | Error::OperationFailed { operation_id, .. }
            | Error::OperationCancelled { operation_id } => Some(operation_id),
            _ => None,
        }
    }
}
