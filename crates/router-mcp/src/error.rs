//! MCP protocol errors
//!
//! Only protocol faults live here. Operation failures are not errors at this
//! layer: they travel inside a successful tool result.

use thiserror::Error;

use crate::protocol::JsonRpcError;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        match self {
            McpError::Parse(_) => JsonRpcError::PARSE_ERROR,
            McpError::InvalidRequest(_) => JsonRpcError::INVALID_REQUEST,
            McpError::MethodNotFound(_) => JsonRpcError::METHOD_NOT_FOUND,
            McpError::InvalidParams(_) | McpError::UnknownTool(_) => JsonRpcError::INVALID_PARAMS,
            McpError::Internal(_) | McpError::Io(_) => JsonRpcError::INTERNAL_ERROR,
        }
    }
}

impl From<McpError> for JsonRpcError {
    fn from(err: McpError) -> Self {
        JsonRpcError::new(err.code(), err.to_string())
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        McpError::Internal(err.to_string())
    }
}
