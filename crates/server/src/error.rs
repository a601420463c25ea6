//! Structured errors for the shellcache MCP tools.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Errors raised by tool plumbing rather than by the worker itself.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    Output(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidInput(_) => -32602,
            ToolError::Output(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_codes() {
        let err: McpError = ToolError::InvalidInput("url cannot be empty".into()).into();
        assert_eq!(err.code.0, -32602);
        assert!(err.message.contains("url cannot be empty"));
    }
}
