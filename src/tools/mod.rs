//! Tool system for agent capabilities.
//!
//! Tool requests pass through the I/O context's tool filter, then the
//! named tool runs under the active security policy.

pub mod shell;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::io::IoContext;
use crate::security::SecurityPolicy;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_use_id: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

/// Executes a tool request under the given policy.
///
/// The request is routed through the context's tool filter first, then
/// dispatched by name. Tool-level failures come back as an error
/// `ToolResult`, not an `Err`.
pub async fn execute_tool(
    request: ToolRequest,
    policy: &SecurityPolicy,
    io: &IoContext,
) -> Result<ToolResult> {
    let request = io.filter_tool(request);

    let content = match request.name.as_str() {
        "shell" => shell::execute(&request.arguments, policy, io).await,
        other => Err(anyhow::anyhow!("Unknown tool: {}", other)),
    };

    match content {
        Ok(text) => Ok(ToolResult {
            tool_use_id: request.id,
            content: text,
            is_error: false,
        }),
        Err(e) => Ok(ToolResult {
            tool_use_id: request.id,
            content: format!("Error: {e:#}"),
            is_error: true,
        }),
    }
}
