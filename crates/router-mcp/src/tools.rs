//! Tool definitions derived from the operation catalog

use router_core::{Envelope, OPERATIONS};

use crate::protocol::{ToolContent, ToolDefinition, ToolResult};

/// One tool per catalog operation, in catalog order
pub fn tool_definitions() -> Vec<ToolDefinition> {
    OPERATIONS
        .iter()
        .map(|op| ToolDefinition {
            name: op.name.to_string(),
            description: op.description.to_string(),
            input_schema: op.input_schema(),
        })
        .collect()
}

/// Wrap an envelope as a tool result.
///
/// Error envelopes are returned the same way as successes (`isError: false`);
/// the caller reads the `error` key.
pub fn tool_result(envelope: Envelope) -> ToolResult {
    let value = envelope.into_value();
    ToolResult {
        content: vec![ToolContent::Text {
            text: value.to_string(),
        }],
        structured_content: Some(value),
        is_error: false,
    }
}
