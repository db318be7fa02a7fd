//! MCP server loop
//!
//! Reads newline-delimited JSON-RPC messages, answers protocol methods inline
//! and runs each `tools/call` as its own task. All replies go through one
//! writer task, so lines never interleave on the output.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use router_core::{catalog, Dispatcher};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::error::McpError;
use crate::protocol::{
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ServerCapabilities,
    ServerInfo, ToolsCapability, ToolsListResult, SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::tools::{tool_definitions, tool_result};

const SERVER_NAME: &str = "routerd";

/// MCP server exposing the operation catalog as tools
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
    requests: AtomicU64,
    in_flight: AtomicUsize,
}

impl McpServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            requests: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Tool calls spawned and not yet reaped
    pub fn in_flight_calls(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Serve on the process's stdin/stdout until stdin closes
    pub async fn run_stdio(&self) -> Result<(), McpError> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await?;
        Ok(())
    }

    /// Serve until `reader` reaches end of input.
    ///
    /// Finished tool calls are reaped while input is still open. At end of
    /// input the remaining calls are awaited, then the writer is returned.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<W, McpError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(rx, writer));
        let mut calls = JoinSet::new();
        let mut lines = BufReader::new(reader).lines();

        info!("MCP server starting");
        loop {
            tokio::select! {
                Some(joined) = calls.join_next(), if !calls.is_empty() => {
                    self.reaped(joined, calls.len());
                }
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    self.handle_line(&line, &tx, &mut calls);
                }
            }
        }

        info!(in_flight = calls.len(), "Input closed, waiting for tool calls");
        while let Some(joined) = calls.join_next().await {
            self.reaped(joined, calls.len());
        }
        drop(tx);
        let writer = writer_task
            .await
            .map_err(|e| McpError::Internal(e.to_string()))??;
        info!("MCP server stopped");
        Ok(writer)
    }

    fn handle_line(
        &self,
        line: &str,
        tx: &mpsc::UnboundedSender<JsonRpcResponse>,
        calls: &mut JoinSet<()>,
    ) {
        if line.trim().is_empty() {
            return;
        }
        let req_id = self.requests.fetch_add(1, Ordering::Relaxed);
        debug!(req_id, raw = %line, "Received JSON-RPC message");

        let request = match parse_request(line) {
            Ok(request) => request,
            Err((id, err)) => {
                warn!(req_id, error = %err, "Rejected JSON-RPC message");
                let _ = tx.send(JsonRpcResponse::error(id, err.into()));
                return;
            }
        };

        if request.method == "tools/call" {
            let dispatcher = self.dispatcher.clone();
            let tx = tx.clone();
            calls.spawn(async move {
                let result = call_tool(&dispatcher, &request.params).await;
                if let Some(response) = respond(&request, result) {
                    let _ = tx.send(response);
                }
            });
            self.in_flight.store(calls.len(), Ordering::SeqCst);
        } else if let Some(response) = respond(&request, self.handle(&request)) {
            let _ = tx.send(response);
        }
    }

    fn reaped(&self, joined: Result<(), JoinError>, remaining: usize) {
        if let Err(e) = joined {
            warn!(error = %e, "Tool call task failed");
        }
        self.in_flight.store(remaining, Ordering::SeqCst);
    }

    /// Protocol methods other than `tools/call`
    fn handle(&self, request: &JsonRpcRequest) -> Result<Value, McpError> {
        match request.method.as_str() {
            "initialize" => self.initialize(&request.params),
            "notifications/initialized" | "initialized" => {
                debug!("Client finished initialization");
                Ok(json!({}))
            }
            "notifications/cancelled" => Ok(json!({})),
            "ping" => Ok(json!({})),
            "tools/list" => {
                let result = ToolsListResult {
                    tools: tool_definitions(),
                };
                Ok(serde_json::to_value(result)?)
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    fn initialize(&self, params: &Value) -> Result<Value, McpError> {
        let requested = params["protocolVersion"].as_str();
        let version = requested
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
            .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0]);
        info!(
            client = params["clientInfo"]["name"].as_str().unwrap_or("unknown"),
            protocol_version = version,
            "MCP session initialized"
        );

        let result = InitializeResult {
            protocol_version: version.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Tools manage a home router. Failures are reported in the result's \
                 `error` key, not as tool errors."
                    .to_string(),
            ),
        };
        Ok(serde_json::to_value(result)?)
    }
}

/// Parse a line into a request, or the id and error to answer with
fn parse_request(line: &str) -> Result<JsonRpcRequest, (Value, McpError)> {
    let raw: Value =
        serde_json::from_str(line).map_err(|e| (Value::Null, McpError::Parse(e.to_string())))?;
    let id = raw.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = serde_json::from_value(raw)
        .map_err(|e| (id.clone(), McpError::InvalidRequest(e.to_string())))?;
    if request.jsonrpc != "2.0" {
        return Err((
            id,
            McpError::InvalidRequest(format!("Unsupported JSON-RPC version: {}", request.jsonrpc)),
        ));
    }
    Ok(request)
}

/// Turn a handler result into a response; notifications get none
fn respond(request: &JsonRpcRequest, result: Result<Value, McpError>) -> Option<JsonRpcResponse> {
    let Some(id) = request.id.clone() else {
        if let Err(e) = result {
            warn!(method = %request.method, error = %e, "Notification handling failed");
        }
        return None;
    };
    Some(match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, JsonRpcError::from(e)),
    })
}

async fn call_tool(dispatcher: &Dispatcher, params: &Value) -> Result<Value, McpError> {
    let name = params["name"]
        .as_str()
        .ok_or_else(|| McpError::InvalidParams("Missing 'name' parameter".to_string()))?;
    if catalog::find(name).is_none() {
        return Err(McpError::UnknownTool(name.to_string()));
    }
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

    debug!(tool = name, arguments = %arguments, "Dispatching tool call");
    let envelope = dispatcher.call(name, &arguments).await;
    if let Some(message) = envelope.error_message() {
        info!(tool = name, error = message, "Tool call returned an error envelope");
    }
    Ok(serde_json::to_value(tool_result(envelope))?)
}

async fn write_responses<W>(
    mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
    mut writer: W,
) -> Result<W, McpError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_string(&response)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_a_parse_error_with_null_id() {
        let (id, err) = parse_request("{nope").unwrap_err();
        assert_eq!(id, Value::Null);
        assert_eq!(err.code(), JsonRpcError::PARSE_ERROR);
    }

    #[test]
    fn wrong_version_keeps_the_request_id() {
        let (id, err) =
            parse_request(r#"{"jsonrpc":"1.0","id":7,"method":"ping"}"#).unwrap_err();
        assert_eq!(id, json!(7));
        assert_eq!(err.code(), JsonRpcError::INVALID_REQUEST);
    }

    #[test]
    fn notifications_get_no_response() {
        let request =
            parse_request(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(request.is_notification());
        assert!(respond(&request, Ok(json!({}))).is_none());
    }
}
