//! MCP stdio runtime exposing NetBox as tools.

use clap::Subcommand;
use netbox_core::{BranchApi, NetBoxApi};
use serde_json::{Map, Value, json};
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::Instrument;
use uuid::Uuid;

mod config;
pub mod dispatch;
pub mod object_types;
mod tools;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, NetBoxArgs};
pub use dispatch::{DispatchError, Dispatcher};

use tools::{ToolCallError, execute_tool, tool_definitions};

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SERVER_NAME: &str = "netbox-mcp";
const STATUS_ENDPOINT: &str = "status";
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum McpCommands {
    /// Run the MCP server over stdio (default)
    Serve,
    /// Check connectivity and credentials against NetBox, then exit
    Check,
}

pub async fn run(netbox: NetBoxArgs, command: Option<McpCommands>) -> i32 {
    let client = match netbox.build_client() {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            let payload = json!({
                "error": "config_error",
                "message": err.to_string(),
            });
            eprintln!("{}", to_pretty_json(&payload));
            return 1;
        }
    };

    match command.unwrap_or(McpCommands::Serve) {
        McpCommands::Serve => {
            let server = McpServer::new(client);
            match server.serve_stdio().await {
                Ok(()) => 0,
                Err(err) => {
                    let payload = json!({
                        "error": "mcp_server_error",
                        "message": err,
                    });
                    eprintln!("{}", to_pretty_json(&payload));
                    1
                }
            }
        }
        McpCommands::Check => {
            let api_url = client.api_url().to_string();
            let (report, ok) = run_check(&client, &api_url).await;
            println!("{}", to_pretty_json(&report));
            if ok { 0 } else { 1 }
        }
    }
}

/// Fetches `status/` and summarizes it as a report.
async fn run_check<C: NetBoxApi + BranchApi>(client: &C, api_url: &str) -> (Value, bool) {
    let checked_at = chrono::Utc::now().to_rfc3339();
    let branch = client.active_branch();
    match client.get(STATUS_ENDPOINT, None, &[]).await {
        Ok(status) => {
            tracing::info!(api_url, "netbox reachable");
            let report = json!({
                "status": "ok",
                "checked_at": checked_at,
                "api_url": api_url,
                "active_branch": branch,
                "netbox_version": status.get("netbox-version").cloned().unwrap_or(Value::Null),
                "netbox_status": status,
            });
            (report, true)
        }
        Err(err) => {
            tracing::warn!(api_url, error = %err, "netbox check failed");
            let report = json!({
                "status": "error",
                "checked_at": checked_at,
                "api_url": api_url,
                "active_branch": branch,
                "error": {
                    "message": err.to_string(),
                    "http_status": err.status(),
                },
            });
            (report, false)
        }
    }
}

struct McpServer<C> {
    dispatcher: Dispatcher<C>,
    session_id: String,
}

impl<C: NetBoxApi + BranchApi> McpServer<C> {
    fn new(client: C) -> Self {
        Self {
            dispatcher: Dispatcher::new(client),
            session_id: format!("stdio-{}", Uuid::now_v7()),
        }
    }

    async fn serve_stdio(&self) -> Result<(), String> {
        let span = tracing::info_span!("mcp_session", session_id = %self.session_id);
        let reader = BufReader::new(io::stdin());
        let writer = io::stdout();
        self.serve(reader, writer).instrument(span).await
    }

    async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            server = MCP_SERVER_NAME,
            version = env!("CARGO_PKG_VERSION"),
            active_branch = self.dispatcher.client().active_branch().as_deref().unwrap_or("main"),
            "mcp session started"
        );

        loop {
            let incoming = read_message(&mut reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            let Some(incoming) = incoming else {
                break;
            };

            let responses = match incoming.payload {
                Ok(message) => self.handle_incoming_message(message).await,
                Err(err) => vec![error_response(
                    Value::Null,
                    RpcError::parse_error(format!("Invalid JSON payload: {err}")),
                )],
            };
            for response in responses {
                write_message(&mut writer, incoming.framing, &response)
                    .await
                    .map_err(|e| format!("Failed to write MCP response: {e}"))?;
            }
        }

        tracing::info!("mcp session closed");
        Ok(())
    }

    async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        // Responses from the client carry no method; nothing to answer.
        let method = obj.get("method").and_then(Value::as_str)?;

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        let id = obj.get("id").cloned()?;
        let result = self.handle_request(method, params).await;
        Some(match result {
            Ok(payload) => success_response(id, payload),
            Err(err) => error_response(id, err),
        })
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "listChanged": false },
                "prompts": { "listChanged": false }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": "Read NetBox with get_objects, get_object_by_id and search_netbox. object_type must be one of the names listed in the get_objects description. Writes (create_object, update_object, delete_object and the bulk_* tools) apply to the active branch; use list_branches and set_active_branch to stage changes in a branch before merge_branch."
        })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        tracing::info!(tool = name, "tool call");
        match execute_tool(&self.dispatcher, name, &args).await {
            Ok(data) => {
                let envelope = json!({
                    "status": "success",
                    "tool": name,
                    "data": data,
                });
                Ok(build_tool_call_response(envelope, false))
            }
            Err(ToolCallError::UnknownTool(tool)) => {
                Err(RpcError::invalid_params(format!("Unknown tool: {tool}")))
            }
            Err(ToolCallError::InvalidArguments(message)) => {
                tracing::warn!(tool = name, %message, "rejected tool arguments");
                Err(RpcError::invalid_params(message).with_data(json!({ "tool": name })))
            }
            Err(ToolCallError::Dispatch(err)) => {
                tracing::warn!(tool = name, code = err.code(), "tool call failed");
                let envelope = json!({
                    "status": "error",
                    "tool": name,
                    "error": err.to_value(),
                });
                Ok(build_tool_call_response(envelope, true))
            }
        }
    }
}

fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tool_definitions()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

fn build_tool_call_response(envelope: Value, is_error: bool) -> Value {
    let text = to_pretty_json(&envelope);
    if is_error {
        json!({
            "isError": true,
            "content": [{ "type": "text", "text": text }],
            "structuredContent": envelope
        })
    } else {
        json!({
            "content": [{ "type": "text", "text": text }],
            "structuredContent": envelope
        })
    }
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    });
    if let Some(data) = error.data {
        payload["error"]["data"] = data;
    }
    payload
}

/// How a message arrived; the reply goes back the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Framing {
    ContentLength,
    Line,
}

struct Incoming {
    framing: Framing,
    payload: Result<Value, serde_json::Error>,
}

/// Reads one message, either `Content-Length` framed or a single JSON line.
/// Returns `None` on a clean EOF.
async fn read_message<R>(reader: &mut R) -> Result<Option<Incoming>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        if !line.trim().is_empty() {
            break;
        }
    }

    let first = line.trim();
    if first.starts_with(['{', '[']) || !first.contains(':') {
        return Ok(Some(Incoming {
            framing: Framing::Line,
            payload: serde_json::from_str(first),
        }));
    }

    let mut content_length = parse_content_length(first)?;
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }
        let header = line.trim_end_matches(['\r', '\n']);
        if header.is_empty() {
            break;
        }
        if let Some(parsed) = parse_content_length(header)? {
            content_length = Some(parsed);
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    if content_length > MAX_FRAME_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Content-Length {content_length} exceeds the {MAX_FRAME_BYTES} byte limit"),
        ));
    }
    let mut payload = vec![0_u8; content_length];
    reader.read_exact(&mut payload).await?;

    Ok(Some(Incoming {
        framing: Framing::ContentLength,
        payload: serde_json::from_slice(&payload),
    }))
}

fn parse_content_length(header: &str) -> Result<Option<usize>, std::io::Error> {
    let Some((name, value)) = header.split_once(':') else {
        return Ok(None);
    };
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return Ok(None);
    }
    value.trim().parse::<usize>().map(Some).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Invalid Content-Length header",
        )
    })
}

async fn write_message<W>(
    writer: &mut W,
    framing: Framing,
    value: &Value,
) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
        Framing::Line => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await?;
    Ok(())
}

fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
