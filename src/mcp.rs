//! Model Context Protocol server over stdio.
//!
//! Speaks newline-delimited JSON-RPC 2.0: one request per line on the
//! reader, one response per line on the writer. Only the tool surface is
//! implemented (`initialize`, `ping`, `tools/list`, `tools/call`). Requests
//! are handled one at a time.

use crate::tools::{ToolError, ToolExecutor, definitions};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

pub const SERVER_NAME: &str = "seo-gsc-analysis";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Response {
    fn reply(id: Value, outcome: Result<Value, RpcError>) -> Self {
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err)),
        };
        Self {
            jsonrpc: "2.0",
            id,
            result,
            error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub struct Server {
    tools: ToolExecutor,
}

impl Server {
    pub fn new(tools: ToolExecutor) -> Self {
        Self { tools }
    }

    /// Handles one line of input, returning the serialized response if one is due.
    ///
    /// Notifications (messages without an `id`) never produce a response.
    pub fn handle_line(&self, line: &str) -> Option<String> {
        match serde_json::from_str::<Value>(line) {
            Err(e) => parse_error(format!("Parse error: {e}")),
            Ok(message) => encode(&self.handle_message(message)?),
        }
    }

    fn handle_message(&self, message: Value) -> Option<Response> {
        let id = message.get("id").cloned().unwrap_or(Value::Null);
        let request: Request = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                return Some(Response::reply(
                    id,
                    Err(RpcError::new(INVALID_REQUEST, format!("Invalid request: {e}"))),
                ));
            }
        };

        let Some(id) = request.id else {
            debug!(method = %request.method, "Notification received");
            return None;
        };

        let outcome = self.dispatch(&request.method, request.params);
        Some(Response::reply(id, outcome))
    }

    fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        debug!(method, "Dispatching request");
        match method {
            "initialize" => {
                let version = params
                    .get("protocolVersion")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_PROTOCOL_VERSION);
                Ok(json!({
                    "protocolVersion": version,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }))
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": definitions() })),
            "tools/call" => self.call_tool(params),
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        }
    }

    fn call_tool(&self, params: Value) -> Result<Value, RpcError> {
        let call: CallParams = serde_json::from_value(params)
            .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")))?;

        match self.tools.execute(&call.name, call.arguments) {
            Ok(value) => Ok(tool_result(value.to_string(), false)),
            Err(ToolError::UnknownTool(name)) => Err(RpcError::new(
                INVALID_PARAMS,
                format!("Unknown tool: {name}"),
            )),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                Ok(tool_result(e.to_string(), true))
            }
        }
    }

    /// Serves requests from `reader` until end of input.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_line(line.trim()),
                Err(e) => {
                    warn!(error = %e, "Discarding line that is not valid UTF-8");
                    parse_error(format!("Parse error: {e}"))
                }
            };
            if let Some(response) = response {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        info!("Input closed, shutting down");
        Ok(())
    }
}

fn parse_error(message: String) -> Option<String> {
    encode(&Response::reply(
        Value::Null,
        Err(RpcError::new(PARSE_ERROR, message)),
    ))
}

fn encode(response: &Response) -> Option<String> {
    match serde_json::to_string(response) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(error = %e, "Failed to serialize response");
            None
        }
    }
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error
    })
}

/// Runs the server on the process's stdin and stdout.
pub async fn run_stdio(tools: ToolExecutor) -> Result<()> {
    info!(server = SERVER_NAME, "Serving tools over stdio");
    Server::new(tools)
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use tempfile::TempDir;

    fn sample_server() -> (TempDir, Server) {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("gsc.csv"),
            "query,page,clicks,impressions,ctr,position\n\
             seo audit,/a,10,100,0.1,8.0\n\
             seo checker,/a,5,200,0.025,11.0\n\
             gsc report,/b,30,300,0.1,3.0\n",
        )
        .unwrap();
        let settings = Settings {
            data_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        (dir, Server::new(ToolExecutor::new(&settings)))
    }

    fn call(server: &Server, request: Value) -> Value {
        let line = server.handle_line(&request.to_string()).unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[test]
    fn test_initialize_echoes_protocol_version() {
        let (_dir, server) = sample_server();
        let resp = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2025-03-26"}}),
        );
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(resp["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(resp["result"]["capabilities"]["tools"].is_object());
    }

    #[test]
    fn test_notification_has_no_response() {
        let (_dir, server) = sample_server();
        let line = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
        assert!(server.handle_line(&line).is_none());
    }

    #[test]
    fn test_tools_list() {
        let (_dir, server) = sample_server();
        let resp = call(&server, json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"}));
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[0]["name"], "gsc_summary");
        assert!(tools[1]["inputSchema"]["properties"]["limit"].is_object());
    }

    #[test]
    fn test_tools_call_success() {
        let (_dir, server) = sample_server();
        let resp = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "gsc_top_queries", "arguments": {"path": "gsc.csv", "limit": 2}}}),
        );
        assert_eq!(resp["result"]["isError"], false);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        let queries: Value = serde_json::from_str(text).unwrap();
        assert_eq!(queries[0]["query"], "gsc report");
        assert_eq!(queries[1]["query"], "seo audit");
    }

    #[test]
    fn test_tools_call_failure_is_tool_error() {
        let (_dir, server) = sample_server();
        let resp = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "gsc_summary", "arguments": {"path": "absent.csv"}}}),
        );
        assert_eq!(resp["result"]["isError"], true);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Path does not exist:"));
    }

    #[test]
    fn test_unknown_tool_and_method() {
        let (_dir, server) = sample_server();
        let resp = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {"name": "nope"}}),
        );
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);

        let resp = call(&server, json!({"jsonrpc": "2.0", "id": 5, "method": "resources/list"}));
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
        assert!(resp.get("result").is_none());
    }

    #[test]
    fn test_malformed_input() {
        let (_dir, server) = sample_server();
        let resp: Value = serde_json::from_str(&server.handle_line("{oops").unwrap()).unwrap();
        assert_eq!(resp["error"]["code"], PARSE_ERROR);
        assert!(resp["id"].is_null());

        let resp = call(&server, json!({"jsonrpc": "2.0", "id": 6}));
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
        assert_eq!(resp["id"], 6);

        let resp = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": {}}),
        );
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_serve_survives_invalid_utf8_line() {
        let (_dir, server) = sample_server();
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);

        let mut out = Vec::new();
        server
            .serve(BufReader::new(input.as_slice()), &mut out)
            .await
            .unwrap();

        let output = String::from_utf8(out).unwrap();
        let responses: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert!(responses[0]["id"].is_null());
        assert_eq!(responses[1]["id"], 1);
        assert_eq!(responses[1]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_serve_reads_until_eof() {
        let (_dir, server) = sample_server();
        let input = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}).to_string(),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
            String::new(),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "gsc_summary", "arguments": {"path": "gsc.csv"}}})
            .to_string(),
        ]
        .join("\n");

        let mut out = Vec::new();
        server
            .serve(BufReader::new(input.as_bytes()), &mut out)
            .await
            .unwrap();

        let output = String::from_utf8(out).unwrap();
        let responses: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(
            responses[0]["result"]["protocolVersion"],
            DEFAULT_PROTOCOL_VERSION
        );
        let summary: Value =
            serde_json::from_str(responses[1]["result"]["content"][0]["text"].as_str().unwrap())
                .unwrap();
        assert_eq!(summary["rows"], 3);
        assert_eq!(summary["total_clicks"], 45.0);
    }
}
