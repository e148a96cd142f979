//! Tool-call transport
//!
//! The rest of the SDK only needs one capability: invoke a named remote tool
//! with a map of arguments and get back a decoded [`Payload`]. That capability
//! is the [`ToolTransport`] trait. [`McpTransport`] implements it over MCP's
//! streamable HTTP binding:
//!
//! ```text
//! connect()   POST initialize ──> Mcp-Session-Id
//!             POST notifications/initialized
//! call_tool() POST tools/call {name, arguments}
//!               <── application/json        (single JSON-RPC response)
//!               <── text/event-stream       (SSE; the event whose id matches)
//!             text content blocks ──> decoder::parse_response_text
//! close()     DELETE (session id)
//! ```
//!
//! A session carries at most one request at a time: the session state is held
//! behind an async mutex for the full round-trip of every request.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::decoder::parse_response_text;
use crate::types::Payload;
use crate::{Error, Result};

/// Protocol revision announced during `initialize`
pub const PROTOCOL_VERSION: &str = "2025-06-18";

const CLIENT_NAME: &str = "xpoz-rust-sdk";
const USER_AGENT: &str = concat!("xpoz-rust-sdk/", env!("CARGO_PKG_VERSION"));
const SESSION_HEADER: &str = "Mcp-Session-Id";
const PROTOCOL_HEADER: &str = "MCP-Protocol-Version";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Capability to invoke remote tools.
///
/// `connect` and `close` default to no-ops so that in-process implementations
/// only provide `call_tool`.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Invoke `name` with `arguments` and decode the textual result.
    async fn call_tool(&self, name: &str, arguments: Payload) -> Result<Payload>;

    /// Open the session. Calling it on an open session is a no-op.
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    /// Close the session. Calling it on a closed session is a no-op.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SessionState {
    connected: bool,
    session_id: Option<String>,
    protocol_version: Option<String>,
}

/// MCP client session over streamable HTTP
pub struct McpTransport {
    http: reqwest::Client,
    server_url: String,
    api_key: String,
    session: Mutex<SessionState>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for McpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpTransport")
            .field("server_url", &self.server_url)
            .field("api_key", &"***")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ToolCallResult {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default, rename = "isError")]
    is_error: bool,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl ToolCallResult {
    fn combined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .collect()
    }
}

impl McpTransport {
    /// Create a transport for `server_url`. No network activity until [`connect`](ToolTransport::connect).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn new(server_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        // no read timeout: slow tools answer with an operation id instead
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            server_url: server_url.into(),
            api_key: api_key.into(),
            session: Mutex::new(SessionState::default()),
            next_id: AtomicU64::new(1),
        })
    }

    /// The MCP endpoint this transport talks to
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Whether `connect` has completed and `close` has not been called since
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.connected
    }

    fn headers(&self, state: &SessionState) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::authentication("API key contains characters not allowed in a header"))?;
        headers.insert(AUTHORIZATION, bearer);

        if let Some(id) = &state.session_id {
            let value = HeaderValue::from_str(id)
                .map_err(|_| Error::protocol(format!("invalid session id from server: {}", id)))?;
            headers.insert(SESSION_HEADER, value);
        }
        if let Some(version) = &state.protocol_version {
            if let Ok(value) = HeaderValue::from_str(version) {
                headers.insert(PROTOCOL_HEADER, value);
            }
        }
        Ok(headers)
    }

    /// POST one JSON-RPC message. Returns the matching response for requests,
    /// `None` for notifications.
    async fn post(
        &self,
        state: &mut SessionState,
        method: &str,
        params: Option<Value>,
        expect_response: bool,
    ) -> Result<Option<JsonRpcResponse>> {
        let id = expect_response.then(|| self.next_id.fetch_add(1, Ordering::SeqCst));
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        log::debug!("MCP {} -> {}", method, self.server_url);

        let response = self
            .http
            .post(&self.server_url)
            .headers(self.headers(state)?)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::connection(format!("POST {} failed: {}", self.server_url, e)))?;

        if let Some(session_id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            state.session_id = Some(session_id.to_string());
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::authentication(format!(
                "server rejected the API key ({}): {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                log::warn!("Failed to read error response body: {}", e);
                String::new()
            });
            return Err(Error::connection(format!("{} returned {}: {}", method, status, body)));
        }

        let Some(id) = id else {
            return Ok(None);
        };
        if status == StatusCode::ACCEPTED {
            return Err(Error::protocol(format!("{} was accepted without a response", method)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.contains("text/event-stream") {
            let mut events = response.bytes_stream().eventsource();
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| Error::protocol(format!("SSE stream error: {}", e)))?;
                if event.data.trim().is_empty() {
                    continue;
                }
                let message: JsonRpcResponse = match serde_json::from_str(&event.data) {
                    Ok(m) => m,
                    Err(e) => {
                        log::debug!("skipping non-response SSE event: {}", e);
                        continue;
                    }
                };
                if response_matches(&message, id) {
                    return Ok(Some(message));
                }
            }
            return Err(Error::protocol(format!(
                "SSE stream for {} ended without a response",
                method
            )));
        }

        let body = response.bytes().await?;
        let message: JsonRpcResponse = serde_json::from_slice(&body)?;
        if !response_matches(&message, id) {
            return Err(Error::protocol(format!("response id mismatch for {}", method)));
        }
        Ok(Some(message))
    }
}

fn response_matches(message: &JsonRpcResponse, id: u64) -> bool {
    message.id.as_ref().and_then(Value::as_u64) == Some(id)
}

/// Turn a `tools/call` result into a decoded payload
fn parse_tool_result(tool_name: &str, result: Value) -> Result<Payload> {
    let result: ToolCallResult = serde_json::from_value(result)?;
    let text = result.combined_text();
    if result.is_error {
        return Err(Error::tool(tool_name, text));
    }
    Ok(parse_response_text(&text))
}

#[async_trait]
impl ToolTransport for McpTransport {
    async fn connect(&self) -> Result<()> {
        let mut state = self.session.lock().await;
        if state.connected {
            return Ok(());
        }

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": CLIENT_NAME, "version": env!("CARGO_PKG_VERSION")},
        });

        let response = self
            .post(&mut state, "initialize", Some(params), true)
            .await?
            .ok_or_else(|| Error::protocol("initialize returned no response"))?;

        if let Some(err) = response.error {
            return Err(Error::connection(format!(
                "initialize failed ({}): {}",
                err.code, err.message
            )));
        }

        state.protocol_version = response
            .result
            .as_ref()
            .and_then(|r| r.get("protocolVersion"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(PROTOCOL_VERSION.to_string()));

        self.post(&mut state, "notifications/initialized", None, false)
            .await?;

        state.connected = true;
        log::debug!(
            "MCP session established (session id: {:?})",
            state.session_id
        );
        Ok(())
    }

    async fn call_tool(&self, name: &str, arguments: Payload) -> Result<Payload> {
        let mut state = self.session.lock().await;
        if !state.connected {
            return Err(Error::connection(
                "Transport not connected. Call connect() first.",
            ));
        }

        let params = json!({"name": name, "arguments": Value::Object(arguments)});
        let response = self
            .post(&mut state, "tools/call", Some(params), true)
            .await?
            .ok_or_else(|| Error::protocol("tools/call returned no response"))?;

        if let Some(err) = response.error {
            return Err(Error::tool(name, err.message));
        }

        let result = response
            .result
            .ok_or_else(|| Error::protocol(format!("tools/call {} returned neither result nor error", name)))?;
        parse_tool_result(name, result)
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.session.lock().await;
        if !state.connected {
            return Ok(());
        }

        if state.session_id.is_some() {
            match self.headers(&state) {
                Ok(headers) => {
                    if let Err(e) = self.http.delete(&self.server_url).headers(headers).send().await {
                        log::warn!("Failed to close MCP session: {}", e);
                    }
                }
                Err(e) => log::warn!("Failed to close MCP session: {}", e),
            }
        }

        *state = SessionState::default();
        log::debug!("MCP session closed");
        Ok(())
    }
}
