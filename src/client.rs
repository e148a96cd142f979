//! Async client
//!
//! [`XpozClient`] owns one session with the Xpoz MCP server and hands out the
//! per-platform namespaces. Each namespace handle shares the client's session,
//! so requests from all of them go through the same transport.
//!
//! # Lifecycle
//!
//! ```text
//! XpozClient::new(options)   no network activity; API key already resolved
//!     │
//!     ├─> connect()          open the MCP session (idempotent)
//!     │
//!     ├─> twitter() / instagram() / reddit()
//!     │       └─> tool call ──> poll if pending ──> typed result
//!     │
//!     └─> close()            end the session (idempotent)
//! ```
//!
//! The session carries one request at a time; concurrent calls on the same
//! client wait for each other inside the transport.
//!
//! # Examples
//!
//! ```rust,no_run
//! use xpoz::{ClientOptions, IdentifierType, QueryOptions, XpozClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), xpoz::Error> {
//!     let client = XpozClient::new(ClientOptions::builder().api_key("xpoz_...").build()?)?;
//!     client.connect().await?;
//!
//!     let user = client
//!         .twitter()
//!         .get_user("rustlang", IdentifierType::Username, &QueryOptions::new())
//!         .await?;
//!     println!("{:?} has {:?} followers", user.username, user.followers_count);
//!
//!     client.close().await
//! }
//! ```

use std::sync::Arc;

use crate::namespaces::{Endpoint, InstagramNamespace, RedditNamespace, TwitterNamespace};
use crate::polling::Poller;
use crate::transport::{McpTransport, ToolTransport};
use crate::types::{ClientOptions, Payload};
use crate::Result;

/// Async client for the Xpoz social data service
pub struct XpozClient {
    options: ClientOptions,
    transport: Arc<dyn ToolTransport>,
    poller: Poller,
}

impl std::fmt::Debug for XpozClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XpozClient")
            .field("options", &self.options)
            .finish()
    }
}

impl XpozClient {
    /// Create a client talking MCP over HTTP to `options.server_url`.
    ///
    /// Call [`connect`](Self::connect) before the first request.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the HTTP client cannot be built.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let transport = McpTransport::new(options.server_url.clone(), options.api_key.clone())?;
        Ok(Self::with_transport(options, Arc::new(transport)))
    }

    /// Create a client over any [`ToolTransport`]
    pub fn with_transport(options: ClientOptions, transport: Arc<dyn ToolTransport>) -> Self {
        let poller = Poller::new(options.timeout).with_interval(options.poll_interval);
        Self {
            options,
            transport,
            poller,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Open the session. Does nothing if it is already open.
    pub async fn connect(&self) -> Result<()> {
        log::debug!("connecting to {}", self.options.server_url);
        self.transport.connect().await
    }

    /// Close the session. Does nothing if it is already closed.
    pub async fn close(&self) -> Result<()> {
        self.transport.close().await
    }

    pub fn twitter(&self) -> TwitterNamespace {
        TwitterNamespace::new(self.endpoint())
    }

    pub fn instagram(&self) -> InstagramNamespace {
        InstagramNamespace::new(self.endpoint())
    }

    pub fn reddit(&self) -> RedditNamespace {
        RedditNamespace::new(self.endpoint())
    }

    /// Call a tool by name with raw camelCase arguments.
    ///
    /// The decoded payload is returned as-is: a pending `operationId` is not
    /// polled. Use [`wait_for_operation`](Self::wait_for_operation) for that.
    pub async fn call_tool(&self, name: &str, arguments: Payload) -> Result<Payload> {
        self.transport.call_tool(name, arguments).await
    }

    /// Poll an operation until it completes, fails, is cancelled or the
    /// client's timeout elapses
    pub async fn wait_for_operation(&self, operation_id: &str) -> Result<Payload> {
        self.poller
            .wait(self.transport.as_ref(), operation_id)
            .await
    }

    pub(crate) fn transport(&self) -> &Arc<dyn ToolTransport> {
        &self.transport
    }

    pub(crate) fn poller(&self) -> &Poller {
        &self.poller
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::new(Arc::clone(&self.transport), self.poller.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;
    use crate::{Error, QueryOptions};
    use serde_json::json;
    use std::time::Duration;

    fn client(transport: &ScriptedTransport, timeout: Duration) -> XpozClient {
        let options = ClientOptions::builder()
            .api_key("test-key")
            .server_url("http://localhost:8000/mcp")
            .timeout(timeout)
            .build()
            .unwrap();
        XpozClient::with_transport(options, Arc::new(transport.clone()))
    }

    #[tokio::test]
    async fn test_call_tool_does_not_poll() {
        let transport = ScriptedTransport::new().reply(json!({"operationId": "op_1", "status": "running"}));
        let client = client(&transport, Duration::from_secs(300));

        let raw = client
            .call_tool("getTwitterPostsByKeywords", Payload::new())
            .await
            .unwrap();
        assert_eq!(raw["operationId"], "op_1");
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_operation_uses_client_timeout() {
        let transport = ScriptedTransport::new()
            .reply(json!({"status": "running"}))
            .reply(json!({"status": "running"}));
        let client = client(&transport, Duration::from_secs(5));

        let err = client.wait_for_operation("op_slow").await.unwrap_err();
        match err {
            Error::OperationTimeout { operation_id, elapsed_seconds } => {
                assert_eq!(operation_id, "op_slow");
                assert_eq!(elapsed_seconds, 5.0);
            }
            other => panic!("Expected OperationTimeout, got {:?}", other),
        }
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_namespaces_share_the_session() {
        let transport = ScriptedTransport::new()
            .reply(json!({"results": [{"id": "1"}]}))
            .reply(json!({"results": [{"id": "2"}]}))
            .reply(json!({"results": [{"id": "3"}]}));
        let client = client(&transport, Duration::from_secs(300));
        let options = QueryOptions::new();

        client.twitter().search_users("a", &options).await.unwrap();
        client.instagram().search_users("b", &options).await.unwrap();
        client.reddit().search_users("c", &options).await.unwrap();

        let tools: Vec<String> = transport.calls().into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            tools,
            vec!["searchTwitterUsers", "searchInstagramUsers", "searchRedditUsers"]
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let client = client(&ScriptedTransport::new(), Duration::from_secs(1));
        assert!(!format!("{:?}", client).contains("test-key"));
    }
}
