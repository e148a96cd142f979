//! MCP transport tests against a mock server.
//!
//! wiremock plays the Xpoz MCP endpoint: `initialize`, the `initialized`
//! notification, `tools/call` answered as plain JSON or as an SSE stream, and
//! the closing `DELETE`.

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xpoz::transport::{McpTransport, ToolTransport};
use xpoz::{ClientOptions, Error, IdentifierType, Payload, QueryOptions, XpozClient};

const SESSION_ID: &str = "sess-7f3a";

fn rpc_result(id: u64, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn text_result(id: u64, text: &str) -> Value {
    rpc_result(id, json!({"content": [{"type": "text", "text": text}]}))
}

/// Mount `initialize` (request id 1) and the `initialized` notification
async fn mount_handshake(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"method": "initialize"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Mcp-Session-Id", SESSION_ID)
                .set_body_json(rpc_result(
                    1,
                    json!({
                        "protocolVersion": "2025-06-18",
                        "capabilities": {"tools": {}},
                        "serverInfo": {"name": "xpoz", "version": "1.0.0"}
                    }),
                )),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(header("mcp-session-id", SESSION_ID))
        .and(body_partial_json(json!({"method": "notifications/initialized"})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(server)
        .await;
}

async fn connected_transport(server: &MockServer) -> McpTransport {
    mount_handshake(server).await;
    let transport = McpTransport::new(format!("{}/mcp", server.uri()), "test-key").unwrap();
    transport.connect().await.unwrap();
    transport
}

fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn test_connect_is_idempotent() {
    init_logging();
    let server = MockServer::start().await;
    let transport = connected_transport(&server).await;

    // second connect sends nothing; the handshake mocks expect exactly one hit
    transport.connect().await.unwrap();
    assert!(transport.is_connected().await);
    assert_eq!(transport.server_url(), format!("{}/mcp", server.uri()));
}

#[tokio::test]
async fn test_close_sends_delete_once() {
    let server = MockServer::start().await;
    let transport = connected_transport(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/mcp"))
        .and(header("mcp-session-id", SESSION_ID))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    transport.close().await.unwrap();
    transport.close().await.unwrap();
    assert!(!transport.is_connected().await);
}

#[tokio::test]
async fn test_rejected_key_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let transport = McpTransport::new(format!("{}/mcp", server.uri()), "bad-key").unwrap();
    let err = transport.connect().await.unwrap_err();

    assert!(matches!(err, Error::Authentication(_)), "got {:?}", err);
    assert!(!transport.is_connected().await);
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    // port 9 (discard) is not listening in the test environment
    let transport = McpTransport::new("http://127.0.0.1:9/mcp", "test-key").unwrap();
    let err = transport.connect().await.unwrap_err();
    assert!(matches!(err, Error::Connection(_)), "got {:?}", err);
}

// ============================================================================
// Tool calls
// ============================================================================

#[tokio::test]
async fn test_json_tool_result_is_decoded() {
    let server = MockServer::start().await;
    let transport = connected_transport(&server).await;

    Mock::given(method("POST"))
        .and(header("mcp-session-id", SESSION_ID))
        .and(header("mcp-protocol-version", "2025-06-18"))
        .and(body_partial_json(json!({
            "method": "tools/call",
            "params": {"name": "countTweets", "arguments": {"phrase": "rust"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_result(
            2,
            "success: true\ndata:\n  results: 1834\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut args = Payload::new();
    args.insert("phrase".to_string(), json!("rust"));
    let payload = transport.call_tool("countTweets", args).await.unwrap();

    assert_eq!(payload["results"], 1834);
    assert!(!payload.contains_key("success"));
}

#[tokio::test]
async fn test_sse_tool_result_skips_notifications() {
    let server = MockServer::start().await;
    let transport = connected_transport(&server).await;

    let progress = json!({
        "jsonrpc": "2.0",
        "method": "notifications/progress",
        "params": {"progress": 50, "total": 100}
    });
    let response = text_result(
        2,
        "data[2]{id,text}:\n  \"1\",\"hello, world\"\n  \"2\",gm\n",
    );
    let body = format!(
        "event: message\ndata: {}\n\nevent: message\ndata: {}\n\n",
        progress, response
    );

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/call"})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let payload = transport
        .call_tool("getTwitterPostsByIds", Payload::new())
        .await
        .unwrap();

    let rows = payload["results"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["text"], "hello, world");
    assert_eq!(rows[1]["id"], "2");
}

#[tokio::test]
async fn test_is_error_result_becomes_tool_error() {
    let server = MockServer::start().await;
    let transport = connected_transport(&server).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/call"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(
            2,
            json!({
                "content": [{"type": "text", "text": "Invalid date range: startDate after endDate"}],
                "isError": true
            }),
        )))
        .mount(&server)
        .await;

    let err = transport
        .call_tool("getTwitterPostsByKeywords", Payload::new())
        .await
        .unwrap_err();

    match err {
        Error::Tool { tool, message } => {
            assert_eq!(tool, "getTwitterPostsByKeywords");
            assert_eq!(message, "Invalid date range: startDate after endDate");
        }
        other => panic!("Expected Tool error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_json_rpc_error_becomes_tool_error() {
    let server = MockServer::start().await;
    let transport = connected_transport(&server).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/call"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "error": {"code": -32602, "message": "Unknown tool: getMastodonPosts"}
        })))
        .mount(&server)
        .await;

    let err = transport
        .call_tool("getMastodonPosts", Payload::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "MCP tool error (getMastodonPosts): Unknown tool: getMastodonPosts"
    );
}

// ============================================================================
// Full client over HTTP
// ============================================================================

#[tokio::test]
async fn test_client_get_user_over_http() {
    init_logging();
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "tools/call",
            "params": {
                "name": "getTwitterUser",
                "arguments": {
                    "identifier": "44196397",
                    "identifierType": "id",
                    "fields": ["id", "username", "followersCount"]
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_result(
            2,
            "data:\n  results[1]{id,username,followersCount}:\n    \"44196397\",elonmusk,219000000\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let options = ClientOptions::builder()
        .api_key("test-key")
        .server_url(format!("{}/mcp", server.uri()))
        .build()
        .unwrap();
    let client = XpozClient::new(options).unwrap();
    client.connect().await.unwrap();

    let user = client
        .twitter()
        .get_user(
            "44196397",
            IdentifierType::Id,
            &QueryOptions::new().fields(["id", "username", "followers_count"]),
        )
        .await
        .unwrap();

    assert_eq!(user.id.as_deref(), Some("44196397"));
    assert_eq!(user.username.as_deref(), Some("elonmusk"));
    assert_eq!(user.followers_count, Some(219_000_000));
}
