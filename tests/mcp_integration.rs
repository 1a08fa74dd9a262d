//! Integration tests for MCP protocol handling.
//!
//! These tests verify the JSON-RPC 2.0 codec and drive the stdio server loop
//! end to end with in-memory input and output.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use standard_finder_mcp::config::{BackendConfig, ServerConfig};
use standard_finder_mcp::docs::{BackendError, DocumentService, TextSource};
use standard_finder_mcp::mcp::protocol::{parse_message, IncomingMessage, RequestId};
use standard_finder_mcp::mcp::{Dispatcher, McpServer, ResponseGuard, StdioTransport, ToolRegistry};
use standard_finder_mcp::tools;

/// A source that never reaches the network.
struct Offline;

#[async_trait]
impl TextSource for Offline {
    async fn get_text(&self, url: &str) -> Result<String, BackendError> {
        Err(BackendError::Status {
            url: url.to_string(),
            status: 503,
        })
    }
}

fn dispatcher(config: &ServerConfig) -> Arc<Dispatcher> {
    let docs = Arc::new(DocumentService::new(Arc::new(Offline), &BackendConfig::default()));
    let mut registry = ToolRegistry::new();
    tools::register_all(&mut registry, &docs);
    Arc::new(Dispatcher::new(Arc::new(registry), config))
}

async fn run_session(config: &ServerConfig, input: &str) -> Vec<Value> {
    let transport = StdioTransport::from_parts(input.as_bytes(), Vec::new());
    let mut server =
        McpServer::with_transport(dispatcher(config), ResponseGuard::default(), transport);
    tokio_test::assert_ok!(server.serve_until_eof().await);

    let (_, out) = server.into_transport().into_parts();
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "initialize");
        assert_eq!(req.id, RequestId::from(1));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_string_id_request() {
    let json = r#"{"jsonrpc": "2.0", "id": "abc-1", "method": "tools/list"}"#;

    if let IncomingMessage::Request(req) = parse_message(json).unwrap() {
        assert_eq!(req.method, "tools/list");
        assert_eq!(req.id, RequestId::from("abc-1"));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_notification() {
    let json = r#"{
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Notification(notif) = result.unwrap() {
        assert_eq!(notif.method, "notifications/initialized");
    } else {
        panic!("Expected Notification");
    }
}

#[test]
fn test_parse_invalid_json() {
    assert!(parse_message("not valid json").is_err());
}

#[test]
fn test_parse_missing_method() {
    assert!(parse_message(r#"{"jsonrpc": "2.0", "id": 1}"#).is_err());
}

// =============================================================================
// Session Tests
// =============================================================================

#[tokio::test]
async fn test_end_to_end_session() {
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"t","version":"1"}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"no_such_tool","arguments":{}}}"#,
        "\n",
    );

    let out = run_session(&ServerConfig::default(), input).await;

    assert_eq!(out.len(), 3);
    let ids: Vec<_> = out.iter().map(|frame| frame["id"].clone()).collect();
    assert_eq!(ids, [1, 2, 3]);

    assert_eq!(out[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(out[0]["result"]["serverInfo"]["name"], "RFC and Internet Draft Server");

    let names: Vec<_> = out[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        [
            "get_rfc",
            "search_rfcs",
            "get_rfc_section",
            "get_internet_draft",
            "search_internet_drafts",
            "get_internet_draft_section",
            "get_working_group_documents",
            "get_openid_spec",
            "search_openid_specs",
            "get_openid_spec_section",
        ]
    );

    assert_eq!(out[2]["error"]["code"], -32603);
    assert!(out[2]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("no_such_tool"));
}

#[tokio::test]
async fn test_tools_list_is_stable() {
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":"b","method":"tools/list"}"#,
        "\n",
    );

    let out = run_session(&ServerConfig::default(), input).await;
    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["id"], "a");
    assert_eq!(out[1]["id"], "b");
    assert_eq!(out[0]["result"], out[1]["result"]);
}

#[tokio::test]
async fn test_malformed_line_does_not_stop_loop() {
    let input = concat!(
        "{not json\n",
        r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#,
        "\n",
    );

    let out = run_session(&ServerConfig::default(), input).await;
    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["error"]["code"], -32700);
    assert!(out[0].get("id").is_none());
    assert_eq!(out[1]["id"], 7);
    assert_eq!(out[1]["result"], serde_json::json!({}));
}

#[tokio::test]
async fn test_strict_handshake_rejects_early_calls() {
    let config = ServerConfig {
        strict_handshake: true,
        ..ServerConfig::default()
    };
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#,
        "\n",
    );

    let out = run_session(&config, input).await;
    assert_eq!(out.len(), 3);
    assert_eq!(out[0]["error"]["code"], -32603);
    assert!(out[1].get("result").is_some());
    assert!(out[2]["result"]["tools"].is_array());
}
