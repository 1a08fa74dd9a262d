//! Request routing and the handshake state machine.
//!
//! The dispatcher is transport-agnostic: it takes one decoded message and
//! produces at most one reply. Notifications never produce a reply.
//!
//! # Handshake
//!
//! The session starts uninitialised and moves to initialised on the first
//! successful `initialize` request. It never moves back. A separate flag
//! records that the peer sent `notifications/initialized`; nothing depends
//! on it beyond logging.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::ServerConfig;
use crate::error::DispatchError;
use crate::mcp::progress::ProgressReporter;
use crate::mcp::protocol::{
    json_type_name, params_object, IncomingMessage, JsonRpcError, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, OutgoingMessage, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::registry::{ToolContext, ToolRegistry};

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::named(SERVER_NAME)
    }
}

impl ServerInfo {
    /// Server information with the given name and this crate's version.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// Process-wide handshake state.
#[derive(Debug, Default)]
pub struct Session {
    initialized: AtomicBool,
    peer_ready: AtomicBool,
}

impl Session {
    /// Creates an uninitialised session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once an `initialize` request has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Returns `true` once the peer has sent `notifications/initialized`.
    #[must_use]
    pub fn is_peer_ready(&self) -> bool {
        self.peer_ready.load(Ordering::Acquire)
    }

    /// Marks the session initialised. Returns `true` if it already was.
    fn mark_initialized(&self) -> bool {
        self.initialized.swap(true, Ordering::AcqRel)
    }

    fn mark_peer_ready(&self) {
        self.peer_ready.store(true, Ordering::Release);
    }
}

/// Routes decoded messages to their handlers.
#[derive(Debug)]
pub struct Dispatcher {
    session: Session,
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
    strict_handshake: bool,
}

impl Dispatcher {
    /// Creates a dispatcher over the given tools.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, config: &ServerConfig) -> Self {
        Self {
            session: Session::new(),
            registry,
            server_info: ServerInfo::named(config.name.clone()),
            strict_handshake: config.strict_handshake,
        }
    }

    /// The handshake state.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The tool registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The advertised server information.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Handles one message.
    ///
    /// Returns the reply for a request, or `None` for a notification.
    pub async fn dispatch(
        &self,
        msg: IncomingMessage,
        progress: ProgressReporter,
    ) -> Option<OutgoingMessage> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(req, progress).await),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif);
                None
            }
        }
    }

    async fn handle_request(
        &self,
        req: JsonRpcRequest,
        progress: ProgressReporter,
    ) -> OutgoingMessage {
        tracing::debug!(id = %req.id, method = %req.method, "Handling request");

        let outcome = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_tools_list(&req),
            "tools/call" => self.handle_tools_call(&req, progress).await,
            other => Err(DispatchError::UnknownMethod(other.to_string())),
        };

        match outcome {
            Ok(result) => OutgoingMessage::Response(JsonRpcResponse::success(req.id, result)),
            Err(err) => {
                if req.method == "initialize" {
                    tracing::error!(
                        id = %req.id,
                        error = %err,
                        params = ?req.params,
                        "Initialize request failed"
                    );
                } else {
                    tracing::warn!(id = %req.id, method = %req.method, error = %err, "Request failed");
                }
                OutgoingMessage::Error(JsonRpcError::new(Some(req.id), err.to_error_data()))
            }
        }
    }

    fn handle_notification(&self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => {
                self.session.mark_peer_ready();
                tracing::info!("Client reported initialized");
            }
            "initialize" => {
                tracing::error!("Received initialize without an id; no response can be sent");
            }
            method if method.starts_with("notifications/") => {
                tracing::debug!(method, "Notification received");
            }
            method => {
                tracing::warn!(method, "Ignoring non-notification method sent without an id");
            }
        }
    }

    fn handle_initialize(&self, req: &JsonRpcRequest) -> Result<Value, DispatchError> {
        let params = params_object(req.params.as_ref()).ok_or_else(|| {
            DispatchError::InvalidParams(format!(
                "initialize params must be an object, got {}",
                req.params.as_ref().map_or("null", json_type_name)
            ))
        })?;

        let client_version = match params.get("protocolVersion") {
            None => None,
            Some(Value::String(v)) => Some(v.as_str()),
            Some(other) => {
                return Err(DispatchError::InvalidParams(format!(
                    "protocolVersion must be a string, got {}",
                    json_type_name(other)
                )))
            }
        };

        let client_name = match params.get("clientInfo") {
            None | Some(Value::Null) => None,
            Some(Value::Object(info)) => info.get("name").and_then(Value::as_str),
            Some(other) => {
                return Err(DispatchError::InvalidParams(format!(
                    "clientInfo must be an object, got {}",
                    json_type_name(other)
                )))
            }
        };

        if self.session.mark_initialized() {
            tracing::info!(id = %req.id, "Repeated initialize request, answering again");
        }

        tracing::info!(
            client = client_name.unwrap_or("unknown"),
            client_protocol = client_version.unwrap_or("unspecified"),
            protocol = MCP_PROTOCOL_VERSION,
            "Session initialized"
        );

        Ok(json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": self.server_info,
        }))
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<Value, DispatchError> {
        self.check_handshake(req)?;
        Ok(json!({ "tools": self.registry.definitions() }))
    }

    async fn handle_tools_call(
        &self,
        req: &JsonRpcRequest,
        progress: ProgressReporter,
    ) -> Result<Value, DispatchError> {
        self.check_handshake(req)?;

        let mut params = params_object(req.params.as_ref()).ok_or_else(|| {
            DispatchError::InvalidParams("tools/call params must be an object".to_string())
        })?;

        let name = match params.remove("name") {
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(DispatchError::InvalidParams(format!(
                    "tool name must be a string, got {}",
                    json_type_name(&other)
                )))
            }
            None => return Err(DispatchError::InvalidParams("missing tool name".to_string())),
        };

        let tool = self
            .registry
            .get(&name)
            .ok_or_else(|| DispatchError::UnknownTool(name.clone()))?;

        let arguments = resolve_arguments(&tool.schema_id, params.remove("arguments"))?;

        let mut ctx = ToolContext::new(arguments);
        if tool.supports_progress {
            ctx.request_id = Some(req.id.clone());
            ctx.progress = Some(progress.for_request(req.id.clone()));
        }

        tracing::info!(tool = %name, id = %req.id, "Calling tool");

        let result = match tool.handler.call(ctx).await {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool call failed");
                ToolCallResult::error(e.to_string())
            }
        };

        Ok(serde_json::to_value(result)?)
    }

    fn check_handshake(&self, req: &JsonRpcRequest) -> Result<(), DispatchError> {
        if self.session.is_initialized() {
            return Ok(());
        }
        if self.strict_handshake {
            return Err(DispatchError::NotInitialized(req.method.clone()));
        }
        tracing::warn!(method = %req.method, "Request before initialize, serving anyway");
        Ok(())
    }
}

/// Reconciles wrapped and flat tool arguments.
///
/// If the arguments hold exactly one key equal to `schema_id` and its value is
/// an object, that object is used. Otherwise the arguments are used as given.
/// Absent or null arguments become an empty object.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidParams`] if the arguments are not an object.
pub fn resolve_arguments(
    schema_id: &str,
    arguments: Option<Value>,
) -> Result<Map<String, Value>, DispatchError> {
    let mut map = match arguments {
        None | Some(Value::Null) => return Ok(Map::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(DispatchError::InvalidParams(format!(
                "tool arguments must be an object, got {}",
                json_type_name(&other)
            )))
        }
    };

    if map.len() == 1 && map.get(schema_id).is_some_and(Value::is_object) {
        if let Some(Value::Object(inner)) = map.remove(schema_id) {
            tracing::debug!(schema_id, "Unwrapped tool arguments");
            return Ok(inner);
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::mcp::protocol::parse_message;
    use crate::mcp::registry::{ToolDescriptor, ToolHandler};
    use async_trait::async_trait;

    struct Fixed(Result<&'static str, &'static str>);

    #[async_trait]
    impl ToolHandler for Fixed {
        async fn call(&self, _ctx: ToolContext) -> Result<String, ToolError> {
            self.0
                .map(str::to_string)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))
        }
    }

    struct EchoArgs;

    #[async_trait]
    impl ToolHandler for EchoArgs {
        async fn call(&self, ctx: ToolContext) -> Result<String, ToolError> {
            let progress = ctx.request_id.map(|id| id.to_string());
            Ok(json!({"args": ctx.arguments, "progress": progress}).to_string())
        }
    }

    fn dispatcher(strict: bool) -> Dispatcher {
        let mut registry = ToolRegistry::new();
        for (name, handler, progress) in [
            ("ok_tool", Arc::new(Fixed(Ok("fine"))) as Arc<dyn ToolHandler>, false),
            ("bad_tool", Arc::new(Fixed(Err("nope"))), false),
            ("echo", Arc::new(EchoArgs), true),
        ] {
            registry.register(ToolDescriptor {
                name: name.to_string(),
                description: format!("{name} description"),
                schema_id: "EchoInput".to_string(),
                input_schema: None,
                supports_progress: progress,
                handler,
            });
        }
        let config = ServerConfig {
            strict_handshake: strict,
            ..ServerConfig::default()
        };
        Dispatcher::new(Arc::new(registry), &config)
    }

    async fn send(d: &Dispatcher, line: &str) -> Option<Value> {
        let msg = parse_message(line).unwrap();
        d.dispatch(msg, ProgressReporter::disabled())
            .await
            .map(|out| serde_json::to_value(out).unwrap())
    }

    #[tokio::test]
    async fn initialize_returns_server_info() {
        let d = dispatcher(false);
        let reply = send(
            &d,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"t"}}}"#,
        )
        .await
        .unwrap();

        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(reply["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(reply["result"]["capabilities"]["tools"].is_object());
        assert!(d.session().is_initialized());
    }

    #[tokio::test]
    async fn repeated_initialize_is_answered() {
        let d = dispatcher(false);
        let line = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;
        assert!(send(&d, line).await.unwrap().get("result").is_some());
        assert!(send(&d, line).await.unwrap().get("result").is_some());
        assert!(d.session().is_initialized());
    }

    #[tokio::test]
    async fn initialize_with_bad_params_does_not_transition() {
        let d = dispatcher(false);
        let reply = send(&d, r#"{"jsonrpc":"2.0","id":"i","method":"initialize","params":[1]}"#)
            .await
            .unwrap();
        assert_eq!(reply["id"], "i");
        assert_eq!(reply["error"]["code"], -32603);
        assert!(!d.session().is_initialized());

        let reply = send(
            &d,
            r#"{"jsonrpc":"2.0","id":2,"method":"initialize","params":{"protocolVersion":5}}"#,
        )
        .await
        .unwrap();
        assert_eq!(reply["error"]["code"], -32603);
    }

    #[tokio::test]
    async fn initialize_as_notification_gets_no_reply() {
        let d = dispatcher(false);
        assert!(send(&d, r#"{"jsonrpc":"2.0","method":"initialize","params":{}}"#).await.is_none());
        assert!(!d.session().is_initialized());
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let d = dispatcher(false);
        assert!(send(&d, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none());
        assert!(d.session().is_peer_ready());
        assert!(send(&d, r#"{"jsonrpc":"2.0","method":"tools/list"}"#).await.is_none());
        assert!(send(&d, r#"{"jsonrpc":"2.0","id":null,"method":"tools/call"}"#)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn ping_returns_empty_result() {
        let d = dispatcher(true);
        let reply = send(&d, r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#).await.unwrap();
        assert_eq!(reply["result"], json!({}));
    }

    #[tokio::test]
    async fn unknown_method_is_internal_error() {
        let d = dispatcher(false);
        let reply = send(&d, r#"{"jsonrpc":"2.0","id":7,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(reply["id"], 7);
        assert_eq!(reply["error"]["code"], -32603);
        assert_eq!(reply["error"]["message"], "Unknown method: resources/list");
    }

    #[tokio::test]
    async fn lenient_handshake_serves_before_initialize() {
        let d = dispatcher(false);
        let reply = send(&d, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).await.unwrap();
        assert_eq!(reply["result"]["tools"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn strict_handshake_rejects_before_initialize() {
        let d = dispatcher(true);
        let reply = send(&d, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).await.unwrap();
        assert_eq!(reply["error"]["code"], -32603);
        assert!(reply["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Server not initialized"));

        send(&d, r#"{"jsonrpc":"2.0","id":2,"method":"initialize","params":{}}"#).await;
        let reply = send(&d, r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#).await.unwrap();
        assert!(reply.get("result").is_some());
    }

    #[tokio::test]
    async fn tools_list_in_registration_order() {
        let d = dispatcher(false);
        let reply = send(&d, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).await.unwrap();
        let names: Vec<_> = reply["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["ok_tool", "bad_tool", "echo"]);
    }

    #[tokio::test]
    async fn unknown_tool_is_error_response() {
        let d = dispatcher(false);
        let reply = send(
            &d,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
        )
        .await
        .unwrap();
        assert_eq!(reply["id"], 3);
        assert_eq!(reply["error"]["code"], -32603);
        assert_eq!(reply["error"]["message"], "Unknown tool: nope");
    }

    #[tokio::test]
    async fn tool_success_and_failure_shapes() {
        let d = dispatcher(false);
        let ok = send(
            &d,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"ok_tool"}}"#,
        )
        .await
        .unwrap();
        assert_eq!(ok["result"]["content"][0]["type"], "text");
        assert_eq!(ok["result"]["content"][0]["text"], "fine");
        assert!(ok["result"].get("isError").is_none());

        let bad = send(
            &d,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"bad_tool"}}"#,
        )
        .await
        .unwrap();
        assert_eq!(bad["result"]["isError"], true);
        assert!(bad["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("nope"));
    }

    #[tokio::test]
    async fn progress_tools_receive_request_id() {
        let d = dispatcher(false);
        let reply = send(
            &d,
            r#"{"jsonrpc":"2.0","id":"r9","method":"tools/call","params":{"name":"echo","arguments":{"EchoInput":{"x":1}}}}"#,
        )
        .await
        .unwrap();
        let text: Value =
            serde_json::from_str(reply["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(text["args"], json!({"x": 1}));
        assert_eq!(text["progress"], "r9");
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let d = dispatcher(false);
        let reply = send(
            &d,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"echo","arguments":"x"}}"#,
        )
        .await
        .unwrap();
        assert_eq!(reply["error"]["code"], -32603);
    }

    #[test]
    fn resolve_arguments_unwraps_single_wrapper() {
        let args = json!({"GetRfcInput": {"number": "2616"}});
        let resolved = resolve_arguments("GetRfcInput", Some(args)).unwrap();
        assert_eq!(Value::Object(resolved), json!({"number": "2616"}));
    }

    #[test]
    fn resolve_arguments_keeps_flat() {
        let args = json!({"number": "2616"});
        let resolved = resolve_arguments("GetRfcInput", Some(args.clone())).unwrap();
        assert_eq!(Value::Object(resolved), args);

        let mixed = json!({"GetRfcInput": {"number": "1"}, "format": "full"});
        let resolved = resolve_arguments("GetRfcInput", Some(mixed.clone())).unwrap();
        assert_eq!(Value::Object(resolved), mixed);

        let scalar = json!({"GetRfcInput": "2616"});
        let resolved = resolve_arguments("GetRfcInput", Some(scalar.clone())).unwrap();
        assert_eq!(Value::Object(resolved), scalar);
    }

    #[test]
    fn resolve_arguments_absent_and_invalid() {
        assert!(resolve_arguments("X", None).unwrap().is_empty());
        assert!(resolve_arguments("X", Some(Value::Null)).unwrap().is_empty());
        assert!(resolve_arguments("X", Some(json!([1]))).is_err());
    }
}
