//! JSON-RPC 2.0 message types and codec for the MCP protocol.
//!
//! This module defines the core message types used in the Model Context Protocol.
//! All messages follow the JSON-RPC 2.0 specification with MCP-specific extensions.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has a non-null `id`)
//! - **Response**: A reply to a request (success or error)
//! - **Notification**: A one-way message (no `id`, or `id: null`; no response)
//!
//! # MCP-Specific Constraints
//!
//! - Request IDs must be strings or numbers (never `null`)
//! - A response never carries `"id": null`; the member is omitted instead

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// The JSON-RPC protocol marker.
pub const JSONRPC_VERSION: &str = "2.0";

/// Default server name for capability negotiation.
pub const SERVER_NAME: &str = "RFC and Internet Draft Server";

/// A JSON-RPC 2.0 request ID.
///
/// Per the MCP specification, IDs must be strings or numbers, never `null`.
/// Numbers are kept as [`serde_json::Number`] so the echoed id has exactly the
/// value and type the client sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(serde_json::Number),
    /// String request ID.
    String(String),
}

impl RequestId {
    /// Reads an id member.
    ///
    /// Returns `Ok(None)` for an absent or null id (a notification), and the
    /// JSON type name of the value when it is not a string or number.
    ///
    /// # Errors
    ///
    /// Returns the offending JSON type name for booleans, arrays and objects.
    pub fn from_member(value: Option<&Value>) -> Result<Option<Self>, &'static str> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(Some(Self::Number(n.clone()))),
            Some(Value::String(s)) => Ok(Some(Self::String(s.clone()))),
            Some(other) => Err(json_type_name(other)),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// Returns the JSON type name of a value, for diagnostics.
#[must_use]
pub const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A JSON-RPC 2.0 request message.
///
/// Requests expect exactly one response from the server.
#[derive(Debug, Clone)]
pub struct JsonRpcRequest {
    /// Unique request identifier.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 notification message (incoming).
///
/// Notifications do not have an ID and never receive a response.
#[derive(Debug, Clone)]
pub struct JsonRpcNotification {
    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    pub params: Option<Value>,
}

/// An outgoing JSON-RPC 2.0 notification (server to client).
///
/// Used for sending progress updates and other notifications.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingNotification {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl OutgoingNotification {
    /// Creates a new outgoing notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }

    /// Creates a progress notification correlated to a pending request.
    ///
    /// The request id is used as the progress token.
    #[must_use]
    pub fn progress(progress_token: &RequestId, percentage: u8, message: &str) -> Self {
        let params = serde_json::json!({
            "progressToken": progress_token,
            "progress": percentage,
            "total": 100,
            "message": message,
        });
        Self::new("notifications/progress", Some(params))
    }
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

/// JSON-RPC 2.0 error codes this server emits.
///
/// Everything except unparseable JSON uses `InternalError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The payload is not JSON.
    ParseError,
    /// A malformed envelope, or anything that went wrong after decoding.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InternalError => -32603,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,
}

impl JsonRpcErrorData {
    /// Creates an error with the given code and message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
        }
    }
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this error corresponds to (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error,
        }
    }

    /// Creates an internal error response.
    #[must_use]
    pub fn internal_error(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::with_message(ErrorCode::InternalError, message),
        )
    }
}

impl From<&DecodeError> for JsonRpcError {
    fn from(err: &DecodeError) -> Self {
        Self::new(err.request_id(), err.to_error_data())
    }
}

/// A message written back to the client in reply to a request.
///
/// Success and error are distinct types, so a reply can never carry both a
/// `result` and an `error`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    /// A success response.
    Response(JsonRpcResponse),
    /// An error response.
    Error(JsonRpcError),
}

impl OutgoingMessage {
    /// Returns the id this reply carries, if any.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Response(resp) => Some(&resp.id),
            Self::Error(err) => err.id.as_ref(),
        }
    }

    /// Returns `true` if this is an error response.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// An incoming message that could be either a request or notification.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Returns the method name of this message.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(notif) => &notif.method,
        }
    }

    /// Returns the parameters of this message.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Option::as_ref is not const
    pub fn params(&self) -> Option<&Value> {
        match self {
            Self::Request(req) => req.params.as_ref(),
            Self::Notification(notif) => notif.params.as_ref(),
        }
    }

    /// Returns the request ID if this is a request.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(req) => Some(&req.id),
            Self::Notification(_) => None,
        }
    }

    /// Returns `true` if no response may be sent for this message.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        matches!(self, Self::Notification(_))
    }
}

/// Parses a JSON string into an incoming message.
///
/// A missing `jsonrpc` member is tolerated; the reply always carries `"2.0"`.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the JSON is malformed, is not an object,
/// lacks a `method`, or carries an id that is neither a string nor a number.
pub fn parse_message(json: &str) -> Result<IncomingMessage, DecodeError> {
    let value: Value = serde_json::from_str(json).map_err(DecodeError::Parse)?;

    let Value::Object(mut obj) = value else {
        return Err(DecodeError::Structural {
            id: None,
            reason: "message must be a JSON object",
        });
    };

    if let Some(version) = obj.get("jsonrpc").and_then(Value::as_str) {
        if version != JSONRPC_VERSION {
            tracing::debug!(jsonrpc = version, "Unexpected jsonrpc version, accepting");
        }
    }

    let id = RequestId::from_member(obj.get("id")).map_err(|kind| DecodeError::InvalidId { kind })?;

    let method = match obj.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => {
            return Err(DecodeError::Structural {
                id,
                reason: "method must be a non-empty string",
            })
        }
    };

    let params = obj.remove("params");

    Ok(match id {
        Some(id) => IncomingMessage::Request(JsonRpcRequest { id, method, params }),
        None => IncomingMessage::Notification(JsonRpcNotification { method, params }),
    })
}

/// Returns the parameters as an object, treating absent or null as empty.
///
/// Returns `None` when the parameters are present but not an object.
#[must_use]
pub fn params_object(params: Option<&Value>) -> Option<Map<String, Value>> {
    match params {
        None | Some(Value::Null) => Some(Map::new()),
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::from(1));
        assert_eq!(req.method, "initialize");
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Notification(notif) = msg else {
            panic!("Expected Notification, got Request");
        };
        assert_eq!(notif.method, "notifications/initialized");
    }

    #[test]
    fn null_id_is_a_notification() {
        let json = r#"{"jsonrpc": "2.0", "id": null, "method": "tools/list"}"#;
        let msg = parse_message(json).unwrap();
        assert!(msg.is_notification());
        assert!(msg.id().is_none());
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::from("abc-123"));
    }

    #[test]
    fn fractional_id_round_trips_exactly() {
        let json = r#"{"jsonrpc": "2.0", "id": 2.5, "method": "ping"}"#;
        let msg = parse_message(json).unwrap();
        let id = msg.id().cloned().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "2.5");
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_message("not valid json").unwrap_err();
        assert!(matches!(err, DecodeError::Parse(_)));
        assert_eq!(err.to_error_data().code, ErrorCode::ParseError.code());
    }

    #[test]
    fn parse_non_object() {
        let err = parse_message("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, DecodeError::Structural { id: None, .. }));
        assert_eq!(err.to_error_data().code, ErrorCode::InternalError.code());
    }

    #[test]
    fn parse_missing_method_keeps_id() {
        let err = parse_message(r#"{"jsonrpc": "2.0", "id": 9}"#).unwrap_err();
        assert_eq!(err.request_id(), Some(RequestId::from(9)));
        assert_eq!(err.to_error_data().code, ErrorCode::InternalError.code());
    }

    #[test]
    fn parse_boolean_id_is_rejected_without_id() {
        let err = parse_message(r#"{"jsonrpc": "2.0", "id": true, "method": "ping"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidId { kind: "boolean" }));
        let reply = JsonRpcError::from(&err);
        let json = serde_json::to_string(&reply).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(json.contains("-32603"));
    }

    #[test]
    fn missing_jsonrpc_is_tolerated() {
        let msg = parse_message(r#"{"id": 1, "method": "ping"}"#).unwrap();
        assert_eq!(msg.method(), "ping");
    }

    #[test]
    fn serialise_success_response() {
        let response = JsonRpcResponse::success(RequestId::from(1), json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
    }

    #[test]
    fn serialise_error_without_id_omits_member() {
        let error = JsonRpcError::internal_error(None, "boom");
        let json = serde_json::to_string(&error).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(!json.contains("null"));
        assert!(json.contains(r#""code":-32603"#));
    }

    #[test]
    fn outgoing_message_is_untagged() {
        let msg = OutgoingMessage::Response(JsonRpcResponse::success(
            RequestId::from("x"),
            json!({}),
        ));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["id"], "x");
        assert!(value.get("error").is_none());
        assert!(!msg.is_error());
    }

    #[test]
    fn progress_notification_shape() {
        let notif = OutgoingNotification::progress(&RequestId::from(5), 40, "Downloading");
        let value = serde_json::to_value(&notif).unwrap();
        assert_eq!(value["method"], "notifications/progress");
        assert_eq!(value["params"]["progressToken"], 5);
        assert_eq!(value["params"]["progress"], 40);
        assert_eq!(value["params"]["message"], "Downloading");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn params_object_handles_absent_and_invalid() {
        assert!(params_object(None).unwrap().is_empty());
        assert!(params_object(Some(&Value::Null)).unwrap().is_empty());
        assert!(params_object(Some(&json!([1]))).is_none());
        assert_eq!(params_object(Some(&json!({"a": 1}))).unwrap()["a"], 1);
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::from(42)), "42");
        assert_eq!(format!("{}", RequestId::from("abc")), "abc");
    }
}
