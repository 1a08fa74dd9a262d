//! Outbound response guard.
//!
//! Every reply passes through [`ResponseGuard::finalize`] before it reaches a
//! transport. The guard normalises the envelope and bounds its size:
//!
//! 1. `jsonrpc` defaults to `"2.0"`
//! 2. a null `id` is removed
//! 3. an `id` that is not a string or number is removed and logged
//! 4. serialisation falls back to ASCII-only output on failure
//! 5. over the soft limit, a single text content item is cut to the content cap
//! 6. over the hard limit, the reply becomes a minimal size-violation error
//!
//! The stdio transport is one message per line with no way to resend, so an
//! oversized write is replaced rather than attempted.

use std::io;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::LimitsConfig;
use crate::mcp::protocol::{ErrorCode, JSONRPC_VERSION};

/// Appended to truncated tool output.
pub const TRUNCATION_MARKER: &str = "\n\n[... content truncated ...]";

/// Applies envelope normalisation and the size-degradation policy.
#[derive(Debug, Clone)]
pub struct ResponseGuard {
    soft_limit: usize,
    content_cap: usize,
    hard_limit: usize,
}

impl Default for ResponseGuard {
    fn default() -> Self {
        Self::new(&LimitsConfig::default())
    }
}

impl ResponseGuard {
    /// Creates a guard from configured limits.
    #[must_use]
    pub const fn new(limits: &LimitsConfig) -> Self {
        Self {
            soft_limit: limits.soft_limit_bytes,
            content_cap: limits.content_cap_bytes,
            hard_limit: limits.hard_limit_bytes,
        }
    }

    /// Serialises a reply into a single JSON line, applying all guard stages.
    #[must_use]
    pub fn finalize<T: Serialize>(&self, reply: &T) -> String {
        match serde_json::to_value(reply) {
            Ok(value) => self.finalize_value(value),
            Err(e) => {
                tracing::error!(error = %e, "Failed to convert reply to JSON");
                minimal_error(None, "Internal error: failed to serialise response")
            }
        }
    }

    /// Applies all guard stages to an already-built JSON value.
    #[must_use]
    pub fn finalize_value(&self, value: Value) -> String {
        let Value::Object(mut obj) = value else {
            tracing::error!("Reply is not a JSON object, replacing with error");
            return minimal_error(None, "Internal error: malformed response");
        };

        normalise_envelope(&mut obj);

        let mut json = serialise(&obj);

        if json.len() > self.soft_limit && self.truncate_single_text(&mut obj) {
            let before = json.len();
            json = serialise(&obj);
            tracing::warn!(
                original_bytes = before,
                truncated_bytes = json.len(),
                "Response exceeded soft limit, truncated text content"
            );
        }

        if json.len() > self.hard_limit {
            tracing::error!(
                bytes = json.len(),
                limit = self.hard_limit,
                "Response exceeds hard limit, replacing with error"
            );
            let message = format!(
                "Response too large: {} bytes exceeds the {} byte limit",
                json.len(),
                self.hard_limit
            );
            return minimal_error(obj.get("id"), &message);
        }

        json
    }

    /// Cuts `result.content[0].text` to the content cap if it is the only item.
    ///
    /// Returns `true` if the text was shortened.
    fn truncate_single_text(&self, obj: &mut Map<String, Value>) -> bool {
        let Some(content) = obj
            .get_mut("result")
            .and_then(|r| r.get_mut("content"))
            .and_then(Value::as_array_mut)
        else {
            return false;
        };

        if content.len() != 1 {
            return false;
        }

        let item = &mut content[0];
        if item.get("type").and_then(Value::as_str) != Some("text") {
            return false;
        }

        let Some(Value::String(text)) = item.get_mut("text") else {
            return false;
        };

        if text.len() <= self.content_cap {
            return false;
        }

        let original_len = text.len();
        let cut = floor_char_boundary(text, self.content_cap);
        text.truncate(cut);
        text.push_str(TRUNCATION_MARKER);
        text.push_str(&format!(" ({cut} of {original_len} bytes shown)"));
        true
    }
}

/// Fixes the protocol marker and the id member in place.
fn normalise_envelope(obj: &mut Map<String, Value>) {
    if !obj.get("jsonrpc").is_some_and(Value::is_string) {
        obj.insert("jsonrpc".to_string(), Value::from(JSONRPC_VERSION));
    }

    match obj.get("id") {
        Some(Value::Null) => {
            obj.remove("id");
        }
        Some(Value::String(_) | Value::Number(_)) | None => {}
        Some(other) => {
            tracing::warn!(id = %other, "Dropping id of invalid type from response");
            obj.remove("id");
        }
    }
}

/// Serialises compactly, falling back to ASCII-escaped output.
fn serialise(obj: &Map<String, Value>) -> String {
    match serde_json::to_string(obj) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Serialisation failed, retrying with ASCII-safe output");
            to_ascii_json(obj).unwrap_or_else(|e| {
                tracing::error!(error = %e, "ASCII-safe serialisation failed");
                minimal_error(obj.get("id"), "Internal error: failed to serialise response")
            })
        }
    }
}

/// Builds the smallest valid error reply, keeping a usable id.
fn minimal_error(id: Option<&Value>, message: &str) -> String {
    let mut obj = Map::new();
    obj.insert("jsonrpc".to_string(), Value::from(JSONRPC_VERSION));
    if let Some(id @ (Value::String(_) | Value::Number(_))) = id {
        obj.insert("id".to_string(), id.clone());
    }
    obj.insert(
        "error".to_string(),
        json!({"code": ErrorCode::InternalError.code(), "message": message}),
    );
    Value::Object(obj).to_string()
}

/// Largest index `<= max` that lies on a UTF-8 character boundary.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Serialises a value with every non-ASCII character escaped as `\uXXXX`.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn to_ascii_json<T: Serialize + ?Sized>(value: &T) -> io::Result<String> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
    value.serialize(&mut ser).map_err(io::Error::other)?;
    String::from_utf8(out).map_err(io::Error::other)
}

/// A compact formatter that escapes non-ASCII characters.
struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..idx])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIB: usize = 1024;

    fn text_reply(id: Value, text: String) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {"content": [{"type": "text", "text": text}]}
        })
    }

    #[test]
    fn adds_missing_jsonrpc_marker() {
        let out = ResponseGuard::default().finalize_value(json!({"id": 1, "result": {}}));
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 1);
    }

    #[test]
    fn removes_null_id() {
        let out = ResponseGuard::default()
            .finalize_value(json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32700, "message": "x"}}));
        assert!(!out.contains("\"id\""));
        assert!(!out.contains("null"));
    }

    #[test]
    fn removes_invalid_id_types() {
        for bad in [json!(true), json!([1]), json!({"a": 1})] {
            let out = ResponseGuard::default()
                .finalize_value(json!({"jsonrpc": "2.0", "id": bad, "result": {}}));
            let value: Value = serde_json::from_str(&out).unwrap();
            assert!(value.get("id").is_none(), "id survived: {out}");
        }
    }

    #[test]
    fn keeps_string_and_number_ids() {
        let guard = ResponseGuard::default();
        let out = guard.finalize_value(json!({"jsonrpc": "2.0", "id": "abc", "result": {}}));
        assert!(out.contains(r#""id":"abc""#));
        let out = guard.finalize_value(json!({"jsonrpc": "2.0", "id": 0, "result": {}}));
        assert!(out.contains(r#""id":0"#));
    }

    #[test]
    fn small_reply_passes_through_unchanged() {
        let reply = text_reply(json!(1), "hello".to_string());
        let out = ResponseGuard::default().finalize_value(reply.clone());
        assert_eq!(serde_json::from_str::<Value>(&out).unwrap(), reply);
        assert!(!out.contains('\n'));
    }

    #[test]
    fn large_text_is_truncated_under_soft_limit() {
        let reply = text_reply(json!(4), "a".repeat(150 * KIB));
        let out = ResponseGuard::default().finalize_value(reply);

        assert!(out.len() <= 100 * KIB, "frame is {} bytes", out.len());
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["id"], 4);
        let text = value["result"]["content"][0]["text"].as_str().unwrap();
        let body = text.split(TRUNCATION_MARKER).next().unwrap();
        assert!(body.len() <= 50 * KIB);
        assert!(text.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let reply = text_reply(json!(1), "é".repeat(80 * KIB));
        let out = ResponseGuard::default().finalize_value(reply);
        let value: Value = serde_json::from_str(&out).unwrap();
        let text = value["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with('é'));
        assert!(text.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn untruncatable_huge_reply_collapses_to_error() {
        let chunk = "b".repeat(2_500_000);
        let reply = json!({
            "jsonrpc": "2.0",
            "id": "big",
            "result": {"content": [
                {"type": "text", "text": chunk.clone()},
                {"type": "text", "text": chunk}
            ]}
        });
        let out = ResponseGuard::default().finalize_value(reply);

        assert!(out.len() < KIB, "error frame is {} bytes", out.len());
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["id"], "big");
        assert_eq!(value["error"]["code"], -32603);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn between_soft_and_hard_without_single_text_passes() {
        let reply = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"tools": ["x".repeat(150 * KIB)]}
        });
        let out = ResponseGuard::default().finalize_value(reply);
        assert!(out.len() > 100 * KIB);
        assert!(out.contains("\"result\""));
    }

    #[test]
    fn custom_limits_apply() {
        let guard = ResponseGuard::new(&LimitsConfig {
            soft_limit_bytes: 200,
            content_cap_bytes: 50,
            hard_limit_bytes: 400,
        });
        let out = guard.finalize_value(text_reply(json!(1), "z".repeat(1000)));
        assert!(out.len() < 400);
        assert!(out.contains(TRUNCATION_MARKER.trim_start()));
    }

    #[test]
    fn non_object_reply_becomes_error() {
        let out = ResponseGuard::default().finalize_value(json!([1, 2]));
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["error"]["code"], -32603);
    }

    #[test]
    fn ascii_json_escapes_non_ascii() {
        let json = to_ascii_json(&json!({"t": "héllo 😀"})).unwrap();
        assert!(json.is_ascii());
        assert!(json.contains("\\u00e9"));
        assert!(json.contains("\\ud83d\\ude00"));
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back["t"], "héllo 😀");
    }
}
