//! Tool registry.
//!
//! Maps tool names to handlers and their declared input schemas. The map keeps
//! insertion order, which is the order `tools/list` reports tools in.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::mcp::progress::RequestProgress;
use crate::mcp::protocol::RequestId;

/// Everything a tool handler receives for one call.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Resolved arguments (already unwrapped from any wrapper object).
    pub arguments: Map<String, Value>,
    /// The originating request id, for progress-capable tools.
    pub request_id: Option<RequestId>,
    /// Progress reporter bound to the request, for progress-capable tools.
    pub progress: Option<RequestProgress>,
}

impl ToolContext {
    /// Creates a context with arguments only.
    #[must_use]
    pub const fn new(arguments: Map<String, Value>) -> Self {
        Self {
            arguments,
            request_id: None,
            progress: None,
        }
    }

    /// Returns a required string argument.
    ///
    /// Numbers are accepted and rendered as strings, since clients often send
    /// RFC numbers unquoted.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] if the argument is missing or
    /// not a string or number.
    pub fn required_str(&self, name: &str) -> Result<String, ToolError> {
        match self.arguments.get(name) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(_) => Err(ToolError::InvalidArguments(format!(
                "parameter '{name}' must be a non-empty string"
            ))),
            None => Err(ToolError::InvalidArguments(format!(
                "missing required parameter: {name}"
            ))),
        }
    }

    /// Returns an optional string argument or the given default.
    #[must_use]
    pub fn str_or(&self, name: &str, default: &str) -> String {
        self.arguments
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    /// Returns an optional non-negative integer argument or the given default.
    ///
    /// Numeric strings are accepted.
    #[must_use]
    pub fn usize_or(&self, name: &str, default: usize) -> usize {
        match self.arguments.get(name) {
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// Returns an optional boolean argument or the given default.
    #[must_use]
    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        match self.arguments.get(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => default,
            },
            _ => default,
        }
    }
}

/// An asynchronous tool implementation.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool. The returned string becomes the text content of the reply.
    async fn call(&self, ctx: ToolContext) -> Result<String, ToolError>;
}

/// A registered tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description; only the first line is listed.
    pub description: String,
    /// Schema identifier, also accepted as a wrapper key around the arguments.
    pub schema_id: String,
    /// JSON Schema for the tool's input, if declared.
    pub input_schema: Option<Value>,
    /// Whether the tool receives the request id and a progress reporter.
    pub supports_progress: bool,
    /// The implementation.
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("schema_id", &self.schema_id)
            .field("supports_progress", &self.supports_progress)
            .finish_non_exhaustive()
    }
}

/// A tool definition for the tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// First line of the tool description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Builds the listing entry for this tool.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        let description = self
            .description
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        ToolDefinition {
            name: self.name.clone(),
            description,
            input_schema: self
                .input_schema
                .clone()
                .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
        }
    }
}

/// Registry of available tools, in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    ///
    /// Registering a name twice replaces the earlier descriptor (last wins);
    /// the tool keeps the listing position of its first registration. The
    /// replaced descriptor is returned.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Option<ToolDescriptor> {
        let name = descriptor.name.clone();
        let previous = self.tools.insert(name.clone(), descriptor);
        if previous.is_some() {
            tracing::warn!(tool = %name, "Tool registered twice, replacing earlier handler");
        } else {
            tracing::debug!(tool = %name, "Registered tool");
        }
        previous
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// Iterates over tools in registration order.
    pub fn list(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// Returns the tools/list payload entries.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.list().map(ToolDescriptor::definition).collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
