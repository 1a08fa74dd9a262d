//! Error types for standard-finder-mcp.
//!
//! Each concern has its own closed error set. Conversion into wire errors
//! happens only at the dispatcher boundary (see [`crate::mcp::dispatcher`]).

use std::path::PathBuf;

use thiserror::Error;

use crate::docs::BackendError;
use crate::mcp::protocol::{ErrorCode, JsonRpcErrorData, RequestId};

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while decoding an inbound message.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The payload is not well-formed JSON.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// The payload is JSON but not a usable message envelope.
    #[error("Invalid Request: {reason}")]
    Structural {
        /// Identifier of the message, if one could be read.
        id: Option<RequestId>,
        /// What is wrong with the envelope.
        reason: &'static str,
    },

    /// The `id` member is present but neither a string nor a number.
    #[error("Invalid Request: id must be a string or a number, got {kind}")]
    InvalidId {
        /// JSON type of the rejected id.
        kind: &'static str,
    },

    /// The input line was longer than the transport accepts.
    #[error("Invalid Request: message exceeds {limit} bytes")]
    Oversized {
        /// Maximum accepted line length in bytes.
        limit: usize,
    },
}

impl DecodeError {
    /// Returns the identifier that may be echoed back, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::Structural { id, .. } => id.clone(),
            Self::Parse(_) | Self::InvalidId { .. } | Self::Oversized { .. } => None,
        }
    }

    /// Converts this error into a JSON-RPC error object.
    #[must_use]
    pub fn to_error_data(&self) -> JsonRpcErrorData {
        let code = match self {
            Self::Parse(_) => ErrorCode::ParseError,
            Self::Structural { .. } | Self::InvalidId { .. } | Self::Oversized { .. } => {
                ErrorCode::InternalError
            }
        };
        JsonRpcErrorData::with_message(code, self.to_string())
    }
}

/// Errors raised while routing a request.
///
/// All of these surface as JSON-RPC errors with the internal-error code.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The method is neither a handled request nor a known notification.
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// `tools/call` named a tool that is not registered.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The request parameters do not have the expected shape.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// A normal method arrived before `initialize` in strict mode.
    #[error("Server not initialized: {0} requires a prior initialize request")]
    NotInitialized(String),

    /// The result could not be converted to JSON.
    #[error("Failed to serialise result: {0}")]
    Serialisation(#[from] serde_json::Error),
}

impl DispatchError {
    /// Converts this error into a JSON-RPC error object.
    #[must_use]
    pub fn to_error_data(&self) -> JsonRpcErrorData {
        JsonRpcErrorData::with_message(ErrorCode::InternalError, self.to_string())
    }
}

/// Errors raised by a tool handler.
///
/// These are reported to the client as tool output, not as protocol errors.
#[derive(Error, Debug)]
pub enum ToolError {
    /// A required argument is missing or has the wrong type.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The document backend failed.
    #[error("{context}: {source}")]
    Backend {
        /// What the tool was doing, e.g. "Error fetching RFC 2616".
        context: String,
        /// The underlying backend failure.
        #[source]
        source: BackendError,
    },

    /// The tool result could not be serialised.
    #[error("Failed to serialise tool output: {0}")]
    Output(#[from] serde_json::Error),
}

impl ToolError {
    /// Wraps a backend failure with a human-readable context prefix.
    pub fn backend(context: impl Into<String>, source: BackendError) -> Self {
        Self::Backend {
            context: context.into(),
            source,
        }
    }
}
