//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP specification for exposing standards
//! documents (RFCs, Internet Drafts, OpenID specifications) as tools to AI
//! assistants. The server communicates over stdio or HTTP using JSON-RPC 2.0
//! messages.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                             MCP Server                             │
//! │                                                                    │
//! │  ┌───────────┐   ┌─────────┐   ┌────────────┐   ┌──────────────┐   │
//! │  │ Transport │──▶│  Codec  │──▶│ Dispatcher │──▶│   Registry   │   │
//! │  │stdio/http │   │(protocol│   │ (session)  │   │   (tools)    │   │
//! │  └───────────┘   └─────────┘   └────────────┘   └──────────────┘   │
//! │        ▲                             │                 │           │
//! │        │         ┌─────────┐         │          ┌──────────────┐   │
//! │        └─────────│  Guard  │◀────────┘          │   Progress   │   │
//! │                  └─────────┘                    └──────────────┘   │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod dispatcher;
pub mod guard;
pub mod http;
pub mod progress;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use guard::ResponseGuard;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use registry::{ToolContext, ToolDescriptor, ToolHandler, ToolRegistry};
pub use server::McpServer;
pub use transport::StdioTransport;
