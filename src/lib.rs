//! standard-finder-mcp: MCP server for IETF and OpenID standards documents
//!
//! This library exposes RFCs, Internet-Drafts, IETF working-group listings and
//! OpenID Foundation specifications as tools to AI assistants.
//!
//! # Architecture
//!
//! The MCP layer is generic; the tools are thin adapters over the document
//! backend:
//!
//! - **Transport**: newline-delimited JSON-RPC over stdio, or one message per
//!   HTTP POST
//! - **Dispatcher**: session state, method routing, argument unwrapping
//! - **Response guard**: every outbound frame is bounded in size and always
//!   valid JSON
//! - **Document backend**: fetches, parses and caches documents
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`docs`]: Document retrieval, parsing and caching
//! - [`error`]: Error types
//! - [`mcp`]: MCP protocol implementation
//! - [`tools`]: The tools offered to clients

pub mod config;
pub mod docs;
pub mod error;
pub mod mcp;
pub mod tools;
