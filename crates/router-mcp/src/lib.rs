//! router-mcp - Model Context Protocol adapter
//!
//! Serves the operation catalog as MCP tools over newline-delimited JSON-RPC
//! 2.0 (stdio in production). `tools/list` schemas are generated from the
//! catalog's parameter declarations; `tools/call` goes through the same
//! dispatcher as the HTTP API.
//!
//! Unlike the HTTP API, operation failures are returned as ordinary tool
//! results carrying `{"error": ...}`. Only protocol faults (unparseable input,
//! unknown method or tool) become JSON-RPC errors.

pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;

pub use error::McpError;
pub use server::McpServer;
