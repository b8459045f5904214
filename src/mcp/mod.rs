//! MCP (Model Context Protocol) Server Implementation
//!
//! JSON-RPC 2.0 over stdio, exposing the gateway's database lookups as MCP
//! tools.

#[cfg(test)]
mod tests;

pub mod errors;
pub mod format;
pub mod protocol;
pub mod server;
pub mod tools;

pub use errors::{ErrorHandler, McpError};
pub use server::{ConnectionState, McpServer, MessageHandler, ToolHandler};
pub use tools::ToolRegistry;
