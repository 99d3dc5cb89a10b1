//! ByteBell MCP - MCP server exposing knowledge-base retrieval to AI assistants
//!
//! # Tools
//!
//! - **bytebell_agent**: full two-phase retrieval, returned as grounding
//!   context with instructions for the calling model
//! - **search_namespace**: a single meta or base stage, returned as labelled
//!   results

pub mod error;
pub mod server;
pub mod tools;

// Re-exports
pub use error::{McpError, Result};
pub use server::{wrap_context, ByteBellServer, ServerConfig};
