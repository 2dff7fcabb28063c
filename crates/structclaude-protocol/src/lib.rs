//! Wire and value types for driving the Claude CLI over stream-json
//!
//! This crate provides the pure data side of the protocol, shared by the
//! transport (`structclaude-transport`) and the agent SDK (`structclaude`).
//!
//! # Type Organization
//!
//! - **Value model**: [`value`] - schema-free JSON tree with canonical encoding
//! - **Message types**: [`message`] - outbound user input, inbound tagged events
//! - **Error types**: [`error`] - decode and encode failures
//!
//! # Design Principles
//!
//! - **Zero I/O**: All types are pure data structures
//! - **Serialization**: serde-based, `serde_json` on the wire
//! - **No circular dependencies**: depends only on serde

#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! # Usage
//!
//! ```
//! use structclaude_protocol::{AgentMessage, UserInput};
//!
//! let line = UserInput::new("What is 2+2?").to_json_line().unwrap();
//! assert!(line.starts_with(r#"{"type":"user""#));
//!
//! let event = AgentMessage::from_line(
//!     r#"{"type":"result","subtype":"success","structured_output":{"answer":4}}"#,
//! )
//! .unwrap();
//! assert!(event.terminal_payload().is_some());
//! ```

pub mod error;
pub mod message;
pub mod value;

// Re-export commonly used types at crate level
pub use error::{ProtocolError, Result};
pub use message::{AgentMessage, InputContent, MessageRole, ResultMessage, UserInput};
pub use value::{JsonNumber, JsonValue};
