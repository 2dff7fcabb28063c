//! Agent session for structured exchanges with the Claude Code CLI
//!
//! # Module Organization
//!
//! - [`state`] - Session state snapshot
//! - [`core`] - Core AgentSession struct and lifecycle methods (connect, close, shutdown)
//! - [`respond`] - Request execution and output streaming
//!
//! # Examples
//!
//! ```no_run
//! # use structclaude::{AgentSession, SessionConfig};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = AgentSession::connect(SessionConfig::default()).await?;
//!
//! let answer = session.respond_value("What is 2+2? Reply as {\"answer\": n}").await?;
//! println!("{answer}");
//!
//! session.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod respond;
pub mod state;

pub use self::core::AgentSession;
pub use self::state::SessionState;
