//! Subprocess transport for CLI communication
//!
//! Implements communication with the Claude Code CLI via stdin/stdout.

pub mod cli;
pub mod discovery;
pub mod process;

pub use cli::CliTransport;
pub use discovery::locate_executable;
pub use process::ProcessConfig;
