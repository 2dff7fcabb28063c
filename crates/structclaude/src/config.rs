//! Session configuration

use crate::error::Result;
use crate::framer::MAX_BUFFER_BYTES;
use crate::log::{LogSink, tracing_sink};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use structclaude_protocol::JsonValue;
use structclaude_transport::ProcessConfig;

/// Arguments that put the CLI into one-shot stream-json mode
pub const DEFAULT_CLI_ARGS: &[&str] = &[
    "--print",
    "--input-format",
    "stream-json",
    "--output-format",
    "stream-json",
    "--verbose",
];

/// Bound on `AgentSession::shutdown` and the drop-time teardown
pub const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for an agent session
///
/// Controls how the CLI is located and launched and how its output is
/// consumed.
#[derive(Clone)]
pub struct SessionConfig {
    /// Executable name or path of the Claude Code CLI
    pub cli_path: String,

    /// Arguments passed to the CLI
    pub args: Vec<String>,

    /// Environment variables for the CLI
    pub env: HashMap<String, String>,

    /// Keep the parent's environment underneath `env`
    ///
    /// On by default: the CLI finds its credentials through `HOME`.
    pub inherit_env: bool,

    /// Working directory; must exist when connecting
    pub working_dir: Option<PathBuf>,

    /// Schema handed to the CLI as `--json-schema`
    pub json_schema: Option<JsonValue>,

    /// Limit on bytes buffered while waiting for a newline
    pub max_buffer_bytes: usize,

    /// Give up on a response after this long; `None` waits indefinitely
    pub response_timeout: Option<Duration>,

    /// Bound on closing the session
    pub teardown_timeout: Duration,

    /// Receives every stdout line before it is parsed
    pub log_sink: LogSink,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("cli_path", &self.cli_path)
            .field("args", &self.args)
            .field("env_keys", &self.env.keys().collect::<Vec<_>>())
            .field("inherit_env", &self.inherit_env)
            .field("working_dir", &self.working_dir)
            .field("json_schema", &self.json_schema)
            .field("max_buffer_bytes", &self.max_buffer_bytes)
            .field("response_timeout", &self.response_timeout)
            .field("teardown_timeout", &self.teardown_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cli_path: "claude".to_string(),
            args: DEFAULT_CLI_ARGS.iter().map(|a| a.to_string()).collect(),
            env: HashMap::new(),
            inherit_env: true,
            working_dir: None,
            json_schema: None,
            max_buffer_bytes: MAX_BUFFER_BYTES,
            response_timeout: None,
            teardown_timeout: TEARDOWN_TIMEOUT,
            log_sink: tracing_sink(),
        }
    }
}

impl SessionConfig {
    /// Create a new session config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CLI path
    pub fn with_cli_path(mut self, path: impl Into<String>) -> Self {
        self.cli_path = path.into();
        self
    }

    /// Replace the argument list, including the stream-json defaults
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Append an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Choose whether the parent's environment is passed through
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Constrain the CLI's structured output with a JSON schema
    pub fn with_json_schema(mut self, schema: impl Into<JsonValue>) -> Self {
        self.json_schema = Some(schema.into());
        self
    }

    /// Set the line buffer limit
    pub fn with_max_buffer_bytes(mut self, limit: usize) -> Self {
        self.max_buffer_bytes = limit;
        self
    }

    /// Set the response timeout
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Set the teardown timeout
    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }

    /// Set the log sink
    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = sink;
        self
    }

    /// Full CLI argument list, with `--json-schema` appended when set
    ///
    /// # Errors
    ///
    /// Fails if the schema contains a number JSON cannot represent.
    pub fn cli_args(&self) -> Result<Vec<String>> {
        let mut args = self.args.clone();
        if let Some(schema) = &self.json_schema {
            args.push("--json-schema".to_string());
            args.push(schema.to_canonical_string()?);
        }
        Ok(args)
    }

    /// Process configuration for the subprocess transport
    pub fn to_process_config(&self) -> Result<ProcessConfig> {
        let mut process = ProcessConfig::new(self.cli_path.clone())
            .with_args(self.cli_args()?)
            .inherit_env(self.inherit_env)
            .with_close_timeout(self.teardown_timeout);
        for (key, value) in &self.env {
            process = process.with_env(key.clone(), value.clone());
        }
        if let Some(dir) = &self.working_dir {
            process = process.with_working_dir(dir.clone());
        }
        Ok(process)
    }
}
