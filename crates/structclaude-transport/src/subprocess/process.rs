//! Process management for CLI subprocess

use crate::error::{Result, TransportError};
use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Default size of a single stdout read
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Default number of chunks buffered between the reader task and the consumer
pub const DEFAULT_CHUNK_CHANNEL_CAPACITY: usize = 32;

/// Default bound on reaping the process during `close`
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Bytes of stderr kept for diagnostics
pub const STDERR_TAIL_LIMIT: usize = 8 * 1024;

/// Configuration for spawning a CLI process
#[derive(Clone, Debug)]
pub struct ProcessConfig {
    /// Executable name or path; bare names are looked up, see [`super::discovery`]
    pub cli_path: String,

    /// Arguments to pass to the CLI
    pub args: Vec<String>,

    /// Environment variables to set
    pub env: HashMap<String, String>,

    /// Keep the parent's environment underneath `env`
    pub inherit_env: bool,

    /// Working directory; must exist at connect time
    pub working_dir: Option<PathBuf>,

    /// Size of a single stdout read
    pub read_buffer_size: usize,

    /// Capacity of the chunk channel
    pub chunk_channel_capacity: usize,

    /// Bound on reaping the process during close
    pub close_timeout: Duration,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            cli_path: "claude".to_string(),
            args: Vec::new(),
            env: HashMap::new(),
            inherit_env: false,
            working_dir: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            chunk_channel_capacity: DEFAULT_CHUNK_CHANNEL_CAPACITY,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

impl ProcessConfig {
    /// Create a new process configuration
    pub fn new(cli_path: impl Into<String>) -> Self {
        Self {
            cli_path: cli_path.into(),
            ..Default::default()
        }
    }

    /// Add an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable
    ///
    /// # Security Note
    ///
    /// Unless [`ProcessConfig::inherit_env`] is set, the parent process's
    /// environment is cleared and only the variables explicitly set here are
    /// passed to the child process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Pass the parent's environment through to the child
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the stdout read size
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Set the chunk channel capacity
    pub fn with_chunk_channel_capacity(mut self, capacity: usize) -> Self {
        self.chunk_channel_capacity = capacity.max(1);
        self
    }

    /// Set the close timeout
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

/// Rolling tail of the process's stderr
#[derive(Debug, Clone)]
pub(crate) struct StderrTail {
    text: String,
    limit: usize,
}

impl StderrTail {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit,
        }
    }

    pub(crate) fn push_line(&mut self, line: &str) {
        self.push_partial(line);
        self.push_partial("\n");
    }

    /// Append text that does not end a line
    pub(crate) fn push_partial(&mut self, text: &str) {
        self.text.push_str(text);
        if self.text.len() > self.limit {
            let mut cut = self.text.len() - self.limit;
            while !self.text.is_char_boundary(cut) {
                cut += 1;
            }
            self.text.drain(..cut);
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }
}

/// A freshly spawned process with its reader tasks running
pub(crate) struct SpawnedProcess {
    pub(crate) child: Child,
    pub(crate) stdin: ChildStdin,
    pub(crate) chunks: mpsc::Receiver<Bytes>,
    pub(crate) readers: Vec<JoinHandle<()>>,
}

/// Spawn the CLI and start one reader task per output pipe
///
/// # Security
///
/// The spawned process's environment is isolated from the parent process
/// unless `inherit_env` is set.
pub(crate) fn spawn_process(
    config: &ProcessConfig,
    executable: &Path,
    stderr_tail: Arc<Mutex<StderrTail>>,
) -> Result<SpawnedProcess> {
    let mut cmd = Command::new(executable);
    cmd.args(&config.args);

    if !config.inherit_env {
        cmd.env_clear();
    }
    cmd.envs(&config.env);

    if let Some(dir) = &config.working_dir {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(TransportError::LaunchFailed)?;
    debug!(executable = %executable.display(), pid = ?child.id(), "spawned CLI process");

    let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
    let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

    let (tx, chunks) = mpsc::channel(config.chunk_channel_capacity);
    let readers = vec![
        tokio::spawn(pump_stdout(stdout, tx, config.read_buffer_size)),
        tokio::spawn(pump_stderr(stderr, stderr_tail)),
    ];

    Ok(SpawnedProcess {
        child,
        stdin,
        chunks,
        readers,
    })
}

fn missing_pipe(name: &str) -> TransportError {
    TransportError::LaunchFailed(std::io::Error::other(format!("{name} pipe unavailable")))
}

/// Forward stdout to the chunk channel until EOF; dropping `tx` ends the sequence
async fn pump_stdout(mut stdout: ChildStdout, tx: mpsc::Sender<Bytes>, read_size: usize) {
    let mut buf = BytesMut::with_capacity(read_size);
    loop {
        buf.reserve(read_size);
        match stdout.read_buf(&mut buf).await {
            Ok(0) => {
                debug!("CLI stdout closed");
                break;
            }
            Ok(n) => {
                trace!(bytes = n, "stdout chunk");
                if tx.send(buf.split().freeze()).await.is_err() {
                    debug!("chunk consumer gone, stopping stdout reader");
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "CLI stdout read failed");
                break;
            }
        }
    }
}

/// Copy stderr into the tail, one line at a time
///
/// A single read never holds more than `STDERR_TAIL_LIMIT` bytes, so a long
/// unterminated line arrives as several partial pieces.
async fn pump_stderr<R>(stderr: R, tail: Arc<Mutex<StderrTail>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();
    loop {
        line.clear();
        let mut piece = (&mut reader).take(STDERR_TAIL_LIMIT as u64);
        match piece.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                let mut tail = tail.lock().await;
                if line.ends_with(b"\n") {
                    let text = text.trim_end_matches(['\n', '\r']);
                    debug!(target: "structclaude::stderr", "{text}");
                    tail.push_line(text);
                } else {
                    trace!(bytes = line.len(), "partial stderr line");
                    tail.push_partial(&text);
                }
            }
            Err(e) => {
                warn!(error = %e, "CLI stderr read failed");
                break;
            }
        }
    }
}
