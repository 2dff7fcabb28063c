//! CLI transport implementation
//!
//! Manages the lifecycle of the Claude Code CLI process and its pipes:
//!
//! ```text
//! Disconnected --connect()--> Running --close()--> Closed
//! ```
//!
//! Stdout is pumped by a background task into a bounded channel; the
//! consumer pulls chunks at its own pace. Stderr is drained by a second
//! task into a rolling tail used for diagnostics.

use super::discovery::locate_executable;
use super::process::{ProcessConfig, STDERR_TAIL_LIMIT, StderrTail, spawn_process};
use crate::error::{Result, TransportError};
use crate::traits::{Transport, TransportPhase};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use structclaude_protocol::UserInput;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long `exit_code` waits for the process, then for its readers
const EXIT_GRACE: Duration = Duration::from_millis(250);

enum TransportState {
    Disconnected,
    Running {
        child: Child,
        readers: Vec<JoinHandle<()>>,
    },
    Closed {
        exit_code: Option<i32>,
    },
}

impl TransportState {
    fn phase(&self) -> TransportPhase {
        match self {
            Self::Disconnected => TransportPhase::Disconnected,
            Self::Running { .. } => TransportPhase::Running,
            Self::Closed { .. } => TransportPhase::Closed,
        }
    }
}

/// CLI transport for Claude Code agent communication
///
/// Construct with [`CliTransport::new`], then [`Transport::connect`]. A closed
/// transport cannot be reconnected; start a fresh one instead.
pub struct CliTransport {
    config: ProcessConfig,
    state: Mutex<TransportState>,
    stdin: Mutex<Option<ChildStdin>>,
    chunks: Mutex<Option<mpsc::Receiver<Bytes>>>,
    stderr_tail: Arc<Mutex<StderrTail>>,
}

impl CliTransport {
    /// Create a disconnected transport
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            config,
            state: Mutex::new(TransportState::Disconnected),
            stdin: Mutex::new(None),
            chunks: Mutex::new(None),
            stderr_tail: Arc::new(Mutex::new(StderrTail::new(STDERR_TAIL_LIMIT))),
        }
    }

    /// Create a transport and connect it
    pub async fn spawn(config: ProcessConfig) -> Result<Self> {
        let transport = Self::new(config);
        transport.connect().await?;
        Ok(transport)
    }

    /// Get process configuration
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Tear down a running process: readers first, then stdin, then the child
    async fn shut_down_running(
        &self,
        mut child: Child,
        readers: Vec<JoinHandle<()>>,
    ) -> Option<i32> {
        // No reader may touch a pipe once we start releasing them
        for reader in &readers {
            reader.abort();
        }
        for reader in readers {
            let _ = reader.await;
        }
        if let Ok(mut chunks) = self.chunks.try_lock() {
            chunks.take();
        }

        // EOF on stdin; a write in flight keeps the lock, so kill first then
        let mut pending_stdin = true;
        if let Ok(mut stdin) = self.stdin.try_lock() {
            if let Some(mut pipe) = stdin.take() {
                let _ = pipe.shutdown().await;
            }
            pending_stdin = false;
        }

        let still_running = matches!(child.try_wait(), Ok(None));
        if still_running {
            debug!(pid = ?child.id(), "terminating CLI process");
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to signal CLI process");
            }
        }

        let exit_code = match tokio::time::timeout(self.config.close_timeout, child.wait()).await {
            Ok(Ok(status)) => status.code(),
            Ok(Err(e)) => {
                warn!(error = %e, "failed to reap CLI process");
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.close_timeout.as_millis() as u64,
                    "CLI process did not exit in time"
                );
                None
            }
        };

        if pending_stdin {
            self.stdin.lock().await.take();
        }
        exit_code
    }
}

#[async_trait]
impl Transport for CliTransport {
    async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match &*state {
            TransportState::Running { .. } => return Ok(()),
            TransportState::Closed { .. } => return Err(TransportError::NotReady),
            TransportState::Disconnected => {}
        }

        if let Some(dir) = &self.config.working_dir {
            let is_dir = tokio::fs::metadata(dir)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if !is_dir {
                return Err(TransportError::WorkingDirectoryNotFound(dir.clone()));
            }
        }

        let executable = locate_executable(&self.config.cli_path, &self.config.env)?;
        let spawned = spawn_process(&self.config, &executable, Arc::clone(&self.stderr_tail))?;

        *self.stdin.lock().await = Some(spawned.stdin);
        *self.chunks.lock().await = Some(spawned.chunks);
        *state = TransportState::Running {
            child: spawned.child,
            readers: spawned.readers,
        };
        Ok(())
    }

    async fn write(&self, message: &UserInput) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        let pipe = stdin.as_mut().ok_or(TransportError::NotReady)?;

        let mut line = message.to_json_line()?;
        line.push('\n');

        // Write message followed by newline
        pipe.write_all(line.as_bytes()).await?;
        pipe.flush().await?;
        debug!(bytes = line.len(), "wrote input line");
        Ok(())
    }

    async fn recv_chunk(&self) -> Option<Bytes> {
        let mut chunks = self.chunks.lock().await;
        match chunks.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    async fn phase(&self) -> TransportPhase {
        self.state.lock().await.phase()
    }

    async fn exit_code(&self) -> Option<i32> {
        let mut state = self.state.lock().await;
        match &mut *state {
            TransportState::Disconnected => None,
            TransportState::Closed { exit_code } => *exit_code,
            TransportState::Running { child, readers } => {
                let code = match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
                    Ok(Ok(status)) => status.code(),
                    _ => return None,
                };
                // Let the stderr reader catch up so the tail is complete
                let deadline = tokio::time::Instant::now() + EXIT_GRACE;
                while readers.iter().any(|r| !r.is_finished())
                    && tokio::time::Instant::now() < deadline
                {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                code
            }
        }
    }

    async fn stderr_tail(&self) -> String {
        self.stderr_tail.lock().await.as_str().to_string()
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let previous = std::mem::replace(&mut *state, TransportState::Closed { exit_code: None });

        match previous {
            TransportState::Disconnected => {
                debug!("closing transport that never connected");
            }
            TransportState::Closed { exit_code } => {
                *state = TransportState::Closed { exit_code };
            }
            TransportState::Running { child, readers } => {
                let exit_code = self.shut_down_running(child, readers).await;
                debug!(?exit_code, "CLI transport closed");
                *state = TransportState::Closed { exit_code };
            }
        }
        Ok(())
    }
}

impl Drop for CliTransport {
    fn drop(&mut self) {
        // The child itself is kill_on_drop; stop the readers with it
        if let TransportState::Running { readers, .. } = self.state.get_mut() {
            for reader in readers.iter() {
                reader.abort();
            }
        }
    }
}
