//! Core session management
//!
//! Provides the main AgentSession struct, session creation and teardown.

use crate::config::SessionConfig;
use crate::error::Result;
use crate::framer::LineFramer;
use crate::session::state::SessionState;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use structclaude_transport::{CliTransport, Transport};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A session with the Claude Code CLI that yields typed results
///
/// The session owns its transport. Requests are served one at a time; a
/// second [`respond`](AgentSession::respond) waits for the first to finish.
///
/// Close the session with [`close`](AgentSession::close) or
/// [`shutdown`](AgentSession::shutdown). Dropping an open session inside a
/// Tokio runtime schedules a bounded close in the background; outside a
/// runtime the child process is killed when the transport is dropped.
pub struct AgentSession<T: Transport + 'static = CliTransport> {
    /// Transport to the CLI
    pub(crate) transport: Arc<T>,

    /// Configuration
    pub(crate) config: Arc<SessionConfig>,

    /// Framer holding bytes not yet consumed; its lock serializes requests
    pub(crate) framer: Mutex<LineFramer>,

    /// Session state
    pub(crate) state: Mutex<SessionState>,

    /// Set once teardown has been requested
    pub(crate) closed: AtomicBool,
}

impl AgentSession<CliTransport> {
    /// Locate and launch the CLI, returning a connected session
    ///
    /// # Errors
    ///
    /// [`AgentError::WorkingDirectoryNotFound`](crate::AgentError::WorkingDirectoryNotFound),
    /// [`AgentError::ExecutableNotFound`](crate::AgentError::ExecutableNotFound) or
    /// [`AgentError::ProcessLaunchFailed`](crate::AgentError::ProcessLaunchFailed).
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let transport = CliTransport::new(config.to_process_config()?);
        Self::with_transport(transport, config).await
    }
}

impl<T: Transport + 'static> AgentSession<T> {
    /// Connect a session over any transport
    ///
    /// If connecting fails the transport is closed before the error is
    /// returned.
    pub async fn with_transport(transport: T, config: SessionConfig) -> Result<Self> {
        if let Err(e) = transport.connect().await {
            if let Err(close_err) = transport.close().await {
                debug!(error = %close_err, "close after failed connect");
            }
            return Err(e.into());
        }
        debug!("agent session connected");

        Ok(Self {
            transport: Arc::new(transport),
            framer: Mutex::new(LineFramer::with_max_buffer(config.max_buffer_bytes)),
            config: Arc::new(config),
            state: Mutex::new(SessionState::connected()),
            closed: AtomicBool::new(false),
        })
    }

    /// The underlying transport
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// The session's configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Snapshot of the session state
    pub async fn state(&self) -> SessionState {
        let mut state = self.state.lock().await.clone();
        state.is_connected = !state.is_closed && self.transport.is_connected().await;
        state
    }

    /// Whether the session can still accept requests
    pub async fn is_connected(&self) -> bool {
        self.state().await.is_connected
    }

    /// Close the session
    ///
    /// Signals end of input, stops the readers and terminates the CLI.
    /// Safe to call more than once. Any request in flight finishes with
    /// [`AgentError::ProcessExited`](crate::AgentError::ProcessExited).
    pub async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let outcome = self.transport.close().await;
        self.state.lock().await.mark_closed();
        debug!("agent session closed");
        outcome.map_err(Into::into)
    }

    /// Close the session, giving up after the configured teardown timeout
    pub async fn shutdown(self) -> Result<()> {
        let limit = self.config.teardown_timeout;
        match tokio::time::timeout(limit, self.close()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout_ms = limit.as_millis() as u64, "session shutdown timed out");
                Ok(())
            }
        }
    }
}

impl<T: Transport + 'static> Drop for AgentSession<T> {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("session dropped outside a runtime, skipping async close");
            return;
        };

        let transport = Arc::clone(&self.transport);
        let limit = self.config.teardown_timeout;
        handle.spawn(async move {
            match tokio::time::timeout(limit, transport.close()).await {
                Ok(Ok(())) => debug!("session closed on drop"),
                Ok(Err(e)) => warn!(error = %e, "close on drop failed"),
                Err(_) => warn!("close on drop timed out"),
            }
        });
    }
}
