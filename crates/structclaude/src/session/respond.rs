//! Request execution and output streaming
//!
//! A request is one user line written to stdin, followed by reading stdout
//! until a successful result carrying `structured_output` arrives.

use crate::error::{AgentError, Result};
use crate::framer::LineFramer;
use crate::log::LogLevel;
use crate::session::core::AgentSession;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use structclaude_protocol::{JsonValue, UserInput};
use structclaude_transport::Transport;
use tracing::{debug, instrument};

/// How reading the output ended
enum Outcome {
    Payload(String),
    Exhausted,
    Failed(AgentError),
}

impl<T: Transport + 'static> AgentSession<T> {
    /// Send a prompt and decode the structured result as `R`
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use structclaude::{AgentSession, SessionConfig};
    /// #[derive(serde::Deserialize)]
    /// struct Sum {
    ///     total: i64,
    /// }
    ///
    /// # async fn example() -> structclaude::Result<()> {
    /// let session = AgentSession::connect(SessionConfig::default()).await?;
    /// let sum: Sum = session.respond("Add 2 and 3. Answer as {\"total\": n}").await?;
    /// assert_eq!(sum.total, 5);
    /// session.close().await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// - [`AgentError::SessionNotReady`] if the session is closed
    /// - [`AgentError::ProcessExited`] if output ends without a result
    /// - [`AgentError::Parse`] on line buffer overflow
    /// - [`AgentError::OutputDecodingFailed`] if the payload is not an `R`
    /// - [`AgentError::Timeout`] if `response_timeout` elapses
    pub async fn respond<R>(&self, prompt: impl Into<String>) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let payload = self.respond_raw(prompt).await?;
        serde_json::from_str(&payload).map_err(|cause| AgentError::OutputDecodingFailed {
            target: std::any::type_name::<R>(),
            cause,
        })
    }

    /// Send a prompt and return the structured result as a [`JsonValue`]
    pub async fn respond_value(&self, prompt: impl Into<String>) -> Result<JsonValue> {
        self.respond(prompt).await
    }

    /// Send a prompt and return the canonical JSON text of the result
    #[instrument(skip_all)]
    pub async fn respond_raw(&self, prompt: impl Into<String>) -> Result<String> {
        // Held for the whole exchange: one request in flight per session
        let mut framer = self.framer.lock().await;

        let input = UserInput::new(prompt);
        self.transport.write(&input).await?;
        debug!(prompt_len = input.prompt().len(), "prompt sent");

        let mut lines = 0u64;
        let outcome = self.read_until_result(&mut framer, &mut lines).await;

        let mut state = self.state.lock().await;
        match outcome {
            Outcome::Payload(payload) => {
                state.record_response(lines, framer.session_id());
                Ok(payload)
            }
            Outcome::Failed(err) => {
                state.record_lines(lines, framer.session_id());
                Err(err)
            }
            Outcome::Exhausted => {
                state.record_lines(lines, framer.session_id());
                drop(state);
                let code = self.transport.exit_code().await.unwrap_or(-1);
                let stderr_tail = self.transport.stderr_tail().await;
                debug!(code, "output ended without a result");
                Err(AgentError::ProcessExited { code, stderr_tail })
            }
        }
    }

    /// Raw stdout chunks as they arrive from the transport
    ///
    /// The stream ends when the process's output ends or the session is
    /// closed. Bytes taken through this stream bypass the framer, so do not
    /// mix it with [`respond`](AgentSession::respond).
    pub fn output_chunks(&self) -> impl Stream<Item = Bytes> + Send + use<T> {
        let transport = Arc::clone(&self.transport);
        stream::unfold(transport, |transport| async move {
            let chunk = transport.recv_chunk().await?;
            Some((chunk, transport))
        })
    }

    async fn read_until_result(&self, framer: &mut LineFramer, lines: &mut u64) -> Outcome {
        let sink = Arc::clone(&self.config.log_sink);
        let deadline = self
            .config
            .response_timeout
            .map(|limit| (tokio::time::Instant::now() + limit, limit));
        let mut on_line = |line: &str| {
            *lines += 1;
            sink(line, LogLevel::Debug);
        };

        // Lines left over from the previous request come first
        match framer.feed_with(&[], &mut on_line) {
            Ok(Some(payload)) => return Outcome::Payload(payload),
            Ok(None) => {}
            Err(err) => return Outcome::Failed(err),
        }

        let mut chunks = std::pin::pin!(self.output_chunks());
        loop {
            let next = match deadline {
                Some((at, limit)) => match tokio::time::timeout_at(at, chunks.next()).await {
                    Ok(next) => next,
                    Err(_) => return Outcome::Failed(AgentError::Timeout(limit)),
                },
                None => chunks.next().await,
            };
            let Some(chunk) = next else {
                return Outcome::Exhausted;
            };

            match framer.feed_with(&chunk, &mut on_line) {
                Ok(Some(payload)) => return Outcome::Payload(payload),
                Ok(None) => {}
                Err(err) => return Outcome::Failed(err),
            }
        }
    }
}
