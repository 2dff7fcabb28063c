//! Testing utilities
//!
//! Provides a scripted transport for exercising [`AgentSession`](crate::AgentSession)
//! without a real Claude CLI process.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use structclaude_protocol::UserInput;
use structclaude_transport::{Result, Transport, TransportError, TransportPhase};
use tokio::sync::Notify;

/// Transport that replays queued output chunks
///
/// Allows tests to:
/// - Queue stdout chunks, split at arbitrary byte positions
/// - Inspect the messages written to stdin
/// - Simulate an exit code, stderr output, or a failed connect
/// - Keep the output open after the queue drains, like a live process
pub struct ScriptedTransport {
    chunks: Mutex<VecDeque<Bytes>>,
    written: Mutex<Vec<UserInput>>,
    phase: Mutex<TransportPhase>,
    connect_error: Mutex<Option<TransportError>>,
    exit_code: Option<i32>,
    stderr: String,
    hold_open: bool,
    wake: Notify,
    close_calls: AtomicUsize,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// Create a transport with no output
    pub fn new() -> Self {
        Self {
            chunks: Mutex::new(VecDeque::new()),
            written: Mutex::new(Vec::new()),
            phase: Mutex::new(TransportPhase::Disconnected),
            connect_error: Mutex::new(None),
            exit_code: None,
            stderr: String::new(),
            hold_open: false,
            wake: Notify::new(),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Queue one chunk
    pub fn with_chunk(self, chunk: impl Into<Bytes>) -> Self {
        lock(&self.chunks).push_back(chunk.into());
        self
    }

    /// Queue each line, newline-terminated, as its own chunk
    pub fn with_lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            let mut text = line.as_ref().to_string();
            text.push('\n');
            lock(&self.chunks).push_back(Bytes::from(text));
        }
        self
    }

    /// Queue `output` split into chunks of `chunk_size` bytes
    pub fn with_output_chunked(self, output: &[u8], chunk_size: usize) -> Self {
        for piece in output.chunks(chunk_size.max(1)) {
            lock(&self.chunks).push_back(Bytes::copy_from_slice(piece));
        }
        self
    }

    /// Report this exit code and stderr once output has ended
    pub fn with_exit(mut self, code: i32, stderr: impl Into<String>) -> Self {
        self.exit_code = Some(code);
        self.stderr = stderr.into();
        self
    }

    /// Fail the next `connect` with `err`
    pub fn with_connect_error(self, err: TransportError) -> Self {
        *lock(&self.connect_error) = Some(err);
        self
    }

    /// Keep the output open once the queue drains, until `close`
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Queue a chunk after construction, waking a held-open reader
    pub fn push_chunk(&self, chunk: impl Into<Bytes>) {
        lock(&self.chunks).push_back(chunk.into());
        self.wake.notify_waiters();
    }

    /// Messages written so far
    pub fn written(&self) -> Vec<UserInput> {
        lock(&self.written).clone()
    }

    /// Chunks not yet consumed
    pub fn remaining_chunks(&self) -> usize {
        lock(&self.chunks).len()
    }

    /// How many times `close` has been called
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn current_phase(&self) -> TransportPhase {
        *lock(&self.phase)
    }
}

/// Lock a std mutex, recovering the data from a poisoned one
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self) -> Result<()> {
        if let Some(err) = lock(&self.connect_error).take() {
            return Err(err);
        }
        let mut phase = lock(&self.phase);
        match *phase {
            TransportPhase::Closed => Err(TransportError::NotReady),
            _ => {
                *phase = TransportPhase::Running;
                Ok(())
            }
        }
    }

    async fn write(&self, message: &UserInput) -> Result<()> {
        if self.current_phase() != TransportPhase::Running {
            return Err(TransportError::NotReady);
        }
        lock(&self.written).push(message.clone());
        Ok(())
    }

    async fn recv_chunk(&self) -> Option<Bytes> {
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.current_phase() == TransportPhase::Closed {
                return None;
            }
            if let Some(chunk) = lock(&self.chunks).pop_front() {
                return Some(chunk);
            }
            if !self.hold_open {
                return None;
            }
            notified.await;
        }
    }

    async fn phase(&self) -> TransportPhase {
        self.current_phase()
    }

    async fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    async fn stderr_tail(&self) -> String {
        self.stderr.clone()
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.phase) = TransportPhase::Closed;
        self.wake.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_transport_lifecycle() {
        let transport = ScriptedTransport::new().with_lines(["a", "b"]);
        assert!(matches!(
            transport.write(&UserInput::new("early")).await,
            Err(TransportError::NotReady)
        ));

        transport.connect().await.unwrap();
        transport.write(&UserInput::new("hi")).await.unwrap();
        assert_eq!(transport.written()[0].prompt(), "hi");

        assert_eq!(transport.recv_chunk().await.as_deref(), Some(&b"a\n"[..]));
        assert_eq!(transport.remaining_chunks(), 1);

        transport.close().await.unwrap();
        assert!(transport.recv_chunk().await.is_none());
        assert!(matches!(transport.connect().await, Err(TransportError::NotReady)));
        assert_eq!(transport.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_chunked_output_preserves_bytes() {
        let transport = ScriptedTransport::new().with_output_chunked(b"abcdefg", 3);
        transport.connect().await.unwrap();

        let mut out = Vec::new();
        while let Some(chunk) = transport.recv_chunk().await {
            out.extend_from_slice(&chunk);
        }
        assert_eq!(out, b"abcdefg");
    }

    #[tokio::test]
    async fn test_hold_open_ends_on_close() {
        let transport = std::sync::Arc::new(ScriptedTransport::new().hold_open());
        transport.connect().await.unwrap();

        let reader = {
            let transport = std::sync::Arc::clone(&transport);
            tokio::spawn(async move { transport.recv_chunk().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        transport.close().await.unwrap();

        let chunk = tokio::time::timeout(std::time::Duration::from_secs(1), reader)
            .await
            .unwrap()
            .unwrap();
        assert!(chunk.is_none());
    }
}
