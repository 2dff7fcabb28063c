//! Session state management
//!
//! Tracks connection status and per-session counters.

/// Current state of the agent session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Whether the session is connected to the CLI
    pub is_connected: bool,

    /// Whether the session has been closed; closed sessions stay closed
    pub is_closed: bool,

    /// Number of structured results received
    pub responses_completed: u64,

    /// Number of non-empty stdout lines seen
    pub lines_seen: u64,

    /// CLI session identifier from the most recent event carrying one
    pub session_id: Option<String>,
}

impl SessionState {
    /// State of a freshly connected session
    pub(crate) fn connected() -> Self {
        Self {
            is_connected: true,
            ..Default::default()
        }
    }

    /// Record a finished exchange
    pub(crate) fn record_response(&mut self, lines: u64, session_id: Option<&str>) {
        self.responses_completed += 1;
        self.record_lines(lines, session_id);
    }

    /// Record lines read during an exchange that did not complete
    pub(crate) fn record_lines(&mut self, lines: u64, session_id: Option<&str>) {
        self.lines_seen += lines;
        if let Some(id) = session_id {
            self.session_id = Some(id.to_string());
        }
    }

    pub(crate) fn mark_closed(&mut self) {
        self.is_connected = false;
        self.is_closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_lifecycle() {
        let mut state = SessionState::connected();
        assert!(state.is_connected);
        assert!(!state.is_closed);

        state.record_lines(3, None);
        state.record_response(4, Some("abc"));
        assert_eq!(state.responses_completed, 1);
        assert_eq!(state.lines_seen, 7);
        assert_eq!(state.session_id.as_deref(), Some("abc"));

        state.record_lines(1, None);
        assert_eq!(state.session_id.as_deref(), Some("abc"));

        state.mark_closed();
        assert!(!state.is_connected);
        assert!(state.is_closed);
    }
}
