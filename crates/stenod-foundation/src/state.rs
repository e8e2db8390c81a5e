use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;

use crate::error::AppError;

/// Daemon lifecycle. `Reconnecting` means the protocol client lost the
/// machine mid-session and is reopening the realtime file; translation
/// keeps draining whatever chords are already queued while it does.
#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Initializing,
    Running,
    Reconnecting { attempt: u32, reason: String },
    Stopping,
    Stopped,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppState::Initializing => f.write_str("initializing"),
            AppState::Running => f.write_str("running"),
            AppState::Reconnecting { attempt, reason } => {
                write!(f, "reconnecting (attempt {attempt}): {reason}")
            }
            AppState::Stopping => f.write_str("stopping"),
            AppState::Stopped => f.write_str("stopped"),
        }
    }
}

/// Tracks the daemon lifecycle and broadcasts transitions to observers.
pub struct StateManager {
    state: Arc<RwLock<AppState>>,
    state_tx: Sender<AppState>,
    state_rx: Receiver<AppState>,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    pub fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(RwLock::new(AppState::Initializing)),
            state_tx,
            state_rx,
        }
    }

    /// Apply a lifecycle transition. Reconnection may repeat (the retry
    /// attempt escalates) and may resolve either back to running or into
    /// shutdown; everything else moves strictly forward.
    pub fn transition(&self, new_state: AppState) -> Result<(), AppError> {
        let mut current = self.state.write();

        let valid = matches!(
            (&*current, &new_state),
            (AppState::Initializing, AppState::Running)
                | (AppState::Running, AppState::Reconnecting { .. })
                | (AppState::Reconnecting { .. }, AppState::Reconnecting { .. })
                | (AppState::Reconnecting { .. }, AppState::Running)
                | (AppState::Running, AppState::Stopping)
                | (AppState::Reconnecting { .. }, AppState::Stopping)
                | (AppState::Stopping, AppState::Stopped)
        );

        if !valid {
            return Err(AppError::Fatal(format!(
                "invalid state transition: {current} -> {new_state}"
            )));
        }

        tracing::info!(from = %current, to = %new_state, "daemon state");
        *current = new_state.clone();
        let _ = self.state_tx.send(new_state);
        Ok(())
    }

    pub fn current(&self) -> AppState {
        self.state.read().clone()
    }

    pub fn subscribe(&self) -> Receiver<AppState> {
        self.state_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconnecting(attempt: u32) -> AppState {
        AppState::Reconnecting {
            attempt,
            reason: "realtime read timed out".into(),
        }
    }

    #[test]
    fn clean_lifecycle() {
        let mgr = StateManager::new();
        assert_eq!(mgr.current(), AppState::Initializing);
        mgr.transition(AppState::Running).unwrap();
        mgr.transition(AppState::Stopping).unwrap();
        mgr.transition(AppState::Stopped).unwrap();
    }

    #[test]
    fn reconnect_escalates_then_resolves() {
        let mgr = StateManager::new();
        mgr.transition(AppState::Running).unwrap();
        mgr.transition(reconnecting(1)).unwrap();
        mgr.transition(reconnecting(2)).unwrap();
        mgr.transition(AppState::Running).unwrap();
    }

    #[test]
    fn shutdown_is_reachable_while_reconnecting() {
        let mgr = StateManager::new();
        mgr.transition(AppState::Running).unwrap();
        mgr.transition(reconnecting(1)).unwrap();
        mgr.transition(AppState::Stopping).unwrap();
        mgr.transition(AppState::Stopped).unwrap();
    }

    #[test]
    fn invalid_transitions_rejected() {
        let mgr = StateManager::new();
        assert!(mgr.transition(AppState::Stopped).is_err());
        assert!(mgr.transition(reconnecting(1)).is_err());
        assert_eq!(mgr.current(), AppState::Initializing);
    }

    #[test]
    fn subscribers_see_transitions() {
        let mgr = StateManager::new();
        let rx = mgr.subscribe();
        mgr.transition(AppState::Running).unwrap();
        mgr.transition(reconnecting(1)).unwrap();
        assert_eq!(rx.recv().unwrap(), AppState::Running);
        assert_eq!(rx.recv().unwrap(), reconnecting(1));
    }
}
