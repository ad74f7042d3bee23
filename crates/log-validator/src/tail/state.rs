//! State — tailer lifecycle phase, observable from outside the task.

use serde::Serialize;
use std::fmt;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TailState {
    NotStarted,
    Watching,
    /// Rotation, truncation or deletion detected; waiting to reopen.
    Reopening,
    /// Terminal.
    Stopped,
}

impl TailState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TailState::NotStarted => "not_started",
            TailState::Watching => "watching",
            TailState::Reopening => "reopening",
            TailState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for TailState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared between a handle and its task. Refuses to leave `Stopped`.
#[derive(Debug)]
pub(crate) struct StateCell {
    tx: watch::Sender<TailState>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(TailState::NotStarted);
        Self { tx }
    }

    /// Returns whether the state actually changed.
    pub(crate) fn set(&self, next: TailState) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == TailState::Stopped || *current == next {
                return false;
            }
            *current = next;
            true
        })
    }

    pub(crate) fn get(&self) -> TailState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<TailState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), TailState::NotStarted);
        assert!(cell.set(TailState::Watching));
        assert!(!cell.set(TailState::Watching));
        assert!(cell.set(TailState::Reopening));
        assert!(cell.set(TailState::Watching));
        assert!(cell.set(TailState::Stopped));
        assert_eq!(cell.get(), TailState::Stopped);
    }

    #[test]
    fn test_stopped_is_terminal() {
        let cell = StateCell::new();
        cell.set(TailState::Stopped);
        assert!(!cell.set(TailState::Watching));
        assert!(!cell.set(TailState::Reopening));
        assert_eq!(cell.get(), TailState::Stopped);
    }

    #[test]
    fn test_subscribers_see_changes() {
        let cell = StateCell::new();
        let rx = cell.subscribe();
        cell.set(TailState::Watching);
        assert_eq!(*rx.borrow(), TailState::Watching);
    }

    #[test]
    fn test_serialize_snake_case() {
        let json = serde_json::to_string(&TailState::NotStarted).unwrap();
        assert_eq!(json, "\"not_started\"");
    }
}
