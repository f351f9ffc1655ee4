//! Background process supervisor.
//!
//! Runs OS commands detached from the interactive terminal, tracks their
//! lifecycle and captures their output for later retrieval over the
//! control plane.

mod handle;
mod supervisor;

use std::time::Instant;

use thiserror::Error;

pub use supervisor::BackgroundSupervisor;

/// Lifecycle state of one background process.
///
/// `Running` is the only non-terminal state; a process transitions out of
/// it exactly once and never back in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    /// Process exited on its own; any exit code counts as completed.
    Completed { exit_code: Option<i32> },
    /// Process was terminated via `kill`.
    Killed,
    /// The wait or termination itself failed.
    Failed { reason: String },
}

impl ProcessState {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !matches!(self, ProcessState::Running)
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ProcessState::Running => "running",
            ProcessState::Completed { .. } => "completed",
            ProcessState::Killed => "killed",
            ProcessState::Failed { .. } => "failed",
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessState::Completed { exit_code } => *exit_code,
            _ => None,
        }
    }

    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ProcessState::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Point-in-time snapshot of a tracked process.
#[derive(Debug, Clone)]
pub struct ProcessSummary {
    pub id: u64,
    pub command: String,
    pub state: ProcessState,
    pub started_at: Instant,
    pub ended_at: Option<Instant>,
}

impl ProcessSummary {
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        self.ended_at
            .map(|end| end.duration_since(self.started_at).as_millis() as u64)
    }
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("process {0} not found")]
    NotFound(u64),

    #[error("empty command")]
    EmptyCommand,

    #[error("maximum running background processes ({0}) reached")]
    LimitReached(usize),

    #[error("failed to spawn process: {0}")]
    Spawn(String),

    #[error("failed to kill process {id}: {reason}")]
    Kill { id: u64, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_predicates() {
        assert!(!ProcessState::Running.is_finished());
        assert!(ProcessState::Completed { exit_code: Some(0) }.is_finished());
        assert!(ProcessState::Killed.is_finished());
        assert!(ProcessState::Failed {
            reason: "wait failed".into()
        }
        .is_finished());
    }

    #[test]
    fn state_labels_and_accessors() {
        assert_eq!(ProcessState::Running.label(), "running");
        assert_eq!(
            ProcessState::Completed { exit_code: Some(2) }.exit_code(),
            Some(2)
        );
        assert_eq!(ProcessState::Killed.exit_code(), None);
        let failed = ProcessState::Failed {
            reason: "boom".into(),
        };
        assert_eq!(failed.label(), "failed");
        assert_eq!(failed.failure_reason(), Some("boom"));
    }
}
