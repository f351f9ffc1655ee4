use std::collections::BTreeMap;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use super::handle::{KillOutcome, ProcessEntry};
use super::{ProcessState, ProcessSummary, SupervisorError};
use crate::config::BackgroundConfig;

/// Owns the set of background processes and the rules for starting,
/// killing and reaping them.
///
/// Ids increase monotonically and are never reused; iteration order of the
/// underlying map is therefore creation order.
pub struct BackgroundSupervisor {
    processes: RwLock<BTreeMap<u64, Arc<ProcessEntry>>>,
    next_id: AtomicU64,
    shell: String,
    max_running: usize,
    max_output_lines: usize,
}

impl BackgroundSupervisor {
    #[must_use]
    pub fn new(config: &BackgroundConfig) -> Self {
        #[cfg(windows)]
        let shell = "cmd".to_string();
        #[cfg(not(windows))]
        let shell = "sh".to_string();
        Self {
            processes: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            shell,
            max_running: config.max_running,
            max_output_lines: config.max_output_lines,
        }
    }

    /// Use a specific shell binary instead of the platform default.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Spawn `command` through the platform shell and register it.
    ///
    /// Returns as soon as the OS process is launched; output capture and
    /// exit detection run on their own threads.
    pub fn start(&self, command: &str) -> Result<u64, SupervisorError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(SupervisorError::EmptyCommand);
        }

        // The cap check and the insert share the write lock, so two
        // concurrent starts cannot both pass at max_running - 1.
        let mut processes = match self.processes.write() {
            Ok(processes) => processes,
            Err(poisoned) => poisoned.into_inner(),
        };
        let running = processes.values().filter(|e| e.is_running()).count();
        if running >= self.max_running {
            return Err(SupervisorError::LimitReached(self.max_running));
        }

        #[cfg(windows)]
        let shell_arg = "/C";
        #[cfg(not(windows))]
        let shell_arg = "-c";

        let mut child = Command::new(&self.shell)
            .arg(shell_arg)
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SupervisorError::Spawn(e.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let entry = ProcessEntry::new(id, command.to_string(), child);

        let max_lines = self.max_output_lines;
        if let Some(stdout) = stdout {
            let reader_entry = entry.clone();
            spawn_worker(format!("bg-out-{id}"), move || {
                ProcessEntry::drain_stream(&reader_entry, stdout, max_lines);
            });
        }
        if let Some(stderr) = stderr {
            let reader_entry = entry.clone();
            spawn_worker(format!("bg-err-{id}"), move || {
                ProcessEntry::drain_stream(&reader_entry, stderr, max_lines);
            });
        }
        let watch_entry = entry.clone();
        spawn_worker(format!("bg-watch-{id}"), move || {
            ProcessEntry::watch_exit(&watch_entry);
        });

        processes.insert(id, entry);
        debug!(id, command, "background process started");
        Ok(id)
    }

    /// Snapshot of one process. Side-effect-free: exit detection belongs to
    /// the watcher, never to a status call.
    pub fn status(&self, id: u64) -> Result<ProcessSummary, SupervisorError> {
        self.entry(id).map(|entry| entry.summary())
    }

    /// Copy of the captured output lines at call time.
    pub fn output(&self, id: u64) -> Result<Vec<String>, SupervisorError> {
        self.entry(id).map(|entry| entry.output_snapshot())
    }

    /// Request termination. Killing an already-finished process is a
    /// successful no-op.
    pub fn kill(&self, id: u64) -> Result<(), SupervisorError> {
        let entry = self.entry(id)?;
        match entry.kill() {
            KillOutcome::Killed | KillOutcome::AlreadyFinished => Ok(()),
            KillOutcome::Error(reason) => Err(SupervisorError::Kill { id, reason }),
        }
    }

    /// All registered processes in creation order.
    #[must_use]
    pub fn list(&self) -> Vec<ProcessSummary> {
        match self.processes.read() {
            Ok(processes) => processes.values().map(|e| e.summary()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Remove every entry in a terminal state; running entries survive.
    /// Returns the number removed.
    pub fn clear_finished(&self) -> usize {
        let Ok(mut processes) = self.processes.write() else {
            return 0;
        };
        let before = processes.len();
        processes.retain(|_, entry| !entry.is_finished());
        let cleared = before - processes.len();
        if cleared > 0 {
            debug!(cleared, "cleared finished background processes");
        }
        cleared
    }

    #[must_use]
    pub fn running_count(&self) -> usize {
        match self.processes.read() {
            Ok(processes) => processes.values().filter(|e| e.is_running()).count(),
            Err(_) => 0,
        }
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        match self.processes.read() {
            Ok(processes) => processes
                .values()
                .filter(|e| matches!(e.summary().state, ProcessState::Failed { .. }))
                .count(),
            Err(_) => 0,
        }
    }

    fn entry(&self, id: u64) -> Result<Arc<ProcessEntry>, SupervisorError> {
        self.processes
            .read()
            .ok()
            .and_then(|processes| processes.get(&id).cloned())
            .ok_or(SupervisorError::NotFound(id))
    }
}

fn spawn_worker(name: String, f: impl FnOnce() + Send + 'static) {
    if let Err(e) = std::thread::Builder::new().name(name.clone()).spawn(f) {
        warn!("failed to spawn {name} thread: {e}");
    }
}
