use std::io::{BufRead, BufReader, Read};
use std::process::Child;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{ProcessState, ProcessSummary};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One tracked background process.
///
/// The registry entry is the only owner of the OS child handle. The exit
/// watcher and `kill` both funnel through [`ProcessEntry::transition`]
/// under the inner lock, so exactly one of them wins and the state never
/// leaves a terminal value.
pub(crate) struct ProcessEntry {
    pub(crate) id: u64,
    pub(crate) command: String,
    pub(crate) started_at: Instant,
    inner: Mutex<EntryInner>,
}

struct EntryInner {
    state: ProcessState,
    /// Present until the watcher reaps the child.
    child: Option<Child>,
    output: Vec<String>,
    /// Lines discarded once the capture cap was hit.
    dropped_lines: u64,
    ended_at: Option<Instant>,
}

pub(crate) enum KillOutcome {
    /// Termination was requested and the state moved to `Killed`.
    Killed,
    /// The process had already reached a terminal state; nothing to do.
    AlreadyFinished,
    /// The OS refused the termination request.
    Error(String),
}

impl ProcessEntry {
    pub(crate) fn new(id: u64, command: String, child: Child) -> Arc<Self> {
        Arc::new(Self {
            id,
            command,
            started_at: Instant::now(),
            inner: Mutex::new(EntryInner {
                state: ProcessState::Running,
                child: Some(child),
                output: Vec::new(),
                dropped_lines: 0,
                ended_at: None,
            }),
        })
    }

    pub(crate) fn summary(&self) -> ProcessSummary {
        let (state, ended_at) = match self.inner.lock() {
            Ok(inner) => (inner.state.clone(), inner.ended_at),
            Err(poisoned) => {
                let inner = poisoned.into_inner();
                (inner.state.clone(), inner.ended_at)
            }
        };
        ProcessSummary {
            id: self.id,
            command: self.command.clone(),
            state,
            started_at: self.started_at,
            ended_at,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.state == ProcessState::Running)
            .unwrap_or(false)
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.state.is_finished())
            .unwrap_or(false)
    }

    /// Copy of the captured output at call time. Appends racing with this
    /// call land after the snapshot, never inside it.
    pub(crate) fn output_snapshot(&self) -> Vec<String> {
        match self.inner.lock() {
            Ok(inner) => inner.output.clone(),
            Err(poisoned) => poisoned.into_inner().output.clone(),
        }
    }

    fn append_line(&self, line: String, max_lines: usize) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.output.len() < max_lines {
                inner.output.push(line);
            } else {
                inner.dropped_lines += 1;
            }
        }
    }

    /// The single authoritative state change. Returns false if the entry
    /// was already terminal, in which case nothing is modified.
    fn transition(inner: &mut EntryInner, next: ProcessState) -> bool {
        if inner.state != ProcessState::Running {
            return false;
        }
        inner.state = next;
        inner.ended_at = Some(Instant::now());
        true
    }

    /// Request termination. First kill wins; later calls (and calls after
    /// natural exit) see `AlreadyFinished`.
    pub(crate) fn kill(&self) -> KillOutcome {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.state != ProcessState::Running {
            return KillOutcome::AlreadyFinished;
        }

        let Some(child) = inner.child.as_mut() else {
            // Running implies the child has not been reaped yet; treat a
            // missing handle as a lost process rather than leaving the
            // entry Running forever.
            let reason = "process handle missing".to_string();
            Self::transition(&mut inner, ProcessState::Failed {
                reason: reason.clone(),
            });
            return KillOutcome::Error(reason);
        };

        match child.kill() {
            Ok(()) => {
                Self::transition(&mut inner, ProcessState::Killed);
                debug!(id = self.id, "background process killed");
                KillOutcome::Killed
            }
            Err(e) => {
                let reason = format!("kill failed: {e}");
                Self::transition(&mut inner, ProcessState::Failed {
                    reason: reason.clone(),
                });
                warn!(id = self.id, "failed to kill background process: {e}");
                KillOutcome::Error(reason)
            }
        }
    }

    /// Drain one of the child's output pipes line by line. Lines beyond the
    /// cap are counted but discarded, so the child never blocks on a full
    /// pipe. A line that is not valid UTF-8 is skipped and draining
    /// continues; only a real stream error stops the loop.
    pub(crate) fn drain_stream<R: Read>(entry: &Arc<ProcessEntry>, stream: R, max_lines: usize) {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            match line {
                Ok(line) => entry.append_line(line, max_lines),
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    debug!(id = entry.id, "skipping undecodable output line: {e}");
                }
                Err(e) => {
                    debug!(id = entry.id, "output stream closed: {e}");
                    break;
                }
            }
        }
    }

    /// Watch for process exit and record the terminal state. Polls
    /// `try_wait` so the inner lock is never held across a blocking wait;
    /// this is also what reaps the child after a kill.
    pub(crate) fn watch_exit(entry: &Arc<ProcessEntry>) {
        loop {
            let done = {
                let mut inner = match entry.inner.lock() {
                    Ok(inner) => inner,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let Some(child) = inner.child.as_mut() else {
                    break;
                };
                match child.try_wait() {
                    Ok(Some(status)) => {
                        let exit_code = status.code();
                        inner.child = None;
                        if Self::transition(&mut inner, ProcessState::Completed { exit_code }) {
                            debug!(
                                id = entry.id,
                                exit_code = ?exit_code,
                                "background process completed"
                            );
                        }
                        // A killed process is reaped here too; its state
                        // stays Killed.
                        true
                    }
                    Ok(None) => false,
                    Err(e) => {
                        inner.child = None;
                        Self::transition(&mut inner, ProcessState::Failed {
                            reason: format!("wait failed: {e}"),
                        });
                        warn!(id = entry.id, "failed to wait for background process: {e}");
                        true
                    }
                }
            };
            if done {
                break;
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        }
    }
}
