use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Stopped,
    Running,
    Stopping,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Stopped => "stopped",
            RunStatus::Running => "running",
            RunStatus::Stopping => "stopping",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const STATE_STOPPED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPING: u8 = 2;

fn encode(status: RunStatus) -> u8 {
    match status {
        RunStatus::Stopped => STATE_STOPPED,
        RunStatus::Running => STATE_RUNNING,
        RunStatus::Stopping => STATE_STOPPING,
    }
}

fn decode(state: u8) -> RunStatus {
    match state {
        STATE_RUNNING => RunStatus::Running,
        STATE_STOPPING => RunStatus::Stopping,
        _ => RunStatus::Stopped,
    }
}

/// Shared tri-state run flag.
///
/// Cloning shares the same underlying state: the loop and every observer
/// handle see the same status. Transitions requested from outside the loop
/// go through compare-and-swap so a stale request can never resurrect a
/// stopped loop.
#[derive(Debug, Clone, Default)]
pub struct StatusFlag {
    state: Arc<AtomicU8>,
}

impl StatusFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> RunStatus {
        decode(self.state.load(Ordering::SeqCst))
    }

    /// `stopped -> running`. Returns false (and changes nothing) otherwise.
    pub fn try_start(&self) -> bool {
        self.transition(RunStatus::Stopped, RunStatus::Running)
    }

    /// `running -> stopping`. Returns false (and changes nothing) otherwise.
    pub fn request_stop(&self) -> bool {
        self.transition(RunStatus::Running, RunStatus::Stopping)
    }

    pub(crate) fn set(&self, status: RunStatus) {
        self.state.store(encode(status), Ordering::SeqCst);
    }

    fn transition(&self, from: RunStatus, to: RunStatus) -> bool {
        self.state
            .compare_exchange(encode(from), encode(to), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
