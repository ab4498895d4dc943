use std::fmt;

use nix::{
    sys::{signal::Signal, wait::WaitStatus},
    unistd::Pid,
};

/// Lifecycle of a background job.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JobState {
    Running,
    ExitedNormally(i32),
    Terminated(Signal),
}

impl JobState {
    /// Maps a wait status onto a job state. Statuses that do not end the
    /// process (stopped, continued, still alive) map to `Running`.
    pub fn from_wait_status(status: &WaitStatus) -> Self {
        match *status {
            WaitStatus::Exited(_, code) => JobState::ExitedNormally(code),
            WaitStatus::Signaled(_, signal, _) => JobState::Terminated(signal),
            _ => JobState::Running,
        }
    }

    pub fn is_running(self) -> bool {
        self == JobState::Running
    }
}

impl Default for JobState {
    fn default() -> Self {
        JobState::Running
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Job {
    pid: Pid,
    state: JobState,
}

impl Job {
    pub fn new(pid: Pid) -> Self {
        Self::with_state(pid, JobState::Running)
    }

    pub fn with_state(pid: Pid, state: JobState) -> Self {
        Self { pid, state }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn set_state(self, state: JobState) -> Self {
        Self { state, ..self }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// The completion record of a finished job; `None` while it is running.
    pub fn result(&self) -> Option<JobResult> {
        match self.state {
            JobState::Running => None,
            JobState::ExitedNormally(code) => Some(JobResult::ExitedNormally {
                pid: self.pid,
                code,
            }),
            JobState::Terminated(signal) => Some(JobResult::Terminated {
                pid: self.pid,
                signal,
            }),
        }
    }
}

/// How a reaped background job finished.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JobResult {
    ExitedNormally { pid: Pid, code: i32 },
    Terminated { pid: Pid, signal: Signal },
}

impl JobResult {
    pub fn pid(&self) -> Pid {
        match *self {
            JobResult::ExitedNormally { pid, .. } | JobResult::Terminated { pid, .. } => pid,
        }
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            JobResult::ExitedNormally { pid, code } => {
                write!(f, "background pid {} is done: exit value: {}", pid, code)
            }
            JobResult::Terminated { pid, signal } => write!(
                f,
                "background pid {} is done: terminated by signal: {}",
                pid, signal as i32
            ),
        }
    }
}
