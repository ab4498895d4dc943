//! Spawns a child for every non built-in command.
//!
//! Launching is split into two explicit steps: fork duplicates the shell,
//! then the child alone applies its signal policy and redirections and
//! replaces its image with the target program.

use std::ffi::CString;
use std::io::{self, Write};
use std::process;

use failure::{Fail, ResultExt};
use log::{debug, warn};
use nix::{
    errno::Errno,
    sys::wait::{self, WaitPidFlag, WaitStatus},
    unistd::{self, ForkResult, Pid},
};

use crate::core::{
    command::Command,
    job::{Job, JobState},
};
use crate::errors::{Error, ErrorKind, Result};
use crate::shell::{redirect, signals, status::ShellStatus};

/// Exit status of a child that failed before or during exec.
pub const CHILD_FAILURE_EXIT_STATUS: i32 = 1;

/// What the shell is left with once a command has been launched.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Launch {
    /// The command ran in the foreground and has finished.
    Foreground(ShellStatus),
    /// The command runs in the background. The job has been probed once
    /// and may already be finished.
    Background(Job),
}

/// Runs `command` in a new process.
///
/// The command runs in the background only if it asked to and
/// `foreground_only` is off. Foreground commands are waited on before this
/// returns.
///
/// Failure to fork is returned as a fatal [`ErrorKind::Resource`]. Failures
/// inside the child (redirection, exec) never come back here; they surface as
/// the child's exit status.
pub fn launch(command: &Command, foreground_only: bool) -> Result<Launch> {
    let background = command.background_requested() && !foreground_only;
    if command.background_requested() && !background {
        debug!("foreground-only mode: running '{}' in the foreground", command.input());
    }

    // Anything still buffered would otherwise be written twice.
    io::stdout().flush().context(ErrorKind::Io)?;
    io::stderr().flush().context(ErrorKind::Io)?;

    match unsafe { unistd::fork() } {
        Ok(ForkResult::Parent { child }) => {
            debug!("spawned {} for '{}'", child, command.input());
            if background {
                Ok(Launch::Background(probe(child)))
            } else {
                wait_for_foreground(child).map(Launch::Foreground)
            }
        }
        Ok(ForkResult::Child) => exec_child(command, background),
        Err(e) => Err(e.context(ErrorKind::Resource).into()),
    }
}

/// Child side of [`launch`]. Never returns.
fn exec_child(command: &Command, background: bool) -> ! {
    let result = signals::apply_child_policy(background)
        .and_then(|()| redirect::configure(command.redirects(), background))
        .and_then(|()| exec(command));

    if let Err(e) = result {
        eprintln!("smallsh: {}", e);
    }
    process::exit(CHILD_FAILURE_EXIT_STATUS);
}

/// Replaces the current process image. Only returns on failure.
fn exec(command: &Command) -> Result<()> {
    let launch_error = || ErrorKind::Launch(command.program().to_string());
    let argv = command
        .argv()
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|_| launch_error())?;

    match unistd::execvp(&argv[0], &argv) {
        Ok(never) => match never {},
        Err(e) => Err(Error::from(e.context(launch_error()))),
    }
}

/// Waits for the foreground child with the toggle signal blocked, so a
/// toggle arriving mid-wait is applied afterwards instead of being lost.
fn wait_for_foreground(child: Pid) -> Result<ShellStatus> {
    let block = signals::ToggleBlock::acquire()?;
    let status = wait_for_exit(child);
    block.release()?;
    status
}

fn wait_for_exit(child: Pid) -> Result<ShellStatus> {
    loop {
        match wait::waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                debug!("{} exited with {}", child, code);
                return Ok(ShellStatus::Exited(code));
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                debug!("{} terminated by signal {:?}", child, signal);
                return Ok(ShellStatus::Signaled(signal));
            }
            Ok(status) => debug!("ignoring {:?} while waiting for {}", status, child),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.context(ErrorKind::Nix).into()),
        }
    }
}

/// Non-blocking status check right after a background launch. The job is
/// tracked whatever the answer, so a child that already exited is still
/// reported on the next cycle.
fn probe(child: Pid) -> Job {
    let state = match wait::waitpid(child, Some(WaitPidFlag::WNOHANG)) {
        Ok(status) => JobState::from_wait_status(&status),
        Err(e) => {
            warn!("unable to probe background job {}: {}", child, e);
            JobState::Running
        }
    };
    Job::with_state(child, state)
}
