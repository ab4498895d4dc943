use std::fmt;
use std::io::Write;

use failure::ResultExt;
use nix::sys::signal::Signal;

use crate::errors::{ErrorKind, Result};

/// Outcome of the most recent foreground command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShellStatus {
    Exited(i32),
    Signaled(Signal),
}

impl ShellStatus {
    /// Writes the status line printed by the `status` built-in.
    pub fn report(&self, stdout: &mut dyn Write) -> Result<()> {
        writeln!(stdout, "{}", self).context(ErrorKind::Io)?;
        Ok(())
    }

    /// Exit code equivalent, following the `128 + signal` convention for
    /// signaled processes.
    pub fn code(&self) -> i32 {
        match *self {
            ShellStatus::Exited(code) => code,
            ShellStatus::Signaled(signal) => 128 + signal as i32,
        }
    }

    pub fn success(&self) -> bool {
        *self == ShellStatus::Exited(0)
    }
}

impl Default for ShellStatus {
    fn default() -> Self {
        ShellStatus::Exited(0)
    }
}

impl fmt::Display for ShellStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ShellStatus::Exited(code) => write!(f, "exit value {}", code),
            ShellStatus::Signaled(signal) => write!(f, "terminated by signal {}", signal as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_success() {
        assert_eq!(ShellStatus::default(), ShellStatus::Exited(0));
        assert!(ShellStatus::default().success());
    }

    #[test]
    fn test_report() {
        let mut stdout = Vec::new();
        ShellStatus::Exited(1).report(&mut stdout).unwrap();
        ShellStatus::Signaled(Signal::SIGINT).report(&mut stdout).unwrap();
        assert_eq!(
            String::from_utf8(stdout).unwrap(),
            "exit value 1\nterminated by signal 2\n"
        );
    }

    #[test]
    fn test_code() {
        assert_eq!(ShellStatus::Exited(3).code(), 3);
        assert_eq!(ShellStatus::Signaled(Signal::SIGKILL).code(), 137);
        assert!(!ShellStatus::Signaled(Signal::SIGKILL).success());
    }
}
