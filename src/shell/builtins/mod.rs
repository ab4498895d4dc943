//! smallsh builtins
//!
//! Built-ins run inside the shell process. They ignore the background marker
//! and any redirections on their line, and never change the shell status.

use std::io::Write;

use crate::errors::Result;
use crate::shell::Shell;

use self::cd::Cd;
use self::exit::Exit;
use self::status::Status;

mod cd;
mod exit;
mod status;

const CD_NAME: &str = "cd";
const EXIT_NAME: &str = "exit";
const STATUS_NAME: &str = "status";

/// Represents a smallsh builtin command such as cd or status.
pub trait BuiltinCommand {
    /// The NAME of the command.
    const NAME: &'static str;
    /// The help string to display to the user.
    const HELP: &'static str;
    /// The usage string to display to the user.
    fn usage() -> &'static str {
        Self::HELP.lines().next().unwrap_or(Self::NAME)
    }
    /// Runs the command with the given arguments in the `shell` environment.
    fn run(shell: &mut Shell, args: &[String], stdout: &mut dyn Write) -> Result<()>;
}

pub fn is_builtin<T: AsRef<str>>(program: T) -> bool {
    [CD_NAME, EXIT_NAME, STATUS_NAME].contains(&program.as_ref())
}

/// precondition: command is a builtin.
pub fn run<S: AsRef<str>>(
    shell: &mut Shell,
    program: S,
    args: &[String],
    stdout: &mut dyn Write,
) -> Result<()> {
    debug_assert!(is_builtin(&program));

    match program.as_ref() {
        CD_NAME => Cd::run(shell, args, stdout),
        EXIT_NAME => Exit::run(shell, args, stdout),
        STATUS_NAME => Status::run(shell, args, stdout),
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_builtin() {
        assert!(is_builtin("cd"));
        assert!(is_builtin("exit"));
        assert!(is_builtin("status"));
        assert!(!is_builtin("ls"));
        assert!(!is_builtin("jobs"));
    }

    #[test]
    fn test_usage_is_first_help_line() {
        assert_eq!(Cd::usage(), "cd: cd [dir]");
        assert_eq!(Exit::usage(), "exit: exit [n]");
        assert_eq!(Status::usage(), "status: status");
    }
}
