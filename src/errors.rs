//! Error module. See the [failure](https://crates.io/crates/failure) crate for details.

use std::fmt;
use std::result;

use failure::{Backtrace, Context, Fail};

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    ctx: Context<ErrorKind>,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.ctx.get_context()
    }

    /// Returns `true` if the shell itself cannot continue after this error.
    ///
    /// Errors raised inside a spawned child never reach the shell; the shell
    /// only observes the child's exit status.
    pub fn is_fatal(&self) -> bool {
        match *self.kind() {
            ErrorKind::Resource | ErrorKind::SignalMask => true,
            _ => false,
        }
    }

    pub(crate) fn syntax<T: AsRef<str>>(line: T) -> Error {
        Error::from(ErrorKind::Syntax(line.as_ref().to_string()))
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.ctx.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.ctx.backtrace()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ctx.cause() {
            Some(cause) => write!(f, "{}: {}", self.ctx, cause),
            None => fmt::Display::fmt(&self.ctx, f),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Duplicating the shell into a new process failed.
    Resource,
    /// The target program could not replace the child's image.
    Launch(String),
    /// A redirection target could not be opened.
    Redirection(String),
    /// Blocking or unblocking the mode-toggle signal failed.
    SignalMask,
    /// `cd` could not change into the requested directory.
    Directory(String),
    Syntax(String),
    LineTooLong(usize),
    TooManyArguments(usize),
    Io,
    Nix,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ErrorKind::Resource => write!(f, "unable to create child process"),
            ErrorKind::Launch(ref program) => write!(f, "{}: cannot execute", program),
            ErrorKind::Redirection(ref path) => write!(f, "{}: cannot open", path),
            ErrorKind::SignalMask => write!(f, "unable to change the signal mask"),
            ErrorKind::Directory(ref dir) => write!(f, "cd: {}", dir),
            ErrorKind::Syntax(ref line) => write!(f, "syntax error near: {}", line),
            ErrorKind::LineTooLong(max) => {
                write!(f, "command line exceeds {} characters", max)
            }
            ErrorKind::TooManyArguments(max) => {
                write!(f, "command line exceeds {} arguments", max)
            }
            ErrorKind::Io => write!(f, "I/O error occurred"),
            ErrorKind::Nix => write!(f, "Nix error occurred"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::from(Context::new(kind))
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(ctx: Context<ErrorKind>) -> Error {
        Error { ctx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use failure::ResultExt;
    use nix::errno::Errno;

    #[test]
    fn test_only_shell_level_failures_are_fatal() {
        assert!(Error::from(ErrorKind::Resource).is_fatal());
        assert!(Error::from(ErrorKind::SignalMask).is_fatal());
        assert!(!Error::from(ErrorKind::Launch("badcmd".to_string())).is_fatal());
        assert!(!Error::from(ErrorKind::Directory("nowhere".to_string())).is_fatal());
        assert!(!Error::syntax(">").is_fatal());
    }

    #[test]
    fn test_display_includes_cause() {
        let result: result::Result<(), Errno> = Err(Errno::ENOENT);
        let error: Error = result
            .context(ErrorKind::Redirection("missing.txt".to_string()))
            .unwrap_err()
            .into();
        let message = format!("{}", error);
        assert!(message.starts_with("missing.txt: cannot open: "));
        assert!(message.contains("No such file or directory"));
    }

    #[test]
    fn test_display_without_cause() {
        let error = Error::from(ErrorKind::LineTooLong(2048));
        assert_eq!(format!("{}", error), "command line exceeds 2048 characters");
    }
}
