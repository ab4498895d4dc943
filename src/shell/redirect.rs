//! Rebinding of a child's standard input and output.
//!
//! Scanning happens in the shell when a command is built; the descriptors
//! themselves are only ever rebound inside the spawned child, between fork
//! and exec.

use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use failure::ResultExt;
use nix::{
    fcntl::{self, OFlag},
    libc,
    sys::stat::Mode,
    unistd,
};

use crate::errors::{Error, ErrorKind, Result};

pub const INPUT_MARKER: &str = "<";
pub const OUTPUT_MARKER: &str = ">";
const NULL_DEVICE: &str = "/dev/null";

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RedirectInstruction {
    Output,
    Input,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Redirect {
    pub instruction: RedirectInstruction,
    pub filename: PathBuf,
}

impl Redirect {
    pub fn output<P: Into<PathBuf>>(filename: P) -> Self {
        Self {
            instruction: RedirectInstruction::Output,
            filename: filename.into(),
        }
    }

    pub fn input<P: Into<PathBuf>>(filename: P) -> Self {
        Self {
            instruction: RedirectInstruction::Input,
            filename: filename.into(),
        }
    }
}

/// Splits redirections out of `tokens`, left to right.
///
/// A marker must be immediately followed by a filename token; both tokens
/// are removed. Returns the remaining argument vector and the redirections in
/// the order they appeared.
pub fn scan(tokens: Vec<String>) -> Result<(Vec<String>, Vec<Redirect>)> {
    let mut argv = Vec::with_capacity(tokens.len());
    let mut redirects = Vec::new();
    let mut tokens = tokens.into_iter();
    while let Some(token) = tokens.next() {
        let instruction = match token.as_str() {
            OUTPUT_MARKER => RedirectInstruction::Output,
            INPUT_MARKER => RedirectInstruction::Input,
            _ => {
                argv.push(token);
                continue;
            }
        };

        let filename = tokens.next().ok_or_else(|| Error::syntax(&token))?;
        redirects.push(Redirect {
            instruction,
            filename: PathBuf::from(filename),
        });
    }

    Ok((argv, redirects))
}

/// Rebinds standard input and output of the current process.
///
/// Background jobs first get the null device on both descriptors so they
/// never read from or write to the terminal. Explicit redirections are
/// applied afterwards and overwrite that binding: outputs first, then inputs.
///
/// Must only be called in a spawned child.
pub fn configure(redirects: &[Redirect], background: bool) -> Result<()> {
    if background {
        let null_device = Path::new(NULL_DEVICE);
        rebind(null_device, RedirectInstruction::Input)?;
        rebind(null_device, RedirectInstruction::Output)?;
    }

    for instruction in &[RedirectInstruction::Output, RedirectInstruction::Input] {
        for redirect in redirects.iter().filter(|r| r.instruction == *instruction) {
            rebind(&redirect.filename, redirect.instruction)?;
        }
    }

    Ok(())
}

fn rebind(path: &Path, instruction: RedirectInstruction) -> Result<()> {
    let (flags, target) = open_mode(instruction);
    let fd = fcntl::open(path, flags, Mode::from_bits_truncate(0o644))
        .with_context(|_| ErrorKind::Redirection(path.display().to_string()))?;
    if fd != target {
        unistd::dup2(fd, target).context(ErrorKind::Nix)?;
        unistd::close(fd).context(ErrorKind::Nix)?;
    }
    Ok(())
}

fn open_mode(instruction: RedirectInstruction) -> (OFlag, RawFd) {
    match instruction {
        RedirectInstruction::Output => (
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            libc::STDOUT_FILENO,
        ),
        RedirectInstruction::Input => (OFlag::O_RDONLY, libc::STDIN_FILENO),
    }
}
