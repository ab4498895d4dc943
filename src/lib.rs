//! smallsh - Small Shell
//!
//! Runs built-in commands in-process and everything else in a child process,
//! either waited on in the foreground or tracked as a background job.

#![warn(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    unused_import_braces
)]

/// Logs the error of a `Result` without propagating it.
macro_rules! log_if_err {
    ($result:expr, $($arg:tt)+) => {
        if let Err(ref e) = $result {
            ::log::error!("{}: {}", format_args!($($arg)+), e);
        }
    };
}

pub mod core;
pub mod errors;
pub mod shell;

pub use crate::core::{command::Command, job::JobResult};
pub use crate::shell::{status::ShellStatus, Shell, ShellConfig};
