use std::io::Write;

use crate::errors::Result;
use crate::shell::builtins::{self, BuiltinCommand};
use crate::shell::Shell;

pub struct Status;

impl BuiltinCommand for Status {
    const NAME: &'static str = builtins::STATUS_NAME;

    const HELP: &'static str = "\
status: status
    Print the exit value or terminating signal of the last foreground
    command. Before any foreground command has run, prints exit value 0.";

    fn run(shell: &mut Shell, _args: &[String], stdout: &mut dyn Write) -> Result<()> {
        shell.last_status().report(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ShellConfig;

    fn status(shell: &mut Shell) -> String {
        let mut stdout = Vec::new();
        Status::run(shell, &[], &mut stdout).unwrap();
        String::from_utf8(stdout).unwrap()
    }

    #[test]
    fn test_status_reports_last_foreground_command() {
        let mut shell = Shell::new(ShellConfig::noninteractive()).unwrap();
        assert_eq!(status(&mut shell), "exit value 0\n");

        shell.execute_command_string("false").unwrap();
        assert_eq!(status(&mut shell), "exit value 1\n");

        shell.execute_command_string("sh -c true &").unwrap();
        assert_eq!(status(&mut shell), "exit value 1\n");
        shell.kill_background_jobs();
    }
}
