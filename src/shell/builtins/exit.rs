use std::io::Write;

use crate::errors::Result;
use crate::shell::builtins::{self, BuiltinCommand};
use crate::shell::Shell;

pub struct Exit;

impl BuiltinCommand for Exit {
    const NAME: &'static str = builtins::EXIT_NAME;

    const HELP: &'static str = "\
exit: exit [n]
    Kill all background jobs, then exit the shell with a status of N. If N is
    omitted, the exit status is 0.";

    fn run(shell: &mut Shell, args: &[String], _stdout: &mut dyn Write) -> Result<()> {
        let status_code = args.get(0).map_or(0, |arg| {
            arg.parse::<i32>().unwrap_or_else(|_| {
                eprintln!("smallsh: exit: {}: numeric argument required", arg);
                2
            })
        });
        shell.exit(Some(status_code));
    }
}
