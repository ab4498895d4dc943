use std::env;
use std::io::Write;
use std::path::PathBuf;

use failure::ResultExt;
use log::debug;

use crate::errors::{ErrorKind, Result};
use crate::shell::builtins::{self, BuiltinCommand};
use crate::shell::Shell;

pub struct Cd;

impl BuiltinCommand for Cd {
    const NAME: &'static str = builtins::CD_NAME;

    const HELP: &'static str = "\
cd: cd [dir]
    Change the current directory to DIR. The default DIR is the value of the
    HOME environment variable.";

    fn run(_shell: &mut Shell, args: &[String], _stdout: &mut dyn Write) -> Result<()> {
        let dir = match args.get(0) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .ok_or_else(|| ErrorKind::Directory(String::from("HOME not set")))?,
        };

        debug!("changing directory to {}", dir.display());
        env::set_current_dir(&dir)
            .with_context(|_| ErrorKind::Directory(dir.display().to_string()))?;
        Ok(())
    }
}
