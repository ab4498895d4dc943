//! smallsh - Shell Module
//!
//! The Shell owns all process-wide state: the background job table, the
//! status of the last foreground command and the configuration. It routes
//! each input line to a built-in or to the process launcher.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process;

use failure::ResultExt;
use log::{debug, error, info};
use nix::unistd::Pid;

use crate::core::{command::Command, job::JobResult};
use crate::errors::{Error, ErrorKind, Result};

use self::job_control::JobManager;
use self::launcher::Launch;
use self::status::ShellStatus;

pub mod builtins;
pub mod job_control;
pub mod launcher;
pub mod redirect;
pub mod signals;
pub mod status;

const MAX_LINE_LENGTH: usize = 2048;
const MAX_ARGUMENTS: usize = 512;
const PROMPT: &str = ":";

/// Bsh-style policy object controlling how the Shell reads and reports.
#[derive(Debug, Copy, Clone)]
pub struct ShellConfig {
    /// Determines if the prompt is displayed before each line is read.
    pub(crate) display_prompt: bool,

    pub(crate) prompt: &'static str,

    /// Lines longer than this are rejected.
    pub(crate) max_line_length: usize,

    /// Lines with more tokens than this are rejected.
    pub(crate) max_arguments: usize,
}

impl ShellConfig {
    /// Creates an interactive shell configuration.
    ///
    /// # Complete List
    /// - The `:` prompt is displayed before every line
    pub fn interactive() -> Self {
        Self {
            display_prompt: true,
            ..Default::default()
        }
    }

    /// Creates a noninteractive shell configuration, used for `-c` and
    /// script files.
    ///
    /// # Complete List
    /// - No prompt is displayed
    pub fn noninteractive() -> Self {
        Default::default()
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            display_prompt: false,
            prompt: PROMPT,
            max_line_length: MAX_LINE_LENGTH,
            max_arguments: MAX_ARGUMENTS,
        }
    }
}

/// smallsh Shell
pub struct Shell {
    job_manager: JobManager,
    /// Outcome of the last foreground command. Background jobs never
    /// change it.
    last_status: ShellStatus,
    config: ShellConfig,
}

impl Shell {
    /// Constructs a new Shell and installs its signal dispositions.
    pub fn new(config: ShellConfig) -> Result<Self> {
        signals::install_shell_policy()?;
        info!("smallsh started up as {}", Pid::this());
        Ok(Self {
            job_manager: JobManager::default(),
            last_status: ShellStatus::default(),
            config,
        })
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Status of the most recent foreground command.
    pub fn last_status(&self) -> ShellStatus {
        self.last_status
    }

    pub fn has_background_jobs(&self) -> bool {
        self.job_manager.has_jobs()
    }

    /// Pids of the background jobs still being tracked.
    pub fn background_pids(&self) -> Vec<Pid> {
        self.job_manager.pids()
    }

    /// Runs one line of input.
    ///
    /// Errors that leave the shell usable (syntax, `cd`) are returned like
    /// any other; callers decide with [`Error::is_fatal`].
    pub fn execute_command_string(&mut self, input: &str) -> Result<()> {
        let command = match Command::parse(input, &self.config)? {
            Some(command) => command,
            None => return Ok(()),
        };

        if builtins::is_builtin(command.program()) {
            builtins::run(self, command.program(), command.args(), &mut io::stdout())
        } else {
            self.launch(&command)
        }
    }

    /// Runs `command` in a child process.
    ///
    /// A foreground command is waited on and its outcome becomes the shell
    /// status; a signal death is announced right away. A background command
    /// is announced and tracked until reaped.
    pub fn launch(&mut self, command: &Command) -> Result<()> {
        match launcher::launch(command, signals::foreground_only())? {
            Launch::Foreground(status) => {
                if let ShellStatus::Signaled(_) = status {
                    println!("{}", status);
                }
                self.last_status = status;
            }
            Launch::Background(job) => {
                self.job_manager.track(job);
                println!("background pid is {}", job.pid());
            }
        }

        Ok(())
    }

    /// Reaps finished background jobs, without blocking.
    pub fn reap_finished_jobs(&mut self) -> Vec<JobResult> {
        self.job_manager.reap_finished()
    }

    /// Announces and forgets every background job that has finished.
    pub fn do_job_notification(&mut self) {
        for result in self.reap_finished_jobs() {
            println!("{}", result);
        }
    }

    /// Kills every background job still running, without waiting.
    pub fn kill_background_jobs(&mut self) -> usize {
        self.job_manager.kill_all()
    }

    /// Runs the commands of a script file, one per line.
    pub fn execute_commands_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::open(path).context(ErrorKind::Io)?;
        for line in BufReader::new(file).lines() {
            let line = line.context(ErrorKind::Io)?;
            self.do_job_notification();
            let temp_result = self.execute_command_string(&line);
            self.handle_error(temp_result);
        }

        Ok(())
    }

    /// Runs commands from stdin until EOF is received.
    pub fn execute_from_stdin(&mut self) {
        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            // Check the status of background jobs, removing exited ones.
            self.do_job_notification();

            if self.config.display_prompt {
                print!("{}", self.config.prompt);
                let temp_result = io::stdout().flush();
                log_if_err!(temp_result, "flushing prompt");
            }

            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("failed to read line: {}", e);
                    break;
                }
            }

            let temp_result = self.execute_command_string(&line);
            self.handle_error(temp_result);
        }
    }

    /// Reports a failed command. Fatal errors end the shell.
    fn handle_error(&mut self, result: Result<()>) {
        if let Err(e) = result {
            if e.is_fatal() {
                self.fatal(&e);
            }
            debug!("command failed: {:?}", e);
            eprintln!("smallsh: {}", e);
        }
    }

    /// Emits a diagnostic for an unrecoverable error and exits with status 1.
    pub fn fatal(&mut self, error: &Error) -> ! {
        error!("fatal: {}", error);
        eprintln!("smallsh: {}", error);
        self.exit(Some(1))
    }

    /// Exit the shell.
    ///
    /// Background jobs still running are killed first. Exit with a status of
    /// n, or with that of the last foreground command if n is None. Like
    /// bash, n is reduced to a u8: positive n becomes n % 256 and negative n
    /// becomes (256 + n) % 256.
    pub fn exit(&mut self, n: Option<i32>) -> ! {
        let killed = self.kill_background_jobs();
        let code = n.unwrap_or_else(|| self.last_status.code());
        let code_like_u8 = if code < 0 {
            (256 + code % 256) % 256
        } else {
            code % 256
        };

        let temp_result = io::stdout().flush();
        log_if_err!(temp_result, "flushing stdout on exit");
        info!(
            "smallsh has shut down ({} background jobs killed)",
            killed
        );
        process::exit(code_like_u8);
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}last status: {}\n{:?}",
            self.job_manager, self.last_status, self.config
        )
    }
}
