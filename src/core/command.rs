//! The command handed from an input line to the process launcher.

use std::path::Path;

use log::debug;
use nix::unistd::Pid;

use crate::errors::{Error, ErrorKind, Result};
use crate::shell::{
    redirect::{self, Redirect, RedirectInstruction},
    ShellConfig,
};

/// Trailing token requesting background execution.
pub const BACKGROUND_TOKEN: &str = "&";
const COMMENT_PREFIX: char = '#';
/// Expands to the shell's process id.
const PID_VARIABLE: &str = "$$";

/// A validated command: argument vector with redirection tokens removed, the
/// redirections themselves in the order they appeared, and whether the user
/// asked for background execution.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    input: String,
    argv: Vec<String>,
    redirects: Vec<Redirect>,
    background_requested: bool,
}

impl Command {
    /// Builds a command from already split tokens.
    ///
    /// Redirection markers and their filenames are removed from `tokens`.
    /// Fails if a marker has no filename or if nothing is left to execute.
    pub fn from_argv<I, S>(tokens: I, background_requested: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect();
        let input = tokens.join(" ");
        let (argv, redirects) = redirect::scan(tokens)?;
        if argv.is_empty() {
            return Err(Error::syntax(input));
        }

        Ok(Self {
            input,
            argv,
            redirects,
            background_requested,
        })
    }

    /// Parses one line of user input.
    ///
    /// Returns `None` for blank lines and comments.
    pub fn parse(line: &str, config: &ShellConfig) -> Result<Option<Self>> {
        let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
        if line.trim().is_empty() || line.starts_with(COMMENT_PREFIX) {
            return Ok(None);
        }

        if line.chars().count() > config.max_line_length {
            return Err(ErrorKind::LineTooLong(config.max_line_length).into());
        }

        let line = expand_pid(line, Pid::this());
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() > config.max_arguments {
            return Err(ErrorKind::TooManyArguments(config.max_arguments).into());
        }

        let background_requested = tokens.last() == Some(&BACKGROUND_TOKEN);
        if background_requested {
            tokens.pop();
        }
        if tokens.is_empty() {
            return Ok(None);
        }

        let mut command = Self::from_argv(tokens, background_requested)?;
        command.input = line.trim().to_string();
        debug!("parsed Command: {:?}", command);
        Ok(Some(command))
    }

    /// The line this command was built from.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    /// Program name followed by its arguments, as passed to exec.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn redirects(&self) -> &[Redirect] {
        &self.redirects
    }

    pub fn background_requested(&self) -> bool {
        self.background_requested
    }

    /// The file standard input is read from, if redirected.
    pub fn stdin_path(&self) -> Option<&Path> {
        self.last_redirect(RedirectInstruction::Input)
    }

    /// The file standard output is written to, if redirected.
    pub fn stdout_path(&self) -> Option<&Path> {
        self.last_redirect(RedirectInstruction::Output)
    }

    fn last_redirect(&self, instruction: RedirectInstruction) -> Option<&Path> {
        self.redirects
            .iter()
            .rev()
            .find(|r| r.instruction == instruction)
            .map(|r| r.filename.as_path())
    }
}

/// Replaces every `$$` in `line` with `pid`.
pub fn expand_pid(line: &str, pid: Pid) -> String {
    line.replace(PID_VARIABLE, &pid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(line: &str) -> Option<Command> {
        Command::parse(line, &ShellConfig::interactive()).expect("parse failed")
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   \t \n"), None);
        assert_eq!(parse("# echo hi"), None);
        assert_eq!(parse("#"), None);
    }

    #[test]
    fn test_simple_command() {
        let command = parse("ls -la /tmp\n").unwrap();
        assert_eq!(command.program(), "ls");
        assert_eq!(command.args(), &["-la".to_string(), "/tmp".to_string()]);
        assert!(!command.background_requested());
        assert!(command.redirects().is_empty());
        assert_eq!(command.input(), "ls -la /tmp");
    }

    #[test]
    fn test_trailing_ampersand_requests_background() {
        let command = parse("sleep 5 &").unwrap();
        assert_eq!(command.argv(), &["sleep".to_string(), "5".to_string()]);
        assert!(command.background_requested());
    }

    #[test]
    fn test_inner_ampersand_is_an_argument() {
        let command = parse("echo & hi").unwrap();
        assert_eq!(command.args(), &["&".to_string(), "hi".to_string()]);
        assert!(!command.background_requested());
    }

    #[test]
    fn test_lone_ampersand_is_not_a_command() {
        assert_eq!(parse("&"), None);
    }

    #[test]
    fn test_redirections_are_removed_from_argv() {
        let command = parse("sort < in.txt > out.txt &").unwrap();
        assert_eq!(command.argv(), &["sort".to_string()]);
        assert_eq!(command.stdin_path(), Some(PathBuf::from("in.txt").as_path()));
        assert_eq!(command.stdout_path(), Some(PathBuf::from("out.txt").as_path()));
        assert!(command.background_requested());
    }

    #[test]
    fn test_last_redirection_wins() {
        let command = parse("echo hi > a.txt > b.txt").unwrap();
        assert_eq!(command.redirects().len(), 2);
        assert_eq!(command.stdout_path(), Some(PathBuf::from("b.txt").as_path()));
        assert_eq!(command.stdin_path(), None);
    }

    #[test]
    fn test_dangling_marker_is_a_syntax_error() {
        let result = Command::parse("echo hi >", &ShellConfig::interactive());
        match result {
            Err(ref e) => assert_eq!(*e.kind(), ErrorKind::Syntax(">".to_string())),
            Ok(_) => panic!("expected syntax error"),
        }
    }

    #[test]
    fn test_redirection_without_program_is_a_syntax_error() {
        assert!(Command::parse("> out.txt", &ShellConfig::interactive()).is_err());
    }

    #[test]
    fn test_pid_expansion() {
        let pid = Pid::from_raw(4242);
        assert_eq!(expand_pid("echo $$", pid), "echo 4242");
        assert_eq!(expand_pid("touch file$$.$$", pid), "touch file4242.4242");
        assert_eq!(expand_pid("echo $", pid), "echo $");

        let command = parse("echo $$").unwrap();
        assert_eq!(command.args(), &[Pid::this().to_string()]);
    }

    #[test]
    fn test_line_limits() {
        let config = ShellConfig::interactive();
        let long_line = "a".repeat(config.max_line_length + 1);
        match Command::parse(&long_line, &config) {
            Err(ref e) => assert_eq!(*e.kind(), ErrorKind::LineTooLong(config.max_line_length)),
            Ok(_) => panic!("expected line too long"),
        }

        let many_args = vec!["x"; config.max_arguments + 1].join(" ");
        match Command::parse(&many_args, &config) {
            Err(ref e) => {
                assert_eq!(*e.kind(), ErrorKind::TooManyArguments(config.max_arguments))
            }
            Ok(_) => panic!("expected too many arguments"),
        }
    }

    #[test]
    fn test_from_argv() {
        let command = Command::from_argv(&["cat", "<", "in.txt"], true).unwrap();
        assert_eq!(command.argv(), &["cat".to_string()]);
        assert!(command.background_requested());
        assert_eq!(command.input(), "cat < in.txt");
    }
}
