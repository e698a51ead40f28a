//! vish REPL — interactive front end for the vish kernel.
//!
//! This crate wraps the kernel's [`Shell`] with:
//! - a rustyline read loop with persistent history
//! - the CSV audit log (every dispatched command, success or failure)
//! - `run <script>` execution of host-side command files
//! - environment-backed `$VAR` expansion

pub mod logger;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use vish_kernel::Shell;

use crate::logger::AuditLogger;

/// What the loop should do after one line.
#[derive(Debug)]
pub enum LineOutcome {
    /// Keep going, printing the output if there is any.
    Continue(Option<String>),
    /// Leave the loop (`exit`).
    Exit,
}

/// REPL state: the shell plus the audit log.
pub struct Repl {
    shell: Shell,
    logger: AuditLogger,
}

impl Repl {
    pub fn new(shell: Shell, logger: AuditLogger) -> Self {
        Self { shell, logger }
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// Prompt string showing the current VFS directory.
    pub fn prompt(&self) -> String {
        format!("vish:{}$ ", self.shell.current_path())
    }

    /// Process one input line: dispatch, log, and report what to print.
    ///
    /// `run <script>` is handled here rather than in the kernel because it
    /// reads from the host filesystem.
    pub fn process_line(&mut self, line: &str) -> LineOutcome {
        let trimmed = line.trim();
        if let Some(script) = trimmed.strip_prefix("run ") {
            let script = script.trim();
            return self.run_script_logged(script);
        }
        if trimmed == "run" {
            self.logger.log("run", "", "run: missing script path");
            return LineOutcome::Continue(Some("run: missing script path".to_string()));
        }

        let Some(outcome) = self.shell.execute(line) else {
            return LineOutcome::Continue(None);
        };
        self.logger
            .log(&outcome.command, &outcome.args, &outcome.error);

        if outcome.exit {
            return LineOutcome::Exit;
        }
        let text = if !outcome.ok() {
            Some(outcome.error)
        } else if outcome.output.is_empty() {
            None
        } else {
            Some(outcome.output)
        };
        LineOutcome::Continue(text)
    }

    /// Run a startup script before the interactive loop. A missing or
    /// unreadable script is reported and logged like any failed command; the
    /// session still starts.
    pub fn run_startup(&mut self, path: &Path) -> LineOutcome {
        self.run_script_logged(&path.display().to_string())
    }

    fn run_script_logged(&mut self, script: &str) -> LineOutcome {
        match self.run_script(Path::new(script)) {
            Ok(outcome) => {
                self.logger.log("run", script, "");
                outcome
            }
            Err(err) => {
                let message = format!("run: {script}: {err}");
                self.logger.log("run", script, &message);
                LineOutcome::Continue(Some(message))
            }
        }
    }

    /// Execute a command file from the host filesystem, echoing each command
    /// behind a simulated prompt. Blank lines are skipped, `#` lines are
    /// printed as-is, and `exit` stops both the script and the session.
    pub fn run_script(&mut self, path: &Path) -> Result<LineOutcome> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;

        for line in source.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('#') {
                println!("{trimmed}");
                continue;
            }
            println!("{}{}", self.prompt(), trimmed);
            match self.process_line(trimmed) {
                LineOutcome::Continue(Some(output)) => println!("{output}"),
                LineOutcome::Continue(None) => {}
                LineOutcome::Exit => return Ok(LineOutcome::Exit),
            }
        }
        Ok(LineOutcome::Continue(None))
    }

    /// The interactive loop. Ctrl-C clears the line, Ctrl-D exits.
    pub fn run_interactive(&mut self) -> Result<()> {
        let mut rl: Editor<(), DefaultHistory> =
            Editor::new().context("failed to create line editor")?;

        let history = History::discover();
        history.restore(&mut rl);

        loop {
            match rl.readline(&self.prompt()) {
                Ok(line) => {
                    if let Err(e) = rl.add_history_entry(line.as_str()) {
                        tracing::warn!("failed to add history entry: {e}");
                    }
                    match self.process_line(&line) {
                        LineOutcome::Continue(Some(output)) => println!("{output}"),
                        LineOutcome::Continue(None) => {}
                        LineOutcome::Exit => break,
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C (type exit to leave)");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("^D");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        history.persist(&mut rl);
        Ok(())
    }
}

/// Best-effort command history under the user data directory.
///
/// Every step is allowed to fail quietly; a REPL without history is still a
/// working REPL.
struct History {
    path: Option<PathBuf>,
}

impl History {
    fn discover() -> Self {
        let path = directories::BaseDirs::new()
            .map(|dirs| dirs.data_dir().join("vish").join("history.txt"));
        Self { path }
    }

    fn restore(&self, rl: &mut Editor<(), DefaultHistory>) {
        let Some(path) = &self.path else { return };
        match rl.load_history(path) {
            Ok(()) => {}
            // Absent on first run
            Err(ReadlineError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!("could not read history {}: {err}", path.display()),
        }
    }

    fn persist(&self, rl: &mut Editor<(), DefaultHistory>) {
        let Some(path) = &self.path else { return };
        if let Some(parent) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!("could not create history directory {}: {err}", parent.display());
                return;
            }
        }
        if let Err(err) = rl.save_history(path) {
            tracing::warn!("could not write history {}: {err}", path.display());
        }
    }
}

/// Environment lookup for `$VAR` expansion, with Windows fallbacks for the
/// two names the shell cares about most.
pub fn process_env_lookup(name: &str) -> Option<String> {
    if let Ok(value) = std::env::var(name) {
        return Some(value);
    }
    match name {
        "HOME" => std::env::var("USERPROFILE").ok(),
        "USER" => std::env::var("USERNAME").ok(),
        _ => None,
    }
}

/// The username recorded in the audit log.
pub fn current_username() -> String {
    process_env_lookup("USER").unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vish_kernel::Vfs;

    fn test_repl(dir: &tempfile::TempDir) -> (Repl, PathBuf) {
        let log_path = dir.path().join("audit.csv");
        let logger = AuditLogger::create(&log_path, "tester").unwrap();
        let shell = Shell::new(Vfs::in_memory());
        (Repl::new(shell, logger), log_path)
    }

    fn output_of(outcome: LineOutcome) -> Option<String> {
        match outcome {
            LineOutcome::Continue(text) => text,
            LineOutcome::Exit => panic!("unexpected exit"),
        }
    }

    #[test]
    fn test_process_line_logs_and_prints() {
        let dir = tempfile::tempdir().unwrap();
        let (mut repl, log_path) = test_repl(&dir);

        assert_eq!(output_of(repl.process_line("pwd")).as_deref(), Some("/"));
        assert_eq!(
            output_of(repl.process_line("cd /nope")).as_deref(),
            Some("cd: /nope: No such file or directory")
        );
        assert!(output_of(repl.process_line("cd /home")).is_none());
        assert!(output_of(repl.process_line("   ")).is_none());

        let log = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<_> = log.lines().collect();
        // header + pwd + failed cd + successful cd; blank line unlogged
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("cd,/nope,cd: /nope: No such file or directory"));
        assert!(lines[3].ends_with("cd,/home,"));
    }

    #[test]
    fn test_exit_stops_loop() {
        let dir = tempfile::tempdir().unwrap();
        let (mut repl, _) = test_repl(&dir);
        assert!(matches!(repl.process_line("exit"), LineOutcome::Exit));
    }

    #[test]
    fn test_prompt_tracks_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let (mut repl, _) = test_repl(&dir);
        assert_eq!(repl.prompt(), "vish:/$ ");
        repl.process_line("cd /home/user");
        assert_eq!(repl.prompt(), "vish:/home/user$ ");
    }

    #[test]
    fn test_run_script() {
        let dir = tempfile::tempdir().unwrap();
        let (mut repl, log_path) = test_repl(&dir);

        let script = dir.path().join("startup.vsh");
        std::fs::write(&script, "# setup\ncd /home/user\npwd\n").unwrap();

        let outcome = repl.process_line(&format!("run {}", script.display()));
        assert!(matches!(outcome, LineOutcome::Continue(None)));
        assert_eq!(repl.shell().current_path(), "/home/user");

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("cd,/home/user,"));
        assert!(log.contains("pwd,,"));
        // the run command itself is logged after its body
        assert!(log.lines().last().unwrap().contains("run,"));
    }

    #[test]
    fn test_run_script_exit_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let (mut repl, _) = test_repl(&dir);

        let script = dir.path().join("quit.vsh");
        std::fs::write(&script, "pwd\nexit\npwd\n").unwrap();

        let outcome = repl.process_line(&format!("run {}", script.display()));
        assert!(matches!(outcome, LineOutcome::Exit));
    }

    #[test]
    fn test_startup_failure_keeps_session_alive() {
        let dir = tempfile::tempdir().unwrap();
        let (mut repl, log_path) = test_repl(&dir);

        let message = output_of(repl.run_startup(Path::new("/no/such/startup.vsh"))).unwrap();
        assert!(message.starts_with("run: /no/such/startup.vsh:"));

        // The shell still works after the failed startup script
        assert_eq!(output_of(repl.process_line("pwd")).as_deref(), Some("/"));

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("run,/no/such/startup.vsh,"));
    }

    #[test]
    fn test_run_missing_script_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (mut repl, log_path) = test_repl(&dir);

        let output = output_of(repl.process_line("run /no/such/file.vsh")).unwrap();
        assert!(output.starts_with("run: /no/such/file.vsh:"));

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("run,/no/such/file.vsh,"));
    }
}
