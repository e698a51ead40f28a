//! Shell command layer: parse a line, run it against the VFS.
//!
//! The shell owns a [`Vfs`] and turns input lines into
//! [`CommandOutcome`] records. It holds no terminal state and does no
//! logging itself; the REPL renders `output`/`error` and feeds each outcome
//! to the audit log.

mod tokens;

pub use tokens::{expand_vars, tokenize, TokenizeError};

use crate::error::VfsError;
use crate::vfs::{EntryInfo, FileContent, LoadSource, Vfs};

/// Variable lookup used for `$VAR` expansion. Supplied by the embedder; the
/// kernel never reads the process environment on its own.
pub type VarLookup = Box<dyn Fn(&str) -> Option<String>>;

/// Result of dispatching one input line.
///
/// `command` and `args` are what the audit logger records; `error` is empty
/// on success. `exit` asks the caller to stop its loop.
#[derive(Debug, Clone, Default)]
pub struct CommandOutcome {
    pub command: String,
    pub args: String,
    pub output: String,
    pub error: String,
    pub exit: bool,
}

impl CommandOutcome {
    fn success(command: &str, args: &[String], output: impl Into<String>) -> Self {
        Self {
            command: command.to_string(),
            args: args.join(" "),
            output: output.into(),
            ..Self::default()
        }
    }

    fn failure(command: &str, args: &[String], error: impl Into<String>) -> Self {
        Self {
            command: command.to_string(),
            args: args.join(" "),
            error: error.into(),
            ..Self::default()
        }
    }

    pub fn ok(&self) -> bool {
        self.error.is_empty()
    }
}

/// The command interpreter: tokenizing, variable expansion, dispatch.
pub struct Shell {
    vfs: Vfs,
    vars: VarLookup,
}

impl Shell {
    /// Create a shell over a VFS, with no variables defined.
    pub fn new(vfs: Vfs) -> Self {
        Self {
            vfs,
            vars: Box::new(|_| None),
        }
    }

    /// Replace the variable source (typically the process environment,
    /// wired in by the REPL).
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String> + 'static) -> Self {
        self.vars = Box::new(lookup);
        self
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    pub fn vfs_mut(&mut self) -> &mut Vfs {
        &mut self.vfs
    }

    /// Current directory, for the prompt.
    pub fn current_path(&self) -> String {
        self.vfs.current_path()
    }

    /// Expand, tokenize, and dispatch one input line.
    ///
    /// Returns `None` for blank lines. Parse failures produce an outcome
    /// with an empty command name and the raw line as `args`, so they still
    /// reach the audit log.
    pub fn execute(&mut self, line: &str) -> Option<CommandOutcome> {
        let expanded = expand_vars(line, &self.vars);
        let words = match tokenize(&expanded) {
            Ok(words) => words,
            Err(err) => {
                return Some(CommandOutcome {
                    args: line.trim().to_string(),
                    error: format!("parse error: {err}"),
                    ..CommandOutcome::default()
                });
            }
        };
        let (command, args) = words.split_first()?;
        Some(self.dispatch(command, args))
    }

    fn dispatch(&mut self, command: &str, args: &[String]) -> CommandOutcome {
        match command {
            "exit" => CommandOutcome {
                command: command.to_string(),
                args: args.join(" "),
                exit: true,
                ..CommandOutcome::default()
            },
            "ls" => self.cmd_ls(command, args),
            "cd" => self.cmd_cd(command, args),
            "pwd" => CommandOutcome::success(command, args, self.vfs.current_path()),
            "cat" => self.cmd_cat(command, args),
            "stat" => self.cmd_stat(command, args),
            "echo" => CommandOutcome::success(command, args, args.join(" ")),
            "env" => self.cmd_env(command, args),
            "vfs-reload" => self.cmd_reload(command, args),
            "help" => CommandOutcome::success(command, args, HELP_TEXT.trim_end()),
            _ => CommandOutcome::failure(command, args, format!("{command}: command not found")),
        }
    }

    fn cmd_ls(&mut self, command: &str, args: &[String]) -> CommandOutcome {
        let mut long = false;
        let mut all = false;
        let mut path = "";
        for arg in args {
            match arg.as_str() {
                "-l" => long = true,
                "-a" => all = true,
                "-la" | "-al" => {
                    long = true;
                    all = true;
                }
                other => path = other,
            }
        }

        match self.vfs.list_directory(path) {
            Ok(entries) => {
                let visible: Vec<&EntryInfo> = entries
                    .iter()
                    .filter(|e| all || !e.name.starts_with('.'))
                    .collect();
                let output = if long {
                    visible
                        .iter()
                        .map(|e| format_long_entry(e))
                        .collect::<Vec<_>>()
                        .join("\n")
                } else {
                    visible
                        .iter()
                        .map(|e| {
                            if e.is_dir() {
                                format!("{}/", e.name)
                            } else {
                                e.name.clone()
                            }
                        })
                        .collect::<Vec<_>>()
                        .join("  ")
                };
                CommandOutcome::success(command, args, output)
            }
            Err(err) => CommandOutcome::failure(command, args, render_error(command, path, &err)),
        }
    }

    fn cmd_cd(&mut self, command: &str, args: &[String]) -> CommandOutcome {
        let path = args.first().map(String::as_str).unwrap_or("/");
        match self.vfs.change_directory(path) {
            Ok(()) => CommandOutcome::success(command, args, ""),
            Err(err) => CommandOutcome::failure(command, args, render_error(command, path, &err)),
        }
    }

    fn cmd_cat(&mut self, command: &str, args: &[String]) -> CommandOutcome {
        let Some(path) = args.first() else {
            return CommandOutcome::failure(command, args, "cat: missing path argument");
        };
        match self.vfs.read_file(path) {
            Ok(FileContent::Text(text)) => CommandOutcome::success(command, args, text.clone()),
            Ok(FileContent::Binary(bytes)) => CommandOutcome::failure(
                command,
                args,
                format!("cat: {path}: binary file ({} bytes)", bytes.len()),
            ),
            Err(err) => CommandOutcome::failure(command, args, render_error(command, path, &err)),
        }
    }

    fn cmd_stat(&mut self, command: &str, args: &[String]) -> CommandOutcome {
        let Some(path) = args.first() else {
            return CommandOutcome::failure(command, args, "stat: missing path argument");
        };
        match self.vfs.stat(path) {
            Ok(info) => {
                let output = format!(
                    "Name: {}\nType: {}\nPermissions: {}\nOwner: {}:{}\nSize: {}\nModified: {}",
                    info.name,
                    info.entry_type,
                    info.permissions,
                    info.owner,
                    info.group,
                    info.size,
                    format_time(info.modified),
                );
                CommandOutcome::success(command, args, output)
            }
            Err(err) => CommandOutcome::failure(command, args, render_error(command, path, &err)),
        }
    }

    fn cmd_env(&mut self, command: &str, args: &[String]) -> CommandOutcome {
        let mut lines = Vec::new();
        for name in ["HOME", "USER"] {
            let value = (self.vars)(name).unwrap_or_else(|| "(unset)".to_string());
            lines.push(format!("{name}={value}"));
        }
        lines.push(format!("PWD={}", self.vfs.current_path()));
        CommandOutcome::success(command, args, lines.join("\n"))
    }

    fn cmd_reload(&mut self, command: &str, args: &[String]) -> CommandOutcome {
        self.vfs.reload();
        let report = self.vfs.load_report();
        let mut output = match &report.source {
            LoadSource::Archive(path) => format!(
                "reloaded from {} ({} directories, {} files)",
                path.display(),
                report.directories,
                report.files
            ),
            LoadSource::Default => "reloaded with the default tree".to_string(),
        };
        for warning in &report.warnings {
            output.push_str(&format!("\nwarning: {warning}"));
        }
        CommandOutcome::success(command, args, output)
    }
}

/// Map a `VfsError` to the classic shell error line.
fn render_error(command: &str, path: &str, err: &VfsError) -> String {
    let display = if path.is_empty() { "." } else { path };
    match err {
        VfsError::NotFound(_) => format!("{command}: {display}: No such file or directory"),
        VfsError::NotADirectory(_) => format!("{command}: {display}: Not a directory"),
        VfsError::IsADirectory(_) => format!("{command}: {display}: Is a directory"),
        other => format!("{command}: {display}: {other}"),
    }
}

/// One `ls -l` line: `drwxr-xr-x     user     user        0  name`.
fn format_long_entry(entry: &EntryInfo) -> String {
    let type_char = if entry.is_dir() { 'd' } else { '-' };
    format!(
        "{}{} {:>8} {:>8} {:>8} {}",
        type_char, entry.permissions, entry.owner, entry.group, entry.size, entry.name
    )
}

fn format_time(time: std::time::SystemTime) -> String {
    chrono::DateTime::<chrono::Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

const HELP_TEXT: &str = r#"vish — virtual filesystem shell

Commands:
  ls [-la] [path]      List directory contents
  cd [path]            Change directory (default: /)
  pwd                  Print current directory
  cat <path>           Print a text file
  stat <path>          Show file or directory metadata
  echo [args...]       Print arguments
  env                  Show HOME, USER, and PWD
  run <script>         Execute a script from the host filesystem
  vfs-reload           Reload the tree from the source archive
  help                 Show this help
  exit                 Leave the shell

Variables:
  $NAME, ${NAME}       Expanded from the host environment
"#;
