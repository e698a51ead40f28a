//! CSV audit log: one row per executed command.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

const HEADER: &str = "timestamp,username,command,arguments,error_message";

/// Append-only CSV logger. Every dispatched command produces one row,
/// successful or not; failures carry the error message in the last column.
pub struct AuditLogger {
    path: PathBuf,
    username: String,
}

impl AuditLogger {
    /// Open (or create) the log file, writing the CSV header when the file
    /// is new or empty. Parent directories are created as needed.
    pub fn create(path: impl Into<PathBuf>, username: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
        }

        let needs_header = match std::fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        if needs_header {
            let mut file = File::create(&path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            writeln!(file, "{HEADER}")
                .with_context(|| format!("writing log header to {}", path.display()))?;
        }

        Ok(Self {
            path,
            username: username.into(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row. Logging failures are reported but never abort the
    /// session.
    pub fn log(&self, command: &str, arguments: &str, error_message: &str) {
        if let Err(err) = self.append(command, arguments, error_message) {
            tracing::warn!(path = %self.path.display(), error = %err, "audit log write failed");
            eprintln!("warning: audit log write failed: {err}");
        }
    }

    fn append(&self, command: &str, arguments: &str, error_message: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let row = format!(
            "{},{},{},{},{}",
            timestamp,
            csv_escape(&self.username),
            csv_escape(command),
            csv_escape(arguments),
            csv_escape(error_message),
        );
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("opening log file {}", self.path.display()))?;
        writeln!(file, "{row}").with_context(|| format!("appending to {}", self.path.display()))?;
        Ok(())
    }
}

/// Quote a field when it contains a comma, quote, or newline; double any
/// embedded quotes.
fn csv_escape(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
