//! vish CLI entry point.
//!
//! Usage:
//!   vish --vfs-path fs.zip --log-file audit.csv
//!   vish --vfs-path fs.zip --log-file audit.csv --startup-script init.vsh

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vish_kernel::{LoadSource, Shell, Vfs};
use vish_repl::logger::AuditLogger;
use vish_repl::{current_username, process_env_lookup, LineOutcome, Repl};

#[derive(Parser, Debug)]
#[command(name = "vish", version, about = "Virtual filesystem shell emulator")]
struct Cli {
    /// Zip archive to load the virtual filesystem from
    #[arg(long, value_name = "PATH")]
    vfs_path: PathBuf,

    /// CSV audit log file (created if missing)
    #[arg(long, value_name = "PATH")]
    log_file: PathBuf,

    /// Command file to run before the interactive prompt
    #[arg(long, value_name = "PATH")]
    startup_script: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let vfs = Vfs::open(&cli.vfs_path);
    let report = vfs.load_report();

    println!("vish v{}", env!("CARGO_PKG_VERSION"));
    match &report.source {
        LoadSource::Archive(path) => println!(
            "Loaded {} ({} directories, {} files)",
            path.display(),
            report.directories,
            report.files
        ),
        LoadSource::Default => println!(
            "No usable archive at {}; starting with the default tree",
            cli.vfs_path.display()
        ),
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    println!("Type help for commands, exit to leave.\n");

    let logger = AuditLogger::create(&cli.log_file, current_username())?;
    logger.log("session-start", &cli.vfs_path.display().to_string(), "");

    let shell = Shell::new(vfs).with_vars(process_env_lookup);
    let mut repl = Repl::new(shell, logger);

    if let Some(script) = &cli.startup_script {
        match repl.run_startup(script) {
            LineOutcome::Continue(Some(output)) => println!("{output}"),
            LineOutcome::Continue(None) => {}
            LineOutcome::Exit => return Ok(ExitCode::SUCCESS),
        }
    }

    repl.run_interactive()?;
    Ok(ExitCode::SUCCESS)
}
