//! fileworks - bulk copy, move, delete and size counting over file trees.
//!
//! Usage:
//!   fw count PATH...          Count items and total size
//!   fw delete PATH...         Delete files and directory trees
//!   fw copy PATH... DEST      Copy into a destination directory
//!   fw move PATH... DEST      Move into a destination directory
//!   fw --help                 Show help

use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use tracing_subscriber::EnvFilter;

use fileworks_core::{OperationError, OpsConfig};
use fileworks_ops::{
    Copy, Count, Delete, Move, Operation, OperationEvent, OperationExecutor, ProgressSnapshot,
    Summary,
};

#[derive(Parser)]
#[command(
    name = "fileworks",
    version,
    about = "Bulk copy, move, delete and size counting over file trees",
    long_about = "fileworks runs recursive file operations that keep going past \
                  individual failures and report them all at the end.\n\n\
                  Copies and moves never overwrite: a taken name gets a numbered \
                  variant such as `a 2.txt`. Press Ctrl-C to stop an operation \
                  cleanly; finished work is kept."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print the summary as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Copy buffer size in bytes
    #[arg(long, global = true)]
    buffer_size: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count items and total file size
    Count {
        /// Files or directories to count
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Delete files and directory trees
    Delete {
        /// Files or directories to delete
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Copy files and directory trees into a directory
    Copy {
        /// Files or directories to copy
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Destination directory
        destination: PathBuf,
    },

    /// Move files and directory trees into a directory
    Move {
        /// Files or directories to move
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Destination directory
        destination: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut builder = OpsConfig::builder();
    if let Some(size) = cli.buffer_size {
        builder.buffer_size(size);
    }
    let config = builder.build().wrap_err("Invalid options")?;
    let executor = OperationExecutor::with_config(config.clone());

    match cli.command {
        Command::Count { paths } => run(&executor, Count::new(paths), cli.json).await,
        Command::Delete { paths } => run(&executor, Delete::new(paths), cli.json).await,
        Command::Copy { paths, destination } => {
            run(&executor, Copy::with_config(paths, destination, config), cli.json).await
        }
        Command::Move { paths, destination } => {
            run(&executor, Move::with_config(paths, destination, config), cli.json).await
        }
    }
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run one operation to completion, drawing progress and handling Ctrl-C.
async fn run<O: Operation>(executor: &OperationExecutor, operation: O, json: bool) -> Result<()> {
    let operation_type = operation.operation_type();
    let mut handle = executor.spawn(operation);

    let token = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping");
            token.cancel();
        }
    });

    let show_progress = !json && std::io::stderr().is_terminal();
    let result = loop {
        match handle.recv().await {
            Some(OperationEvent::Progress(snapshot)) => {
                if show_progress {
                    draw_progress(&snapshot);
                }
            }
            Some(OperationEvent::Complete(result)) => break result,
            None => {
                break Err(OperationError::Aborted(format!(
                    "{operation_type} stopped without a result"
                )));
            }
        }
    };

    if show_progress {
        eprint!("\r\x1b[2K");
    }

    match result {
        Ok(summary) => {
            print_summary(&summary, json)?;
            Ok(())
        }
        Err(OperationError::Failed(failures)) => {
            if json {
                let list: Vec<_> = failures
                    .iter()
                    .map(|f| {
                        serde_json::json!({
                            "path": f.path,
                            "error": f.cause.to_string(),
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({ "failures": list }))?
                );
            } else {
                for message in failures.messages() {
                    eprintln!("  {}", message);
                }
            }
            Err(eyre!("{} failed for {} item(s)", operation_type, failures.len()))
        }
        Err(e) => Err(e).wrap_err(format!("{} failed", operation_type)),
    }
}

/// Redraw the single progress line on stderr.
fn draw_progress(snapshot: &ProgressSnapshot) {
    let current = snapshot
        .current_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    let mut stderr = std::io::stderr().lock();
    let _ = write!(
        stderr,
        "\r\x1b[2K{} {} items, {}  {}",
        snapshot.operation_type,
        snapshot.items,
        format_size(snapshot.bytes),
        truncate(&current, 50)
    );
    let _ = stderr.flush();
}

fn print_summary(summary: &Summary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("{}", summary.describe());
    if summary.bytes > 0 {
        println!("Total size: {}", format_size(summary.bytes));
    }
    Ok(())
}

/// Format bytes as human-readable size.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Keep the tail of a long path, which is the part that changes.
fn truncate(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(count - max_len + 1).collect();
        format!("…{}", tail)
    }
}
