mod completion;
mod dispatch;
mod render;

use std::path::PathBuf;
use std::process::exit;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::completion::CliCompletionShell;
use crate::dispatch::run_cli;

#[derive(Parser, Debug)]
#[command(name = "clientpatch")]
#[command(
    about = "Apply and revert client patch overlays with full rollback",
    long_about = None,
    version
)]
struct Cli {
    #[command(flatten)]
    roots: RootOptions,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct RootOptions {
    /// Config file; defaults to ./clientpatch.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    target_root: Option<PathBuf>,
    /// Directory holding Patches/; defaults to the current directory.
    #[arg(long, global = true)]
    patch_root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Overlay the patch set of a client version onto the target root.
    Apply { version: String },
    /// Undo the last applied patch and clean volatile directories.
    Revert {
        #[arg(long)]
        yes: bool,
    },
    Status,
    /// List client versions with a patch set.
    Versions,
    Doctor,
    /// Files created by asset generators.
    Generated {
        #[command(subcommand)]
        command: GeneratedCommands,
    },
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum GeneratedCommands {
    Status {
        feature: String,
    },
    Revert {
        feature: String,
        /// Only revert files generated for this client version.
        #[arg(long)]
        version: Option<String>,
    },
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(err) = run() {
        error!("{err:#}");
        exit(1);
    }
}

fn run() -> Result<()> {
    run_cli(Cli::parse())
}
