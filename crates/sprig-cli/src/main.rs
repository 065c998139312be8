//! # sprig-cli
//!
//! Command-line driver for the sprig package resolver.
//!
//! Parses the command line, sets up logging, and dispatches to the command
//! handlers. Errors are printed with their suggestion and cause chain.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use sprig_core::error::{SprigError, SprigResult};
use tracing::{debug, error};

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Resolve, install and package sprig projects
#[derive(Parser)]
#[command(name = "sprig", version, about = "Package resolver for sprig projects")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Target description to use instead of the nearest target.json
    #[arg(long, global = true, value_name = "PATH")]
    pub target: Option<Utf8PathBuf>,

    /// Never contact remote repositories
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download missing or outdated dependencies
    Install,
    /// List the resolved dependency graph
    Deps {
        /// Print the import graph in DOT format
        #[arg(long)]
        dot: bool,
    },
    /// Check whether adding a package would conflict with the project
    Conflicts {
        id: String,
        #[arg(long, default_value = "*")]
        version: String,
    },
    /// Write the compile options of the project
    Build {
        #[arg(long, value_name = "FILE")]
        out: Option<Utf8PathBuf>,
    },
    /// Write the publishable file set
    Publish {
        #[arg(long)]
        dry_run: bool,
        #[arg(long, value_name = "DIR", default_value = "built/publish")]
        out: Utf8PathBuf,
    },
    /// Write a compressed project archive
    Pack {
        #[arg(long, value_name = "FILE")]
        out: Option<Utf8PathBuf>,
        /// Editor recorded in the archive
        #[arg(long)]
        editor: Option<String>,
    },
}

const LOG_CRATES: &[&str] = &[
    "sprig_cli",
    "sprig_core",
    "sprig_config",
    "sprig_host",
    "sprig_resolver",
    "sprig_build",
];

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    debug!("Starting sprig v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_cli(cli) {
        eprint!("{}", ErrorFormatter::new().format_error(&e));
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> SprigResult<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| SprigError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.target, cli.offline)?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let directives = LOG_CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .collect::<Vec<_>>()
        .join(",");

    tracing_subscriber::fmt()
        .with_env_filter(directives)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("sprig encountered an unexpected error: {}", panic_info);
        eprintln!("sprig crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}
