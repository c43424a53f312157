//! Tangle CLI - Command-line interface for the tangle working copy.

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tangle_core::TangleError;

mod commands;

#[derive(Parser)]
#[command(name = "tangle")]
#[command(about = "Apply merge plans and resolve conflicts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new working copy in the current directory
    Init,
    /// Apply a change plan to the working copy
    Apply {
        /// Change plan file (JSON), optionally listing the merge's issues
        plan: PathBuf,
        /// Print the plan without applying it
        #[arg(long)]
        dry_run: bool,
        /// Show the reason for each step
        #[arg(short, long)]
        verbose: bool,
    },
    /// Resolve conflict issues left by a merge
    Resolve {
        /// List unresolved issues
        #[arg(long, conflicts_with_all = ["listall", "mark", "markall"])]
        list: bool,
        /// List all issues, resolved or not
        #[arg(long, conflicts_with_all = ["mark", "markall"])]
        listall: bool,
        /// Mark the named issues resolved
        #[arg(long, conflicts_with = "markall")]
        mark: bool,
        /// Mark every unresolved issue resolved
        #[arg(long)]
        markall: bool,
        /// Items to act on (`@/...` repo paths or filesystem paths)
        paths: Vec<String>,
    },
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Apply {
            plan,
            dry_run,
            verbose,
        } => commands::apply::run(&plan, dry_run, verbose),
        Commands::Resolve {
            list,
            listall,
            mark,
            markall,
            paths,
        } => commands::resolve::run(list, listall, mark, markall, paths),
    }
}

fn main() -> ExitCode {
    // Respects RUST_LOG (e.g. RUST_LOG=tangle_core=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            if let Some(hint) = err
                .downcast_ref::<TangleError>()
                .and_then(TangleError::recovery_suggestion)
            {
                eprintln!("  {} {}", style("hint:").cyan(), hint);
            }
            ExitCode::FAILURE
        }
    }
}
