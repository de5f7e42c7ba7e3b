//! syndef CLI - inspect and structurally diff SuperCollider synthdef files.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "syndef")]
#[command(author, version, about = "Synthdef inspection and diff tool", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/syndef/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report structural differences between two synthdef files
    Diff(commands::diff::DiffArgs),

    /// Print a synthdef as JSON, Graphviz, XML or a tree
    Format(commands::format::FormatArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "resolved config");

    match cli.command {
        Commands::Diff(args) => commands::diff::run(args, &config),
        Commands::Format(args) => commands::format::run(args, &config),
    }
}
