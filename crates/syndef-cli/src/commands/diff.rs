//! Structural diff of two synthdef files.

use clap::Args;
use std::path::PathBuf;
use syndef_core::{DiffEntry, load_synthdef};

use crate::config::Config;

#[derive(Args)]
pub struct DiffArgs {
    /// First synthdef file
    #[arg(value_name = "A")]
    a: PathBuf,

    /// Second synthdef file
    #[arg(value_name = "B")]
    b: PathBuf,

    /// Definition to compare when a file holds several (defaults to the first)
    #[arg(long, value_name = "NAME")]
    def: Option<String>,

    /// Column width (overrides config)
    #[arg(long)]
    width: Option<usize>,
}

pub fn run(args: DiffArgs, config: &Config) -> anyhow::Result<()> {
    let a = load_synthdef(&args.a, args.def.as_deref())?;
    let b = load_synthdef(&args.b, args.def.as_deref())?;

    let diffs = syndef_core::diff(&a.graph, &b.graph)?;
    tracing::info!(entries = diffs.len(), "diff complete");

    let width = args.width.unwrap_or(config.diff.column_width);
    print!(
        "{}",
        format_table(
            &args.a.display().to_string(),
            &args.b.display().to_string(),
            &diffs,
            width
        )
    );
    Ok(())
}

/// Lays out a header row plus one row per entry, each column left-aligned
/// and padded to `width`.
fn format_table(a: &str, b: &str, diffs: &[DiffEntry], width: usize) -> String {
    let mut out = format!("{a:<width$}{b:<width$}\n");
    for entry in diffs {
        out.push_str(&format!(
            "{:<width$}{:<width$}\n",
            entry.left,
            entry.right,
            width = width
        ));
    }
    out
}
