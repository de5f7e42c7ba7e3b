//! Render a single synthdef in one of several formats.

use clap::{Args, ValueEnum};
use serde::Deserialize;
use std::io::Write;
use std::path::PathBuf;
use syndef_core::{export, load_synthdef, render};

use crate::config::Config;

/// Output formats for `syndef format`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// SuperCollider-style JSON
    #[default]
    Json,
    /// Graphviz digraph
    Dot,
    /// XML document
    Xml,
    /// Box-drawing tree from the root ugen
    Tree,
}

#[derive(Args)]
pub struct FormatArgs {
    /// Synthdef file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output format (overrides config)
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Definition to print when the file holds several (defaults to the first)
    #[arg(long, value_name = "NAME")]
    def: Option<String>,
}

pub fn run(args: FormatArgs, config: &Config) -> anyhow::Result<()> {
    let def = load_synthdef(&args.file, args.def.as_deref())?;
    let output = args.output.unwrap_or(config.format.output);
    tracing::debug!(?output, name = %def.name, "formatting synthdef");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match output {
        OutputFormat::Json => export::write_json(&def, &mut out)?,
        OutputFormat::Dot => export::write_dot(&def, &mut out)?,
        OutputFormat::Xml => export::write_xml(&def, &mut out)?,
        OutputFormat::Tree => {
            for line in render(&def.graph, def.graph.root())? {
                writeln!(out, "{line}")?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
