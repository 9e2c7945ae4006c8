//! ingot-analyze: Describe the nested objects and arrays of a JSON document
//!
//! The object paths it reports are what `ingot-import --table-path` accepts.
//!
//! Usage:
//!   # Read from file, print the structure tree
//!   ingot-analyze data.json
//!
//!   # Read from stdin, list nested object paths only
//!   cat data.json | ingot-analyze --paths

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use ingot::structure::{analyze_json_structure, object_paths};
use ingot::{parse_document_bytes, read_input};
use std::path::Path;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ingot-analyze")]
#[command(about = "Describe the nested structure of a JSON document", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Print nested object paths, one per line
    #[arg(long)]
    paths: bool,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let content = read_input(args.input.as_deref().map(Path::new)).with_context(|| {
        format!("Failed to read input: {}", args.input.as_deref().unwrap_or("stdin"))
    })?;

    let data = parse_document_bytes(&content).context("Failed to parse input document")?;
    let nodes = analyze_json_structure(&data, "", 0);
    debug!(nodes = nodes.len(), "Analyzed document");

    if nodes.is_empty() {
        warn!("No nested objects or arrays found in input");
    }

    if args.paths {
        for path in object_paths(&nodes) {
            println!("{}", path);
        }
        return Ok(());
    }

    let output = if args.compact {
        serde_json::to_string(&nodes)?
    } else {
        serde_json::to_string_pretty(&nodes)?
    };
    println!("{}", output);

    Ok(())
}
