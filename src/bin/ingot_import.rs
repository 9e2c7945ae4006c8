//! ingot-import: Turn a JSON document into a PostgreSQL import script
//!
//! Usage:
//!   # Read from file, write SQL to stdout
//!   ingot-import data.json
//!
//!   # Read from stdin, reconcile against an existing schema
//!   cat data.json | ingot-import --existing schema.json --schema app
//!
//!   # Emit the statement list as JSON and dump the normalized tables
//!   ingot-import data.json --format json --tables-dir ./tables

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ingot::normalize::RowIdMode;
use ingot::{
    import_value, parse_document_bytes, read_input, ExistingTableSchema, ImportConfig,
    NormalizationStrategy, ScriptWriter, TableWriter,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Annotated SQL script
    Sql,
    /// JSON array of statements
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    Partial,
    Full,
    Custom,
}

impl From<Strategy> for NormalizationStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Partial => NormalizationStrategy::Partial,
            Strategy::Full => NormalizationStrategy::Full,
            Strategy::Custom => NormalizationStrategy::Custom,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ingot-import")]
#[command(about = "Turn a JSON document into a PostgreSQL import script", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// JSON config file; flags below override its values
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// JSON array of existing tables to reconcile against
    #[arg(long)]
    existing: Option<String>,

    /// Target database schema (default: public)
    #[arg(long)]
    schema: Option<String>,

    /// Table name for the document root (default: root)
    #[arg(long)]
    root: Option<String>,

    /// How nested objects become tables (default: partial)
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Dotted path of a nested object to promote to a table; implies --strategy custom
    #[arg(long = "table-path", value_name = "PATH")]
    table_paths: Vec<String>,

    /// Maximum nesting depth to split into tables (default: 10)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Mint random UUIDs instead of sequential row ids
    #[arg(long)]
    uuid_row_ids: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "sql")]
    format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<String>,

    /// Also write each normalized table to <DIR>/<table>.jsonl
    #[arg(long, value_name = "DIR")]
    tables_dir: Option<String>,

    /// Don't wrap the script in BEGIN/COMMIT
    #[arg(long)]
    no_transaction: bool,

    /// Create indexes on suggested columns of new tables
    #[arg(long)]
    create_indexes: bool,

    /// Write NULL when a value can't be cast to an existing column's type
    #[arg(long)]
    null_on_cast_failure: bool,

    /// Compact JSON output (no pretty-printing)
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

    let config = build_config(&args)?;

    let existing: Vec<ExistingTableSchema> = match &args.existing {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read existing schema: {}", path))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid existing schema: {}", path))?
        }
        None => Vec::new(),
    };

    let content = read_input(args.input.as_deref().map(Path::new)).with_context(|| {
        format!("Failed to read input: {}", args.input.as_deref().unwrap_or("stdin"))
    })?;
    let data = parse_document_bytes(&content).context("Failed to parse input document")?;
    let plan = import_value(&data, &existing, &config)?;

    if let Some(dir) = &args.tables_dir {
        let paths = TableWriter::new(dir)?.write_tables(&plan.normalized.tables)?;
        info!(files = paths.len(), dir = %dir, "Wrote normalized tables");
    }

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create output: {}", path))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    let mut writer = ScriptWriter::new(BufWriter::new(sink));
    match args.format {
        OutputFormat::Sql => writer.write_script(&plan.statements)?,
        OutputFormat::Json => writer.write_json(&plan.statements, !args.compact)?,
    }
    writer.flush()?;

    Ok(())
}

/// Config file values, overridden by flags
fn build_config(args: &Args) -> Result<ImportConfig> {
    let mut config = match &args.config {
        Some(path) => ImportConfig::from_path(path)?,
        None => ImportConfig::default(),
    };

    if let Some(schema) = &args.schema {
        config.schema = schema.clone();
    }
    if let Some(root) = &args.root {
        config.root_table_name = root.clone();
    }
    if let Some(strategy) = args.strategy {
        config.normalization.strategy = strategy.into();
    }
    if !args.table_paths.is_empty() {
        config.normalization = config
            .normalization
            .with_custom_paths(args.table_paths.iter().cloned());
    }
    if let Some(depth) = args.max_depth {
        config.normalization.max_depth = depth;
    }
    if args.uuid_row_ids {
        config.normalization.row_ids = RowIdMode::Uuid;
    }
    if args.no_transaction {
        config.generation.wrap_in_transaction = false;
    }
    if args.create_indexes {
        config.generation.create_indexes = true;
    }
    if args.null_on_cast_failure {
        config.generation.null_on_cast_failure = true;
    }

    Ok(config)
}
