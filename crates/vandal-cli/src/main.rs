use std::{
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vandal_pre_processing::{
    EditRecord, FeatureRow, Preprocessor, ScorerParams,
    scorer::{DEFAULT_N_FOLDS, DEFAULT_RANDOM_SEED, DEFAULT_SMOOTHING},
    text::set_progress_visible,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "vandal-cli")]
#[command(about = "Engineer vandalism features for a table of edits", long_about = None)]
struct Cli {
    /// JSON array of labeled edit records (if not provided, reads from stdin)
    #[arg(value_name = "PATH")]
    input: Option<PathBuf>,

    /// Score this held-out JSON array with the scorer fitted on INPUT and print it instead
    #[arg(short, long, value_name = "PATH")]
    score: Option<PathBuf>,

    /// Laplace smoothing constant
    #[arg(long, default_value_t = DEFAULT_SMOOTHING)]
    smoothing: f64,

    /// Number of cross-validation folds
    #[arg(short = 'k', long, default_value_t = DEFAULT_N_FOLDS)]
    folds: usize,

    /// Seed for the stratified fold shuffle
    #[arg(long, default_value_t = DEFAULT_RANDOM_SEED)]
    seed: u64,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Quiet mode (errors only, no summary or progress bars)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    /// One JSON array
    Json,
    /// One JSON object per line
    Jsonl,
}

fn init_logging(cli: &Cli) {
    let default_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, true) => "debug",
        _ => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    set_progress_visible(!cli.quiet);

    let params = ScorerParams::new(cli.smoothing, cli.folds, cli.seed)
        .context("Invalid scorer configuration")?;
    let start = Instant::now();

    let records = read_records(cli.input.as_deref())?;
    let table = Preprocessor::new(params)
        .run(&records)
        .context("Failed to build the feature table")?;
    info!(elapsed = ?start.elapsed(), "Training table processed");

    if !cli.quiet {
        eprintln!(
            "rows: {}, dropped: {}, vocabulary: {}",
            records.len(),
            table.dropped,
            table.scorer.vocabulary().map_or(0, |vocab| vocab.len())
        );
    }

    let rows = match cli.score.as_deref() {
        Some(path) => {
            let held_out = read_records(Some(path))?;
            let rows = Preprocessor::run_held_out(&table.scorer, &held_out)
                .context("Failed to score held-out table")?;
            if !cli.quiet {
                eprintln!("held-out rows: {}, scored: {}", held_out.len(), rows.len());
            }
            rows
        }
        None => table.rows,
    };

    write_rows(&rows, cli.format)
}

/// Read a JSON array of edit records from `path`, or stdin when absent.
fn read_records(path: Option<&Path>) -> Result<Vec<EditRecord>> {
    let contents = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read from stdin")?;
            buffer
        }
    };
    serde_json::from_str(&contents).with_context(|| "Failed to parse JSON array of edit records")
}

fn write_rows(rows: &[FeatureRow], format: OutputFormat) -> Result<()> {
    let mut out = BufWriter::new(io::stdout().lock());
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut out, rows)?;
            writeln!(out)?;
        }
        OutputFormat::Jsonl => {
            for row in rows {
                serde_json::to_writer(&mut out, row)?;
                writeln!(out)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
