//! amide command-line entry point
//!
//! Run with:
//! ```bash
//! amide preprocess data.csv chimera/preprocess.json
//! amide analyze --config run.toml --start 0 --end 2000
//! amide plddt rows.csv alphafold_models/ plddt.csv
//! ```

use std::path::PathBuf;

use amide_batch::{RowRange, RunConfig, RunReport};
use amide_io::PreprocessOptions;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "amide")]
#[command(about = "Side-chain geometry of Asn/Gln residues over record tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a spreadsheet CSV export into a record table
    Preprocess {
        /// CSV export of the spreadsheet
        input: PathBuf,
        /// Record table to write
        output: PathBuf,
        /// Keep columns without a header
        #[arg(long)]
        keep_unnamed: bool,
        /// Field delimiter
        #[arg(long, default_value_t = ',')]
        delimiter: char,
        /// Extra column to keep as text (repeatable)
        #[arg(long = "text-column", value_name = "COLUMN")]
        text_columns: Vec<String>,
    },
    /// Run a configured batch against the structure host
    Analyze {
        /// Run configuration TOML file
        #[arg(short, long)]
        config: PathBuf,
        /// First row ordinal, overriding `[run].start`
        #[arg(long)]
        start: Option<usize>,
        /// End row ordinal (exclusive), overriding `[run].end`
        #[arg(long)]
        end: Option<usize>,
    },
    /// Extract predicted-model confidence for table rows
    Plddt {
        /// CSV with `uniprot_id` and `aa_position` columns
        rows: PathBuf,
        /// Directory holding the predicted model mmCIF files
        model_dir: PathBuf,
        /// CSV to write
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Preprocess {
            input,
            output,
            keep_unnamed,
            delimiter,
            text_columns,
        } => preprocess(input, output, keep_unnamed, delimiter, text_columns),
        Commands::Analyze { config, start, end } => analyze(config, start, end),
        Commands::Plddt {
            rows,
            model_dir,
            output,
        } => plddt(rows, model_dir, output),
    }
}

fn preprocess(
    input: PathBuf,
    output: PathBuf,
    keep_unnamed: bool,
    delimiter: char,
    text_columns: Vec<String>,
) -> Result<()> {
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("delimiter {:?} is not a single ASCII character", delimiter))?;
    let mut options = PreprocessOptions {
        drop_unnamed: !keep_unnamed,
        delimiter,
        ..PreprocessOptions::default()
    };
    options.text_columns.extend(text_columns);

    let table = amide_io::table_from_csv(&input, &options)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    table
        .write(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    log::info!(
        "Wrote {} columns to {}",
        table.column_count(),
        output.display()
    );
    Ok(())
}

fn analyze(config_path: PathBuf, start: Option<usize>, end: Option<usize>) -> Result<()> {
    let mut config = RunConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if start.is_some() || end.is_some() {
        config.run = RowRange::new(start.or(config.run.start), end.or(config.run.end));
        config.validate()?;
    }

    let report = run_with_host(&config)?;
    log::info!(
        "{}: {} rows, {} populated, {} failed, {} errors logged",
        config.mode.name(),
        report.processed(),
        report.populated(),
        report.failed(),
        report.errors.len()
    );
    Ok(())
}

#[cfg(unix)]
fn run_with_host(config: &RunConfig) -> Result<RunReport> {
    use amide_host::GeometryEngine;

    let mut session = amide_host::HostSession::connect(&config.host)
        .context("Failed to connect to the structure host")?;
    let report = amide_batch::run_files(&mut session, config)?;
    if let Err(e) = session.close_all() {
        log::warn!("Failed to close remaining models: {}", e);
    }
    Ok(report)
}

#[cfg(not(unix))]
fn run_with_host(_config: &RunConfig) -> Result<RunReport> {
    anyhow::bail!("the structure host connection needs Unix domain sockets")
}

fn plddt(rows: PathBuf, model_dir: PathBuf, output: PathBuf) -> Result<()> {
    let collected = amide_io::plddt::collect_plddt(&rows, &model_dir)
        .with_context(|| format!("Failed to read {}", rows.display()))?;
    amide_io::plddt::write_plddt_csv(&collected, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    let high = collected.iter().filter(|r| r.is_high_confidence()).count();
    log::info!(
        "Wrote {} rows ({} high confidence) to {}",
        collected.len(),
        high,
        output.display()
    );
    Ok(())
}
