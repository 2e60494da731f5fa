use std::io::{stderr, stdout, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use beanimport_import::config::DEFAULT_PATH;
use beanimport_import::{Config, Extraction, FailurePolicy, Importers};

#[derive(Parser)]
#[command(name = "bean-import", version)]
#[command(about = "Turn bank and card exports into beancount transactions", long_about = None)]
struct Cli {
    /// Configuration file with a [beancount-importer] table
    #[arg(short, long, default_value = DEFAULT_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List which importer recognises each file
    Identify {
        /// Files or directories (walked recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the transactions found in each recognised file
    Extract {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Emit JSON instead of beancount text
        #[arg(long)]
        json: bool,

        /// Report failing files and continue with the rest
        #[arg(long)]
        keep_going: bool,
    },
}

fn main() -> ExitCode {
    setup_logging();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging() {
    // Ledger text goes to stdout; keep logs out of it.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let importers = config.build().context("building importers")?;
    debug!(importers = importers.len(), "configured");

    let mut out = BufWriter::new(stdout().lock());
    let code = match cli.command {
        Command::Identify { paths } => {
            identify(&importers, &collect_files(&paths)?, &mut out)?;
            ExitCode::SUCCESS
        }
        Command::Extract {
            paths,
            json,
            keep_going,
        } => {
            let policy = if keep_going {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Abort
            };
            let extraction = importers.extract_all(&collect_files(&paths)?, policy)?;
            if json {
                write_json(&extraction, &mut out)?;
            } else {
                write_ledger(&extraction, &mut out)?;
            }
            for failure in &extraction.failed {
                eprintln!("Failed: {failure}");
            }
            if extraction.failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    };
    out.flush()?;
    Ok(code)
}

/// Expands directories into the files below them, sorted by path.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        walk(path, &mut files)?;
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk(path: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let metadata =
        std::fs::metadata(path).with_context(|| format!("reading {}", path.display()))?;
    if !metadata.is_dir() {
        files.push(path.to_path_buf());
        return Ok(());
    }
    for entry in std::fs::read_dir(path).with_context(|| format!("listing {}", path.display()))? {
        walk(&entry?.path(), files)?;
    }
    Ok(())
}

fn identify<W: Write>(importers: &Importers, files: &[PathBuf], out: &mut W) -> Result<()> {
    for file in files {
        for importer in importers.identify(file) {
            writeln!(out, "{}: {}", file.display(), importer.name())?;
        }
    }
    Ok(())
}

fn write_ledger<W: Write>(extraction: &Extraction, out: &mut W) -> Result<()> {
    for extracted in &extraction.extracted {
        writeln!(out, ";; {}", extracted.path.display())?;
        writeln!(out)?;
        for tx in &extracted.transactions {
            writeln!(out, "{tx}")?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_json<W: Write>(extraction: &Extraction, out: &mut W) -> Result<()> {
    let files: Vec<serde_json::Value> = extraction
        .extracted
        .iter()
        .map(|e| {
            serde_json::json!({
                "file": e.path.display().to_string(),
                "importer": e.importer,
                "account": e.account,
                "transactions": e.transactions,
            })
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &files)?;
    writeln!(out)?;
    Ok(())
}
