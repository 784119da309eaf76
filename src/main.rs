//! CLI driver: analyze JSON-serialized program snapshots.
//!
//! The snapshot format is the serde form of [`logsafe::ir::Program`]; a
//! host frontend (or a test fixture) writes it, `logsafe check` reads it,
//! runs the safety analysis, and renders the findings.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use logsafe::config::{AnalysisConfig, MissingSymbols};
use logsafe::error::LogsafeError;
use logsafe::ir::Program;
use logsafe::report::{render_text, to_json, OutputFormat, ReportSummary};
use logsafe::safety::analyze_program;

/// logsafe: log-safety lattice classifier.
///
/// Classifies every expression of a resolved program snapshot into
/// SAFE / DO_NOT_LOG / UNSAFE and reports each flow of a sensitive
/// value into a sink that does not tolerate it.
///
/// Quick start:
///   logsafe check snapshot.json             Analyze a snapshot
///   logsafe check a.json b.json --lenient   Tolerate unresolved refs
///   logsafe check snapshot.json --format json
#[derive(Parser, Debug)]
#[command(name = "logsafe")]
#[command(version)]
#[command(about = "Log-safety lattice classifier", long_about = None)]
struct Cli {
    /// Enable debug logging (sets log level to DEBUG).
    #[arg(short, long, global = true)]
    debug: bool,

    /// Suppress all output; only the exit code reports the outcome.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one or more JSON program snapshots.
    Check {
        /// Snapshot files (JSON-serialized programs).
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,

        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Tolerate unresolved references (classify them SAFE) instead
        /// of failing the affected unit.
        #[arg(long)]
        lenient: bool,

        /// Path to a logsafe.toml config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    match run(&cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("logsafe: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<i32, LogsafeError> {
    match &cli.command {
        Commands::Check {
            snapshots,
            format,
            lenient,
            config,
        } => {
            let mut analysis_config = match config {
                Some(path) => AnalysisConfig::from_toml_path(path)?,
                None => AnalysisConfig::default(),
            };
            if *lenient {
                analysis_config.missing_symbols = MissingSymbols::Lenient;
            }

            let mut reports = Vec::new();
            for path in snapshots {
                let text =
                    std::fs::read_to_string(path).map_err(|source| LogsafeError::FileRead {
                        path: path.clone(),
                        source,
                    })?;
                let program: Program =
                    serde_json::from_str(&text).map_err(|source| LogsafeError::Snapshot {
                        path: path.clone(),
                        source,
                    })?;
                reports.extend(analyze_program(&program, &analysis_config)?);
            }

            if !cli.quiet {
                match format {
                    OutputFormat::Json => println!("{}", to_json(&reports)?),
                    OutputFormat::Text => print!("{}", render_text(&reports)),
                }
            }
            Ok(ReportSummary::of(&reports).exit_code())
        }
    }
}
