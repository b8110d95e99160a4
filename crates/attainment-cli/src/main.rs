//! attainment CLI
//!
//! Command-line interface for generating course-target attainment reports
//! from gradebook workbooks.

mod diagnostics;
mod pipeline;
mod settings;

use anyhow::{bail, Context, Result};
use attainment_core::{Checkpoint, TARGET_COUNT};
use attainment_parser::analyze_file;
use clap::{Parser, Subcommand, ValueEnum};
use diagnostics::{
    format_weights, write_inspection, ExitCode, JsonEmitter, OutcomeEmitter, OutputConfig,
    TerminalEmitter,
};
use pipeline::{expand_inputs, run_batch, ConflictPolicy, RunOptions};
use settings::{load_config, parse_weights, ConfigOverrides};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "attainment")]
#[command(author, version, about = "Course-target attainment reports from gradebooks", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an attainment report for each gradebook
    Report {
        /// Gradebook files or directories containing them
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for the reports (default: next to each input)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// TOML file with target_weights, score_weights and expectation
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Target weights in percent, e.g. 50,30,20
        #[arg(long, value_name = "W1,W2,W3", value_parser = parse_weights::<TARGET_COUNT>)]
        targets: Option<[i32; TARGET_COUNT]>,

        /// Regular/final score weights in percent, e.g. 30,70
        #[arg(long, value_name = "REGULAR,FINAL", value_parser = parse_weights::<2>)]
        score_weights: Option<[i32; 2]>,

        /// Expected attainment drawn as the reference line, in [0, 1]
        #[arg(long, value_name = "VALUE")]
        expectation: Option<f64>,

        /// What to do when a report file already exists
        #[arg(long, value_enum, default_value_t = ConflictPolicy::Rename)]
        on_conflict: ConflictPolicy,

        /// Write formulas and tables only
        #[arg(long)]
        no_charts: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Only print failures and the final tally (text format)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show how a gradebook's sheets are detected, without writing a report
    Inspect {
        /// Gradebook file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Report {
            inputs,
            output_dir,
            config,
            targets,
            score_weights,
            expectation,
            on_conflict,
            no_charts,
            format,
            quiet,
        } => {
            let overrides = ConfigOverrides {
                targets,
                score_weights,
                expectation,
            };
            let output = if quiet {
                OutputConfig::quiet()
            } else {
                OutputConfig::default()
            };
            cmd_report(
                &inputs,
                output_dir,
                config,
                &overrides,
                on_conflict,
                !no_charts,
                format,
                output,
            )
        }
        Commands::Inspect { file, format } => cmd_inspect(&file, format),
    };

    match result {
        Ok(code) => code.into(),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::Failure.into()
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_report(
    inputs: &[PathBuf],
    output_dir: Option<PathBuf>,
    config_file: Option<PathBuf>,
    overrides: &ConfigOverrides,
    on_conflict: ConflictPolicy,
    charts: bool,
    format: OutputFormat,
    output: OutputConfig,
) -> Result<ExitCode> {
    let config = load_config(config_file.as_deref(), overrides)?;
    info!(
        targets = %format_weights(&config.target_weights),
        regular = config.score_weights.regular,
        final_exam = config.score_weights.final_exam,
        expectation = config.expectation,
        "configuration loaded"
    );

    if let Some(dir) = &output_dir {
        if !dir.exists() {
            bail!("output directory does not exist: {}", dir.display());
        }
        if !dir.is_dir() {
            bail!("output path is not a directory: {}", dir.display());
        }
    }

    let files = expand_inputs(inputs).context("failed to list input directory")?;
    if files.is_empty() {
        bail!("no gradebook files found");
    }

    let options = RunOptions {
        config,
        output_dir,
        on_conflict,
        charts,
    };
    let mut progress = |checkpoint: &Checkpoint| {
        debug!(percent = checkpoint.percent(), "{}", checkpoint);
    };

    let stdout = std::io::stdout();
    let mut emitter: Box<dyn OutcomeEmitter> = match format {
        OutputFormat::Text => Box::new(TerminalEmitter::new(stdout.lock(), output)),
        OutputFormat::Json => Box::new(JsonEmitter::new(stdout.lock())),
    };
    run_batch(&files, &options, &mut progress, emitter.as_mut());
    Ok(emitter.finish()?)
}

fn cmd_inspect(file: &Path, format: OutputFormat) -> Result<ExitCode> {
    let sheets = analyze_file(file)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => write_inspection(&mut out, &file.display().to_string(), &sheets)?,
        OutputFormat::Json => {
            let value = serde_json::json!({
                "file": file.display().to_string(),
                "sheets": sheets,
            });
            serde_json::to_writer_pretty(&mut out, &value)?;
            writeln!(out)?;
        }
    }
    let students: usize = sheets.iter().map(|s| s.students).sum();
    Ok(ExitCode::from_failure_count(usize::from(students == 0)))
}
