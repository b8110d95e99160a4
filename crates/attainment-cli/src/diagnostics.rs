//! Batch outcome formatting for CLI output
//!
//! This module implements emitters for the per-file outcomes of a run:
//! - `TerminalEmitter`: one block per file plus a closing tally
//! - `JsonEmitter`: machine-readable JSON, one object per file
//!
//! ## Exit Code Semantics
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Success: no file failed (warnings and skipped files allowed) |
//! | 1 | Failure: at least one file failed, or the run was rejected up front |
//!
//! `--quiet` hides successful files and warnings but never changes the
//! exit code. `--format=json` has the same exit semantics as text.

use std::io::Write;
use std::path::Path;
use std::process;

use attainment_core::{SheetWarning, TARGET_COUNT};
use attainment_parser::SheetAnalysis;
use serde::Serialize;

use crate::pipeline::FileOutcome;

// ============================================================================
// Exit Code
// ============================================================================

/// Exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success: every input produced a report or was skipped
    Success = 0,
    /// Failure: one or more inputs failed
    Failure = 1,
}

impl ExitCode {
    /// Determine exit code from the number of failed files.
    pub fn from_failure_count(count: usize) -> Self {
        if count > 0 {
            ExitCode::Failure
        } else {
            ExitCode::Success
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code as u8)
    }
}

// ============================================================================
// Output Config
// ============================================================================

/// Configuration for outcome output
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Only show failures and the tally
    pub quiet: bool,
}

impl OutputConfig {
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

/// Files per outcome kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Tally {
    fn count(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Processed(_) => self.succeeded += 1,
            FileOutcome::Skipped(_) => self.skipped += 1,
            FileOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_failure_count(self.failed)
    }
}

/// Sink for per-file outcomes of a report run
pub trait OutcomeEmitter {
    fn emit(&mut self, input: &Path, outcome: &FileOutcome);

    /// Write anything buffered and return the run's exit code
    fn finish(&mut self) -> std::io::Result<ExitCode>;
}

// ============================================================================
// Terminal Output
// ============================================================================

/// Human-readable outcome lines
pub struct TerminalEmitter<W: Write> {
    writer: W,
    config: OutputConfig,
    tally: Tally,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, config: OutputConfig) -> Self {
        Self {
            writer,
            config,
            tally: Tally::default(),
        }
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    fn write_outcome(&mut self, input: &Path, outcome: &FileOutcome) -> std::io::Result<()> {
        let input = input.display();
        match outcome {
            FileOutcome::Processed(summary) => {
                if self.config.quiet {
                    return Ok(());
                }
                writeln!(
                    self.writer,
                    "ok: {} -> {} ({} students)",
                    input,
                    summary.output_file.display(),
                    summary.total_students
                )?;
                for (class, count) in &summary.class_counts {
                    let class = if class.is_empty() { "(未知班级)" } else { class };
                    writeln!(self.writer, "   {}: {}", class, count)?;
                }
                for warning in &summary.warnings {
                    writeln!(self.writer, "   = warning[{}]: {}", warning.code(), warning)?;
                }
            }
            FileOutcome::Skipped(existing) => {
                writeln!(
                    self.writer,
                    "skipped: {} ({} already exists)",
                    input,
                    existing.display()
                )?;
            }
            FileOutcome::Failed(err) => {
                writeln!(self.writer, "error: {}: {}", input, err)?;
            }
        }
        Ok(())
    }
}

impl<W: Write> OutcomeEmitter for TerminalEmitter<W> {
    fn emit(&mut self, input: &Path, outcome: &FileOutcome) {
        self.tally.count(outcome);
        // Ignore write errors in emit (stdout may be closed)
        let _ = self.write_outcome(input, outcome);
    }

    fn finish(&mut self) -> std::io::Result<ExitCode> {
        writeln!(
            self.writer,
            "{} succeeded, {} failed, {} skipped",
            self.tally.succeeded, self.tally.failed, self.tally.skipped
        )?;
        self.writer.flush()?;
        Ok(self.tally.exit_code())
    }
}

// ============================================================================
// JSON Output
// ============================================================================

/// JSON representation of one file's outcome
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JsonOutcome {
    Processed {
        input: String,
        output: String,
        total_students: usize,
        class_counts: std::collections::BTreeMap<String, usize>,
        warnings: Vec<JsonWarning>,
    },
    Skipped {
        input: String,
        existing: String,
    },
    Failed {
        input: String,
        error: String,
    },
}

/// JSON representation of a sheet warning
#[derive(Debug, Serialize)]
pub struct JsonWarning {
    pub code: String,
    pub sheet: String,
    pub message: String,
}

impl From<&SheetWarning> for JsonWarning {
    fn from(warning: &SheetWarning) -> Self {
        Self {
            code: warning.code().to_string(),
            sheet: warning.sheet().to_string(),
            message: warning.to_string(),
        }
    }
}

#[derive(Serialize)]
struct JsonRun<'a> {
    files: &'a [JsonOutcome],
    summary: Tally,
}

/// Collects outcomes and writes a single JSON document on finish
pub struct JsonEmitter<W: Write> {
    writer: W,
    outcomes: Vec<JsonOutcome>,
    tally: Tally,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            outcomes: Vec::new(),
            tally: Tally::default(),
        }
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(JsonRun {
            files: &self.outcomes,
            summary: self.tally,
        })
        .unwrap_or(serde_json::Value::Null)
    }
}

impl<W: Write> OutcomeEmitter for JsonEmitter<W> {
    fn emit(&mut self, input: &Path, outcome: &FileOutcome) {
        self.tally.count(outcome);
        let input = input.display().to_string();
        let json = match outcome {
            FileOutcome::Processed(summary) => JsonOutcome::Processed {
                input,
                output: summary.output_file.display().to_string(),
                total_students: summary.total_students,
                class_counts: summary.class_counts.clone(),
                warnings: summary.warnings.iter().map(JsonWarning::from).collect(),
            },
            FileOutcome::Skipped(existing) => JsonOutcome::Skipped {
                input,
                existing: existing.display().to_string(),
            },
            FileOutcome::Failed(err) => JsonOutcome::Failed {
                input,
                error: err.to_string(),
            },
        };
        self.outcomes.push(json);
    }

    fn finish(&mut self) -> std::io::Result<ExitCode> {
        let value = self.to_json_value();
        serde_json::to_writer_pretty(&mut self.writer, &value)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(self.tally.exit_code())
    }
}

// ============================================================================
// Inspect Output
// ============================================================================

/// Write the detection result of every sheet in human-readable form.
pub fn write_inspection<W: Write>(
    writer: &mut W,
    path: &str,
    sheets: &[SheetAnalysis],
) -> std::io::Result<()> {
    writeln!(writer, "{}", path)?;
    for sheet in sheets {
        if sheet.skipped {
            writeln!(writer, "  sheet '{}': skipped", sheet.sheet)?;
        } else {
            writeln!(writer, "  sheet '{}': {} students", sheet.sheet, sheet.students)?;
        }
        if let Some(label) = &sheet.class_label {
            writeln!(writer, "    class: {} (from {})", label.label, label.source)?;
        }
        if let Some(row) = sheet.header_row {
            writeln!(writer, "    header row: {}", row + 1)?;
        }
        for group in &sheet.groups {
            let class = group
                .class_col
                .map(|c| format!(", class {}", attainment_core::column_letter(c)))
                .unwrap_or_default();
            writeln!(
                writer,
                "    group: id {}, name {}, regular {}, final {}, total {}{}",
                attainment_core::column_letter(group.student_id),
                attainment_core::column_letter(group.name),
                attainment_core::column_letter(group.regular_score),
                attainment_core::column_letter(group.final_score),
                attainment_core::column_letter(group.total_score),
                class
            )?;
        }
        for warning in &sheet.warnings {
            writeln!(writer, "    = warning[{}]: {}", warning.code(), warning)?;
        }
    }
    Ok(())
}

/// Targets shown in the run header: `50/30/20`
pub fn format_weights(weights: &[i32; TARGET_COUNT]) -> String {
    weights
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}
