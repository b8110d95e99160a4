//! Per-file report pipeline
//!
//! extract -> sort -> render -> save, with output naming, conflict policy
//! and batch input expansion.

use attainment_core::{
    class_counts, sort_records, AttainmentConfig, Checkpoint, ConfigError, Progress,
    RenderError, ReportSummary,
};
use attainment_parser::{extract_file, ExtractError};
use attainment_render::AttainmentWorkbook;
use crate::diagnostics::OutcomeEmitter;
use clap::ValueEnum;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Suffix appended to the input stem to name its report
pub const REPORT_SUFFIX: &str = "_达成度报告";
const REPORT_EXTENSION: &str = "xlsx";
const INPUT_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "xlsm"];

// ============================================================================
// Errors
// ============================================================================

/// Why one input file produced no report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("cannot write {}: {source}", path.display())]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output already exists: {}", .0.display())]
    OutputExists(PathBuf),
}

// ============================================================================
// Output Paths
// ============================================================================

/// What to do when the report file already exists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ConflictPolicy {
    /// Replace the existing file
    Overwrite,
    /// Write to the first free `name_N.xlsx`
    #[default]
    Rename,
    /// Leave the existing file and skip the input
    Skip,
}

/// `{stem}_达成度报告.xlsx` in `output_dir`, or next to the input.
pub fn output_path_for(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{}{}.{}", stem, REPORT_SUFFIX, REPORT_EXTENSION);
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input
            .parent()
            .map_or_else(|| PathBuf::from(&file_name), |p| p.join(&file_name)),
    }
}

/// Apply the conflict policy to a planned output path.
pub fn resolve_output(path: PathBuf, policy: ConflictPolicy) -> Result<PathBuf, ReportError> {
    if !path.exists() {
        return Ok(path);
    }
    match policy {
        ConflictPolicy::Overwrite => Ok(path),
        ConflictPolicy::Skip => Err(ReportError::OutputExists(path)),
        ConflictPolicy::Rename => Ok(first_free_path(&path)),
    }
}

fn first_free_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    (1..)
        .map(|n| parent.join(format!("{}_{}{}", stem, n, extension)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

// ============================================================================
// Batch Inputs
// ============================================================================

fn is_gradebook(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    if name.starts_with('.') || name.starts_with("~$") {
        return false;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    // Earlier reports (including renamed `_N` copies) are outputs, not inputs
    if stem.contains(REPORT_SUFFIX) {
        return false;
    }
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| INPUT_EXTENSIONS.contains(&e.as_str()))
}

/// Expand directories into their gradebook files, in name order.
///
/// Files named explicitly are kept as given.
pub fn expand_inputs(inputs: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = fs::read_dir(input)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_gradebook(path))
            .collect();
        found.sort();
        debug!(dir = %input.display(), files = found.len(), "expanded input directory");
        files.extend(found);
    }
    Ok(files)
}

// ============================================================================
// Processing
// ============================================================================

/// Settings shared by every file of a run
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub config: AttainmentConfig,
    pub output_dir: Option<PathBuf>,
    pub on_conflict: ConflictPolicy,
    pub charts: bool,
}

impl RunOptions {
    pub fn new(config: AttainmentConfig) -> Self {
        Self {
            config,
            output_dir: None,
            on_conflict: ConflictPolicy::default(),
            charts: true,
        }
    }
}

/// Result of one input in a batch
#[derive(Debug)]
pub enum FileOutcome {
    Processed(ReportSummary),
    Skipped(PathBuf),
    Failed(ReportError),
}

impl FileOutcome {
    pub fn from_result(result: Result<ReportSummary, ReportError>) -> Self {
        match result {
            Ok(summary) => Self::Processed(summary),
            Err(ReportError::OutputExists(path)) => Self::Skipped(path),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Produce the attainment report for one gradebook.
pub fn process_file(
    input: &Path,
    options: &RunOptions,
    progress: &mut dyn Progress,
) -> Result<ReportSummary, ReportError> {
    options.config.validate()?;
    let planned = output_path_for(input, options.output_dir.as_deref());
    let output_file = resolve_output(planned, options.on_conflict)?;

    let extraction = extract_file(input, progress)?;
    let mut records = extraction.records;
    sort_records(&mut records);
    progress.report(&Checkpoint::Sorted);

    let mut renderer = AttainmentWorkbook::new(options.config.clone());
    if !options.charts {
        renderer = renderer.no_charts();
    }
    let bytes = renderer.render_with_progress(&records, progress)?;

    fs::write(&output_file, bytes).map_err(|source| ReportError::OutputUnwritable {
        path: output_file.clone(),
        source,
    })?;
    progress.report(&Checkpoint::Saved);

    info!(
        input = %input.display(),
        output = %output_file.display(),
        students = records.len(),
        "report written"
    );

    Ok(ReportSummary {
        total_students: records.len(),
        class_counts: class_counts(&records),
        output_file,
        warnings: extraction.warnings,
    })
}

/// Process every input independently, in order, handing each outcome to
/// `emitter` as soon as it is known.
pub fn run_batch(
    inputs: &[PathBuf],
    options: &RunOptions,
    progress: &mut dyn Progress,
    emitter: &mut dyn OutcomeEmitter,
) {
    for input in inputs {
        let outcome = FileOutcome::from_result(process_file(input, options, progress));
        emitter.emit(input, &outcome);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{OutputConfig, TerminalEmitter};
    use attainment_core::NoProgress;
    use pretty_assertions::assert_eq;

    #[test]
    fn report_name_next_to_input() {
        assert_eq!(
            output_path_for(Path::new("/data/软件2301.xlsx"), None),
            PathBuf::from("/data/软件2301_达成度报告.xlsx")
        );
        assert_eq!(
            output_path_for(Path::new("/data/成绩.xls"), Some(Path::new("/out"))),
            PathBuf::from("/out/成绩_达成度报告.xlsx")
        );
    }

    #[test]
    fn conflict_policies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a_达成度报告.xlsx");

        assert_eq!(
            resolve_output(path.clone(), ConflictPolicy::Skip).unwrap(),
            path
        );

        fs::write(&path, b"x").unwrap();
        fs::write(dir.path().join("a_达成度报告_1.xlsx"), b"x").unwrap();

        assert_eq!(
            resolve_output(path.clone(), ConflictPolicy::Overwrite).unwrap(),
            path
        );
        assert_eq!(
            resolve_output(path.clone(), ConflictPolicy::Rename).unwrap(),
            dir.path().join("a_达成度报告_2.xlsx")
        );
        assert!(matches!(
            resolve_output(path, ConflictPolicy::Skip),
            Err(ReportError::OutputExists(_))
        ));
    }

    #[test]
    fn directory_expansion_filters_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "b.xlsx",
            "a.xls",
            "c.XLSM",
            "~$b.xlsx",
            ".hidden.xlsx",
            "notes.txt",
            "a_达成度报告.xlsx",
            "a_达成度报告_1.xlsx",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.xlsx")).unwrap();

        let files = expand_inputs(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.xls", "b.xlsx", "c.XLSM"]);
    }

    #[test]
    fn explicit_files_kept_as_given() {
        let files = expand_inputs(&[PathBuf::from("missing.xlsx")]).unwrap();
        assert_eq!(files, vec![PathBuf::from("missing.xlsx")]);
    }

    #[test]
    fn invalid_config_rejected_before_reading() {
        let mut config = AttainmentConfig::default();
        config.expectation = 1.5;
        let err = process_file(
            Path::new("does-not-matter.xlsx"),
            &RunOptions::new(config),
            &mut NoProgress,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn missing_input_is_a_failure_not_a_skip() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = RunOptions::new(AttainmentConfig::default());
        options.output_dir = Some(dir.path().to_path_buf());

        let mut output = Vec::new();
        let mut emitter = TerminalEmitter::new(&mut output, OutputConfig::default());
        run_batch(
            &[dir.path().join("nope.xlsx")],
            &options,
            &mut NoProgress,
            &mut emitter,
        );
        assert_eq!(emitter.tally().failed, 1);
        assert_eq!(emitter.tally().skipped, 0);
    }
}
