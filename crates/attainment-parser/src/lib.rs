//! # attainment-parser
//!
//! Schema inference for loosely structured gradebook workbooks.
//!
//! This crate provides:
//! - A cell grid view over each worksheet (`grid`)
//! - Class-identity resolution from banners, sheet names and file names (`identity`)
//! - Header row and column-group detection (`header`)
//! - Row classification into student records (`rows`)
//!
//! ## Example
//!
//! ```rust
//! use attainment_core::NoProgress;
//! use attainment_parser::grid::{Cell, Grid};
//! use attainment_parser::{extract_sheets, SheetSource};
//!
//! let grid = Grid::from_rows(vec![
//!     vec![Cell::from("行政班：软件2301")],
//!     vec![Cell::from("学号"), Cell::from("姓名"), Cell::from("平时成绩"),
//!          Cell::from("期末成绩"), Cell::from("总成绩")],
//!     vec![Cell::from("2023001"), Cell::from("张三"), Cell::from(80.0),
//!          Cell::from(90.0), Cell::from(87.0)],
//! ]);
//! let sources = vec![SheetSource::new("成绩", grid)];
//! let extraction = extract_sheets("gradebook", sources, &mut NoProgress);
//! assert_eq!(extraction.records.len(), 1);
//! assert_eq!(extraction.records[0].class_name, "软件2301");
//! ```

pub mod grid;
pub mod header;
pub mod identity;
pub mod rows;

use attainment_core::{
    column_letter, Checkpoint, ColumnMapping, Progress, SheetWarning, StudentRecord,
};
use calamine::{open_workbook_auto, Reader};
use grid::Grid;
use identity::ClassLabel;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default name of a fresh worksheet; such sheets are skipped when others exist.
pub const PLACEHOLDER_SHEET: &str = "Sheet1";

// ============================================================================
// Errors
// ============================================================================

/// File-level extraction failure
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open {} as a workbook: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    #[error("no student rows found{}", warning_suffix(.warnings))]
    NoStudents { warnings: Vec<SheetWarning> },
}

fn warning_suffix(warnings: &[SheetWarning]) -> String {
    if warnings.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = warnings.iter().map(|w| format!("  - {}", w)).collect();
    format!(":\n{}", lines.join("\n"))
}

// ============================================================================
// Sources and Results
// ============================================================================

/// One worksheet as read from disk; `grid` is the decode error when the
/// sheet could not be read.
#[derive(Clone, Debug)]
pub struct SheetSource {
    pub name: String,
    pub grid: Result<Grid, String>,
}

impl SheetSource {
    pub fn new(name: impl Into<String>, grid: Grid) -> Self {
        Self {
            name: name.into(),
            grid: Ok(grid),
        }
    }
}

/// Records and warnings from one workbook, in sheet order
#[derive(Clone, Debug, Default)]
pub struct Extraction {
    pub records: Vec<StudentRecord>,
    pub warnings: Vec<SheetWarning>,
}

/// What detection found on one sheet
#[derive(Clone, Debug, Serialize)]
pub struct SheetAnalysis {
    pub sheet: String,
    pub skipped: bool,
    pub class_label: Option<ClassLabel>,
    /// Zero-based header row
    pub header_row: Option<usize>,
    pub groups: Vec<ColumnMapping>,
    pub class_columns: Vec<usize>,
    pub students: usize,
    pub warnings: Vec<SheetWarning>,
}

impl SheetAnalysis {
    fn skipped(sheet: &str, warning: SheetWarning) -> Self {
        Self {
            sheet: sheet.to_string(),
            skipped: true,
            class_label: None,
            header_row: None,
            groups: Vec::new(),
            class_columns: Vec::new(),
            students: 0,
            warnings: vec![warning],
        }
    }
}

// ============================================================================
// Reading
// ============================================================================

/// Read every sheet of the workbook at `path`.
pub fn read_workbook(path: &Path) -> Result<Vec<SheetSource>, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }
    File::open(path).map_err(|source| ExtractError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut workbook = open_workbook_auto(path).map_err(|e| ExtractError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let names = workbook.sheet_names().to_vec();
    let sources = names
        .into_iter()
        .map(|name| {
            let grid = workbook
                .worksheet_range(&name)
                .map(|range| Grid::from_range(&range))
                .map_err(|e| e.to_string());
            SheetSource { name, grid }
        })
        .collect();
    Ok(sources)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract student records from the workbook at `path`.
///
/// Fails when the file cannot be opened or no sheet yields a student.
pub fn extract_file(path: &Path, progress: &mut dyn Progress) -> Result<Extraction, ExtractError> {
    let sources = read_workbook(path)?;
    progress.report(&Checkpoint::FileRead);

    let extraction = extract_sheets(&file_stem(path), sources, progress);
    if extraction.records.is_empty() {
        return Err(ExtractError::NoStudents {
            warnings: extraction.warnings,
        });
    }
    info!(
        file = %path.display(),
        students = extraction.records.len(),
        warnings = extraction.warnings.len(),
        "extracted student records"
    );
    Ok(extraction)
}

/// Extract records from already-read sheets. `file_stem` is the input file
/// name without extension, used as the last class-label fallback.
pub fn extract_sheets(
    file_stem: &str,
    sources: Vec<SheetSource>,
    progress: &mut dyn Progress,
) -> Extraction {
    let total = sources.len();
    let mut extraction = Extraction::default();

    for (index, source) in sources.iter().enumerate() {
        let (analysis, records) = scan_sheet(source, file_stem, total);
        extraction.records.extend(records);
        extraction.warnings.extend(analysis.warnings);
        progress.report(&Checkpoint::SheetProcessed {
            sheet: source.name.clone(),
            done: index + 1,
            total,
        });
    }
    extraction
}

/// Run detection over every sheet without keeping the records.
pub fn analyze_file(path: &Path) -> Result<Vec<SheetAnalysis>, ExtractError> {
    let sources = read_workbook(path)?;
    let stem = file_stem(path);
    let total = sources.len();
    Ok(sources
        .iter()
        .map(|source| scan_sheet(source, &stem, total).0)
        .collect())
}

fn record_warning(warnings: &mut Vec<SheetWarning>, warning: SheetWarning) {
    warn!("{}", warning);
    warnings.push(warning);
}

fn scan_sheet(
    source: &SheetSource,
    file_stem: &str,
    sheet_count: usize,
) -> (SheetAnalysis, Vec<StudentRecord>) {
    let sheet = source.name.as_str();

    if sheet == PLACEHOLDER_SHEET && sheet_count > 1 {
        let warning = SheetWarning::PlaceholderSkipped {
            sheet: sheet.to_string(),
        };
        warn!("{}", warning);
        return (SheetAnalysis::skipped(sheet, warning), Vec::new());
    }

    let grid = match &source.grid {
        Ok(grid) => grid,
        Err(message) => {
            let warning = SheetWarning::Unreadable {
                sheet: sheet.to_string(),
                message: message.clone(),
            };
            warn!("{}", warning);
            return (SheetAnalysis::skipped(sheet, warning), Vec::new());
        }
    };

    let mut warnings = Vec::new();
    let class_label = identity::resolve(grid, sheet, file_stem);
    debug!(sheet, label = ?class_label, "class label");

    let Some(layout) = header::locate(grid) else {
        if class_label.is_none() {
            record_warning(
                &mut warnings,
                SheetWarning::ClassUnresolved {
                    sheet: sheet.to_string(),
                },
            );
        }
        record_warning(
            &mut warnings,
            SheetWarning::HeaderNotFound {
                sheet: sheet.to_string(),
            },
        );
        let analysis = SheetAnalysis {
            sheet: sheet.to_string(),
            skipped: true,
            class_label,
            header_row: None,
            groups: Vec::new(),
            class_columns: Vec::new(),
            students: 0,
            warnings,
        };
        return (analysis, Vec::new());
    };
    debug!(
        sheet,
        row = layout.row,
        groups = layout.groups.len(),
        class_columns = ?layout.class_columns,
        "header located"
    );

    if class_label.is_none() && layout.class_columns.is_empty() {
        record_warning(
            &mut warnings,
            SheetWarning::ClassUnresolved {
                sheet: sheet.to_string(),
            },
        );
    }
    for rejected in &layout.rejected {
        record_warning(
            &mut warnings,
            SheetWarning::MissingColumns {
                sheet: sheet.to_string(),
                column: column_letter(rejected.seed),
                labels: rejected
                    .missing
                    .iter()
                    .map(|role| role.label().to_string())
                    .collect(),
            },
        );
    }

    let fallback = class_label.as_ref().map(|c| c.label.as_str()).unwrap_or("");
    let use_class_columns = class_label.is_none() && !layout.class_columns.is_empty();

    let mut records = Vec::new();
    for mapping in &layout.groups {
        for row in layout.row + 1..grid.height() {
            let class_name = row_class(grid, row, mapping, &layout.class_columns, use_class_columns)
                .unwrap_or_else(|| fallback.to_string());
            if let Some(record) = rows::classify_row(grid, row, mapping, &class_name) {
                records.push(record);
            }
        }
    }
    debug!(sheet, students = records.len(), "sheet scanned");

    let analysis = SheetAnalysis {
        sheet: sheet.to_string(),
        skipped: false,
        class_label,
        header_row: Some(layout.row),
        groups: layout.groups,
        class_columns: layout.class_columns,
        students: records.len(),
        warnings,
    };
    (analysis, records)
}

/// Class of one row taken from a class column: the group's own column
/// first, otherwise the class column nearest the group's id column.
fn row_class(
    grid: &Grid,
    row: usize,
    mapping: &ColumnMapping,
    class_columns: &[usize],
    use_class_columns: bool,
) -> Option<String> {
    if let Some(col) = mapping.class_col {
        return Some(grid.cell(row, col).text());
    }
    if !use_class_columns {
        return None;
    }
    class_columns
        .iter()
        .copied()
        .min_by_key(|&col| col.abs_diff(mapping.student_id))
        .map(|col| grid.cell(row, col).text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use attainment_core::{NoProgress, ScoreStatus};
    use pretty_assertions::assert_eq;

    fn grid(rows: &[&[&str]]) -> Grid {
        Grid::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|s| Cell::from(*s)).collect())
                .collect(),
        )
    }

    fn gradebook() -> Grid {
        grid(&[
            &["学号", "姓名", "平时成绩", "期末成绩", "总成绩"],
            &["2023001", "张三", "80", "90", "87"],
            &["2023002", "李四", "85", "缓考", ""],
        ])
    }

    #[test]
    fn placeholder_sheet_skipped_when_others_exist() {
        let sources = vec![
            SheetSource::new("Sheet1", gradebook()),
            SheetSource::new("x_软件2301", gradebook()),
        ];
        let extraction = extract_sheets("scores", sources, &mut NoProgress);
        assert_eq!(extraction.records.len(), 2);
        assert!(extraction.records.iter().all(|r| r.class_name == "软件2301"));
        assert_eq!(
            extraction.warnings,
            vec![SheetWarning::PlaceholderSkipped {
                sheet: "Sheet1".into()
            }]
        );
    }

    #[test]
    fn lone_placeholder_sheet_processed() {
        let sources = vec![SheetSource::new("Sheet1", gradebook())];
        let extraction = extract_sheets("scores", sources, &mut NoProgress);
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(
            extraction.warnings,
            vec![SheetWarning::ClassUnresolved {
                sheet: "Sheet1".into()
            }]
        );
        assert_eq!(extraction.records[0].class_name, "");
    }

    #[test]
    fn special_rows_are_kept() {
        let extraction = extract_sheets(
            "软件工程2301",
            vec![SheetSource::new("成绩", gradebook())],
            &mut NoProgress,
        );
        let second = &extraction.records[1];
        assert_eq!(second.class_name, "软件工程2301");
        assert!(matches!(
            second.status(),
            Some(ScoreStatus::Exam { text, .. }) if text == "缓考"
        ));
    }

    #[test]
    fn class_column_supplies_per_row_class() {
        let g = grid(&[
            &["班级", "学号", "姓名", "平时", "期末", "总评"],
            &["音乐2211", "2022001", "甲", "80", "80", "80"],
            &["音乐2212", "2022002", "乙", "70", "70", "70"],
        ]);
        let extraction = extract_sheets("scores", vec![SheetSource::new("成绩", g)], &mut NoProgress);
        let classes: Vec<&str> = extraction
            .records
            .iter()
            .map(|r| r.class_name.as_str())
            .collect();
        assert_eq!(classes, vec!["音乐2211", "音乐2212"]);
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn nearest_class_column_used_outside_group_window() {
        let g = grid(&[
            &["学号", "姓名", "平时", "期末", "总评", "班级"],
            &["2022001", "甲", "80", "80", "80", "表演2211"],
        ]);
        let extraction = extract_sheets("scores", vec![SheetSource::new("成绩", g)], &mut NoProgress);
        assert_eq!(extraction.records[0].class_name, "表演2211");
    }

    #[test]
    fn parallel_groups_each_yield_students() {
        let g = grid(&[
            &["班级", "学号", "姓名", "平时", "期末", "总评", "班级", "学号", "姓名", "平时", "期末", "总评"],
            &["A", "2022001", "甲", "80", "80", "80", "B", "2022101", "丙", "60", "60", "60"],
            &["A", "2022002", "乙", "70", "70", "70", "", "", "", "", "", ""],
        ]);
        let extraction = extract_sheets("scores", vec![SheetSource::new("成绩", g)], &mut NoProgress);
        let keys: Vec<(&str, &str)> = extraction
            .records
            .iter()
            .map(|r| (r.class_name.as_str(), r.student_id.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("A", "2022001"), ("A", "2022002"), ("B", "2022101")]
        );
    }

    #[test]
    fn missing_columns_warning_names_labels() {
        let g = grid(&[&["学号", "姓名", "平时成绩"], &["2023001", "张三", "80"]]);
        let extraction = extract_sheets("软件2301", vec![SheetSource::new("成绩", g)], &mut NoProgress);
        assert!(extraction.records.is_empty());
        assert_eq!(
            extraction.warnings,
            vec![SheetWarning::MissingColumns {
                sheet: "成绩".into(),
                column: "A".into(),
                labels: vec!["期末成绩".into(), "总成绩".into()],
            }]
        );
    }

    #[test]
    fn unreadable_and_headerless_sheets_warn() {
        let sources = vec![
            SheetSource {
                name: "坏表".into(),
                grid: Err("bad zip entry".into()),
            },
            SheetSource::new("说明_软件2301", grid(&[&["本表仅供参考"]])),
        ];
        let extraction = extract_sheets("scores", sources, &mut NoProgress);
        assert_eq!(
            extraction.warnings,
            vec![
                SheetWarning::Unreadable {
                    sheet: "坏表".into(),
                    message: "bad zip entry".into(),
                },
                SheetWarning::HeaderNotFound {
                    sheet: "说明_软件2301".into(),
                },
            ]
        );
    }

    #[test]
    fn progress_reports_each_sheet() {
        let mut seen = Vec::new();
        let mut sink = |c: &Checkpoint| seen.push(c.percent());
        extract_sheets(
            "scores",
            vec![
                SheetSource::new("a_软件2301", gradebook()),
                SheetSource::new("b_软件2302", gradebook()),
            ],
            &mut sink,
        );
        assert_eq!(seen, vec![17, 30]);
    }

    #[test]
    fn no_students_error_lists_warnings() {
        let err = ExtractError::NoStudents {
            warnings: vec![SheetWarning::HeaderNotFound {
                sheet: "成绩".into(),
            }],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("no student rows found"));
        assert!(msg.contains("'成绩'"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = read_workbook(Path::new("/nonexistent/grades.xlsx")).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }
}
