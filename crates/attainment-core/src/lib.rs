//! # attainment-core
//!
//! Core domain model and traits for gradebook attainment (达成度) reports.
//!
//! This crate provides:
//! - Domain types: `AttainmentConfig`, `StudentRecord`, `ColumnMapping`, `ReportSummary`
//! - Core traits: `Renderer`, `Progress`
//! - Sheet-level warnings and error types
//!
//! ## Example
//!
//! ```rust
//! use attainment_core::{class_counts, sort_records, Scores, StudentRecord};
//!
//! let scores = Scores { regular_score: 80.0, final_score: 90.0, total_score: 87.0 };
//! let mut records = vec![
//!     StudentRecord::graded("软件2301", "2023002", "李四", scores),
//!     StudentRecord::graded("软件2301", "2023001", "张三", scores),
//! ];
//! sort_records(&mut records);
//! assert_eq!(records[0].student_id, "2023001");
//! assert_eq!(class_counts(&records)["软件2301"], 2);
//! ```

pub mod config;
pub mod progress;
pub mod record;

pub use config::{AttainmentConfig, ConfigError, ScoreWeights, TARGET_COUNT};
pub use progress::{Checkpoint, NoProgress, Progress};
pub use record::{
    class_counts, sort_records, ExamKeyword, Outcome, ScoreStatus, Scores, StudentRecord,
};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Column Mapping
// ============================================================================

/// Logical role of a gradebook column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    StudentId,
    Name,
    FinalScore,
    RegularScore,
    TotalScore,
    Class,
}

impl ColumnRole {
    /// Roles every accepted column group must carry, in warning order
    pub const REQUIRED: [ColumnRole; 5] = [
        Self::StudentId,
        Self::Name,
        Self::FinalScore,
        Self::RegularScore,
        Self::TotalScore,
    ];

    /// Header label used when reporting a missing column
    pub fn label(self) -> &'static str {
        match self {
            Self::StudentId => "学号",
            Self::Name => "姓名",
            Self::FinalScore => "期末成绩",
            Self::RegularScore => "平时成绩",
            Self::TotalScore => "总成绩",
            Self::Class => "班级",
        }
    }
}

/// Column indices of one complete header group
///
/// All five required roles are plain indices, so a partially detected
/// group cannot be represented.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub student_id: usize,
    pub name: usize,
    pub final_score: usize,
    pub regular_score: usize,
    pub total_score: usize,
    /// Group-local class column, when the group has one
    pub class_col: Option<usize>,
}

// ============================================================================
// Warnings
// ============================================================================

/// Non-fatal problem found while scanning one sheet
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SheetWarning {
    /// Sheet carries the placeholder name and other sheets exist
    PlaceholderSkipped { sheet: String },
    /// Sheet could not be decoded
    Unreadable { sheet: String, message: String },
    /// No class label in the grid, sheet name, file name or header columns
    ClassUnresolved { sheet: String },
    /// No row with both a student-id and a name header
    HeaderNotFound { sheet: String },
    /// A column group lacks required columns and was discarded
    MissingColumns {
        sheet: String,
        column: String,
        labels: Vec<String>,
    },
}

impl SheetWarning {
    /// Stable short code for machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            Self::PlaceholderSkipped { .. } => "W001",
            Self::Unreadable { .. } => "W002",
            Self::ClassUnresolved { .. } => "W003",
            Self::HeaderNotFound { .. } => "W004",
            Self::MissingColumns { .. } => "W005",
        }
    }

    pub fn sheet(&self) -> &str {
        match self {
            Self::PlaceholderSkipped { sheet }
            | Self::Unreadable { sheet, .. }
            | Self::ClassUnresolved { sheet }
            | Self::HeaderNotFound { sheet }
            | Self::MissingColumns { sheet, .. } => sheet,
        }
    }
}

impl fmt::Display for SheetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaceholderSkipped { sheet } => {
                write!(f, "sheet '{}': placeholder sheet skipped", sheet)
            }
            Self::Unreadable { sheet, message } => {
                write!(f, "sheet '{}': unreadable ({}), skipped", sheet, message)
            }
            Self::ClassUnresolved { sheet } => write!(
                f,
                "sheet '{}': no 行政班/班级 information found, class column left blank",
                sheet
            ),
            Self::HeaderNotFound { sheet } => write!(
                f,
                "sheet '{}': no header row containing 学号 and 姓名, skipped",
                sheet
            ),
            Self::MissingColumns {
                sheet,
                column,
                labels,
            } => write!(
                f,
                "sheet '{}': column group at {} is missing {}, group skipped",
                sheet,
                column,
                labels.join("、")
            ),
        }
    }
}

/// Convert a zero-based column index to its A1 letters (0 -> A, 26 -> AA)
pub fn column_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

// ============================================================================
// Result Types
// ============================================================================

/// Outcome of processing one input workbook
#[derive(Clone, Debug, Serialize)]
pub struct ReportSummary {
    pub total_students: usize,
    /// Student count per class, in class-name order
    pub class_counts: BTreeMap<String, usize>,
    pub output_file: PathBuf,
    pub warnings: Vec<SheetWarning>,
}

// ============================================================================
// Traits
// ============================================================================

/// Output rendering
pub trait Renderer {
    type Output;

    /// Render sorted student records to the output format
    fn render(&self, records: &[StudentRecord]) -> Result<Self::Output, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

// ============================================================================
// Tests
// ============================================================================
