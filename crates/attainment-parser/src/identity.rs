//! Class-identity resolver
//!
//! Finds the class (行政班) label for a sheet. Sources are tried in order,
//! first match wins:
//! 1. a `行政班：XXX` / `班级：XXX` banner in the top-left of the grid
//! 2. the trailing `_segment` of the sheet name
//! 3. shape-specific patterns over the file name
//!
//! Candidates containing report keywords (成绩单, 报告, ...) are rejected so a
//! report title is not mistaken for a class.

use crate::grid::Grid;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// Rows scanned for a banner
pub const BANNER_SCAN_ROWS: usize = 50;
/// Columns scanned for a banner
pub const BANNER_SCAN_COLS: usize = 5;

const EXCLUDED_KEYWORDS: [&str; 8] = [
    "达成度报告",
    "成绩单",
    "成绩",
    "总评",
    "期末",
    "平时",
    "报告",
    "统计",
];

/// Where a class label was found
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassSource {
    Grid,
    SheetName,
    FileName,
}

impl fmt::Display for ClassSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Grid => "sheet banner",
            Self::SheetName => "sheet name",
            Self::FileName => "file name",
        };
        f.write_str(text)
    }
}

/// A resolved class label
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassLabel {
    pub label: String,
    pub source: ClassSource,
}

/// Resolve the class label of a sheet.
pub fn resolve(grid: &Grid, sheet_name: &str, file_stem: &str) -> Option<ClassLabel> {
    if let Some(label) = from_grid(grid) {
        return Some(ClassLabel {
            label,
            source: ClassSource::Grid,
        });
    }
    if let Some(label) = from_sheet_name(sheet_name) {
        return Some(ClassLabel {
            label,
            source: ClassSource::SheetName,
        });
    }
    from_file_name(file_stem).map(|label| ClassLabel {
        label,
        source: ClassSource::FileName,
    })
}

// Patterns are compiled once; one that fails to compile disables only its
// own source and is logged, it never aborts the scan.
fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|err| warn!(pattern, %err, "class pattern rejected"))
        .ok()
}

fn banner_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    // The token stops at whitespace or a parenthesis; what follows is
    // usually an alias or the instructor's name.
    PATTERN
        .get_or_init(|| compile(r"(?:行政班|班级)[：:\s]\s*([^\s(（]+)"))
        .as_ref()
}

fn trailing_segment_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| compile(r"_([^\d_][^_]+)$")).as_ref()
}

fn file_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // 2022级计算机1班
            r"(\d{2,4}级[^\d_]+\d*班)",
            // 软件工程2301 (letters or Chinese followed by a 4-digit code)
            r"([a-zA-Z\x{4e00}-\x{9fa5}]+\d{4})",
            // xxx_计算机1班
            r"_([^\d_][^_]+)$",
            // 计算机1班
            r"^([^\d_]+\d+班)",
        ]
        .into_iter()
        .filter_map(compile)
        .collect()
    })
}

fn is_excluded(candidate: &str) -> bool {
    EXCLUDED_KEYWORDS.iter().any(|kw| candidate.contains(kw))
}

/// Search the top-left block of the grid for a `班级：XXX` banner.
pub fn from_grid(grid: &Grid) -> Option<String> {
    let pattern = banner_pattern()?;
    let rows = grid.height().min(BANNER_SCAN_ROWS);
    let cols = grid.width().min(BANNER_SCAN_COLS);
    for row in 0..rows {
        for col in 0..cols {
            let text = grid.cell(row, col).text();
            if text.is_empty() {
                continue;
            }
            if let Some(caps) = pattern.captures(&text) {
                return Some(caps[1].trim().to_string());
            }
        }
    }
    None
}

/// Derive a class label from a sheet name such as `9007851-0001_音乐2212`.
pub fn from_sheet_name(sheet_name: &str) -> Option<String> {
    let caps = trailing_segment_pattern()?.captures(sheet_name)?;
    let candidate = caps[1].trim();
    (!is_excluded(candidate)).then(|| candidate.to_string())
}

/// Derive a class label from a file name without its extension.
pub fn from_file_name(file_stem: &str) -> Option<String> {
    file_patterns().iter().find_map(|pattern| {
        let caps = pattern.captures(file_stem)?;
        let candidate = caps[1].trim();
        (!is_excluded(candidate)).then(|| candidate.to_string())
    })
}
