//! Row classifier
//!
//! Decides, for each row under a header group, whether it is a student and
//! which [`Outcome`] it carries. Rows whose id cell does not look like a
//! student id are ordinary non-data rows (footnotes, blank lines, totals)
//! and are dropped silently.

use crate::grid::{Cell, Grid};
use attainment_core::{ColumnMapping, ExamKeyword, Outcome, ScoreStatus, Scores, StudentRecord};

const MIN_ID_LEN: usize = 5;
const MIN_DIGIT_RATIO: f64 = 0.8;

/// Student-id validity: at least five characters, no decimal point, and
/// at least 80% digits. Any Unicode digit counts, so full-width ids such
/// as `２０２３１` are accepted.
pub fn is_valid_student_id(id: &str) -> bool {
    let len = id.chars().count();
    if len < MIN_ID_LEN || id.contains('.') {
        return false;
    }
    let digits = id.chars().filter(|c| c.is_numeric()).count();
    digits as f64 / len as f64 >= MIN_DIGIT_RATIO
}

/// Classify the three score cells of one row.
///
/// Keywords are looked for in final, regular, total order. All-empty cells
/// are [`ScoreStatus::Blank`]; anything else that is not three numbers is
/// [`ScoreStatus::Malformed`].
pub fn classify_scores(regular: &Cell, final_score: &Cell, total: &Cell) -> Outcome {
    if [regular, final_score, total].iter().all(|c| c.is_empty()) {
        return Outcome::Special(ScoreStatus::Blank);
    }

    for cell in [final_score, regular, total] {
        if cell.is_empty() {
            continue;
        }
        let text = cell.text();
        if let Some(keyword) = ExamKeyword::find_in(&text) {
            return Outcome::Special(ScoreStatus::Exam { keyword, text });
        }
    }

    match (regular.as_number(), final_score.as_number(), total.as_number()) {
        (Some(regular_score), Some(final_score), Some(total_score)) => Outcome::Graded(Scores {
            regular_score,
            final_score,
            total_score,
        }),
        _ => Outcome::Special(ScoreStatus::Malformed),
    }
}

/// Build a record from `row`, or `None` when the row is not a student row.
pub fn classify_row(
    grid: &Grid,
    row: usize,
    mapping: &ColumnMapping,
    class_name: &str,
) -> Option<StudentRecord> {
    let student_id = grid.cell(row, mapping.student_id).text();
    if !is_valid_student_id(&student_id) {
        return None;
    }

    let outcome = classify_scores(
        grid.cell(row, mapping.regular_score),
        grid.cell(row, mapping.final_score),
        grid.cell(row, mapping.total_score),
    );

    Some(StudentRecord {
        class_name: class_name.to_string(),
        student_id,
        name: grid.cell(row, mapping.name).text(),
        outcome,
    })
}
