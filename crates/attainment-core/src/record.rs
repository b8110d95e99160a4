//! Student records and the sort/aggregate step.

use serde::Serialize;
use std::collections::BTreeMap;

/// Administrative exam outcome keyword found in a score cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamKeyword {
    /// 缺考
    Absent,
    /// 缓考
    Deferred,
    /// 作弊
    Cheating,
    /// 取消
    Cancelled,
    /// 免修
    Exempt,
    /// 旷考
    Truancy,
}

impl ExamKeyword {
    /// Keywords in match priority order
    pub const ALL: [ExamKeyword; 6] = [
        Self::Absent,
        Self::Deferred,
        Self::Cheating,
        Self::Cancelled,
        Self::Exempt,
        Self::Truancy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "缺考",
            Self::Deferred => "缓考",
            Self::Cheating => "作弊",
            Self::Cancelled => "取消",
            Self::Exempt => "免修",
            Self::Truancy => "旷考",
        }
    }

    /// First keyword contained in `text`, in priority order.
    pub fn find_in(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| text.contains(k.as_str()))
    }
}

/// Why a student row carries no numeric scores
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreStatus {
    /// A score cell names an administrative outcome; `text` is the full cell text
    Exam { keyword: ExamKeyword, text: String },
    /// Score cells present but not all numeric
    Malformed,
    /// All three score cells empty
    Blank,
}

impl ScoreStatus {
    /// Text written into the total-score column of the report
    pub fn label(&self) -> &str {
        match self {
            Self::Exam { text, .. } => text,
            Self::Malformed => "成绩异常",
            Self::Blank => "成绩为空",
        }
    }
}

/// The three numeric scores of a graded student
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Scores {
    pub regular_score: f64,
    pub final_score: f64,
    pub total_score: f64,
}

/// Either all three scores or a status explaining their absence
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Graded(Scores),
    Special(ScoreStatus),
}

/// One student row extracted from a gradebook
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StudentRecord {
    pub class_name: String,
    pub student_id: String,
    pub name: String,
    pub outcome: Outcome,
}

impl StudentRecord {
    pub fn graded(
        class_name: impl Into<String>,
        student_id: impl Into<String>,
        name: impl Into<String>,
        scores: Scores,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            student_id: student_id.into(),
            name: name.into(),
            outcome: Outcome::Graded(scores),
        }
    }

    pub fn special(
        class_name: impl Into<String>,
        student_id: impl Into<String>,
        name: impl Into<String>,
        status: ScoreStatus,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            student_id: student_id.into(),
            name: name.into(),
            outcome: Outcome::Special(status),
        }
    }

    pub fn scores(&self) -> Option<&Scores> {
        match &self.outcome {
            Outcome::Graded(scores) => Some(scores),
            Outcome::Special(_) => None,
        }
    }

    pub fn status(&self) -> Option<&ScoreStatus> {
        match &self.outcome {
            Outcome::Graded(_) => None,
            Outcome::Special(status) => Some(status),
        }
    }
}

/// Order records by class name, then student id.
///
/// Both keys compare as strings: "10" sorts before "2". The sort is stable.
pub fn sort_records(records: &mut [StudentRecord]) {
    records.sort_by(|a, b| {
        a.class_name
            .cmp(&b.class_name)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
}

/// Count records per class, keyed in class-name order.
pub fn class_counts(records: &[StudentRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.class_name.clone()).or_insert(0) += 1;
    }
    counts
}
