//! Per-row cell plan
//!
//! Turns one student record into the list of cells its calculation-sheet row
//! carries. Graded rows get raw scores and formulas; special rows keep their
//! identity cells and status text, and every derived cell becomes a styled
//! blank so the chart ranges stay rectangular.

use crate::layout::{self, DataRows};
use attainment_core::{AttainmentConfig, StudentRecord, TARGET_COUNT};

/// Content of one planned cell
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Formula(String),
    /// Bordered, empty
    Blank,
}

/// Cell style key; the writer maps each to a `Format`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    /// Centered, bordered
    Plain,
    /// Centered, bordered, two decimals
    Decimal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedCell {
    pub col: u16,
    pub value: CellValue,
    pub style: Style,
}

impl PlannedCell {
    fn new(col: u16, value: CellValue, style: Style) -> Self {
        Self { col, value, style }
    }

    /// Formula cells are written in a second pass, after every value is in place
    pub fn is_formula(&self) -> bool {
        matches!(self.value, CellValue::Formula(_))
    }
}

/// Cells of the student at `index` in the sorted record list.
pub fn plan_row(
    record: &StudentRecord,
    index: usize,
    rows: DataRows,
    config: &AttainmentConfig,
) -> Vec<PlannedCell> {
    let row = rows.row_of(index);
    let mut cells = vec![
        PlannedCell::new(
            layout::CLASS,
            CellValue::Text(record.class_name.clone()),
            Style::Plain,
        ),
        PlannedCell::new(
            layout::STUDENT_ID,
            CellValue::Text(record.student_id.clone()),
            Style::Plain,
        ),
        PlannedCell::new(
            layout::SEQUENCE,
            CellValue::Number((index + 1) as f64),
            Style::Plain,
        ),
        PlannedCell::new(
            layout::NAME,
            CellValue::Text(record.name.clone()),
            Style::Plain,
        ),
    ];

    // The expectation line is drawn for every student, graded or not
    cells.extend(layout::EXPECTATION.map(|col| {
        PlannedCell::new(col, CellValue::Number(config.expectation), Style::Decimal)
    }));

    match record.scores() {
        Some(scores) => {
            for target in 0..TARGET_COUNT {
                cells.push(formula(
                    layout::TARGET_SHARE[target],
                    layout::target_share(target, row),
                    Style::Plain,
                ));
            }
            for (col, value) in [
                (layout::REGULAR, scores.regular_score),
                (layout::FINAL, scores.final_score),
                (layout::TOTAL, scores.total_score),
            ] {
                cells.push(PlannedCell::new(col, CellValue::Number(value), Style::Decimal));
            }

            for target in 0..TARGET_COUNT {
                cells.push(decimal(
                    layout::REGULAR_BY_TARGET[target],
                    layout::normalized(layout::REGULAR, target, row),
                ));
                cells.push(decimal(
                    layout::FINAL_BY_TARGET[target],
                    layout::normalized(layout::FINAL, target, row),
                ));
                cells.push(decimal(
                    layout::WEIGHTED_BY_TARGET[target],
                    layout::weighted(target, row),
                ));
                cells.push(decimal(
                    layout::ATTAINMENT[target],
                    layout::ratio(layout::WEIGHTED_BY_TARGET[target], row),
                ));
                cells.push(decimal(
                    layout::ATTAINMENT_AVERAGE[target],
                    layout::broadcast_average(layout::ATTAINMENT[target], rows),
                ));
            }
            cells.push(decimal(layout::REGULAR_COPY, layout::copy_of(layout::REGULAR, row)));
            cells.push(decimal(layout::FINAL_COPY, layout::copy_of(layout::FINAL, row)));
            cells.push(decimal(layout::TOTAL_COPY, layout::copy_of(layout::TOTAL, row)));
            cells.push(decimal(layout::OVERALL, layout::ratio(layout::TOTAL_COPY, row)));
            cells.push(decimal(
                layout::OVERALL_AVERAGE,
                layout::broadcast_average(layout::OVERALL, rows),
            ));
        }
        None => {
            let status = record.status().map(|s| s.label()).unwrap_or_default();
            cells.push(PlannedCell::new(
                layout::TOTAL,
                CellValue::Text(status.to_string()),
                Style::Plain,
            ));
            let blanks = (layout::TARGET_SHARE[0]..layout::TOTAL)
                .chain(layout::REGULAR_BY_TARGET[0]..=layout::ATTAINMENT_AVERAGE[2])
                .chain([layout::OVERALL, layout::OVERALL_AVERAGE]);
            cells.extend(blanks.map(|col| PlannedCell::new(col, CellValue::Blank, Style::Plain)));
        }
    }

    cells.sort_by_key(|c| c.col);
    cells
}

fn formula(col: u16, text: String, style: Style) -> PlannedCell {
    PlannedCell::new(col, CellValue::Formula(text), style)
}

fn decimal(col: u16, text: String) -> PlannedCell {
    formula(col, text, Style::Decimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use attainment_core::{ExamKeyword, ScoreStatus, Scores};
    use pretty_assertions::assert_eq;

    fn graded() -> StudentRecord {
        StudentRecord::graded(
            "软件2301",
            "2023001",
            "张三",
            Scores {
                regular_score: 80.0,
                final_score: 90.0,
                total_score: 87.0,
            },
        )
    }

    fn deferred() -> StudentRecord {
        StudentRecord::special(
            "软件2301",
            "2023002",
            "李四",
            ScoreStatus::Exam {
                keyword: ExamKeyword::Deferred,
                text: "缓考".into(),
            },
        )
    }

    fn value_at(cells: &[PlannedCell], col: u16) -> &CellValue {
        &cells.iter().find(|c| c.col == col).unwrap().value
    }

    #[test]
    fn formula_cells_are_the_derived_columns() {
        let rows = DataRows::new(2);
        let config = AttainmentConfig::default();

        let cells = plan_row(&graded(), 0, rows, &config);
        let values: Vec<u16> = cells.iter().filter(|c| !c.is_formula()).map(|c| c.col).collect();
        let mut expected = vec![
            layout::CLASS,
            layout::STUDENT_ID,
            layout::SEQUENCE,
            layout::NAME,
            layout::REGULAR,
            layout::FINAL,
            layout::TOTAL,
        ];
        expected.extend(layout::EXPECTATION);
        expected.sort_unstable();
        assert_eq!(values, expected);
        assert!(cells.iter().find(|c| c.col == layout::OVERALL).unwrap().is_formula());

        let cells = plan_row(&deferred(), 1, rows, &config);
        assert!(cells.iter().all(|c| !c.is_formula()));
    }

    #[test]
    fn every_column_is_planned_once() {
        let rows = DataRows::new(2);
        let config = AttainmentConfig::default();
        for (index, record) in [graded(), deferred()].iter().enumerate() {
            let cells = plan_row(record, index, rows, &config);
            let cols: Vec<u16> = cells.iter().map(|c| c.col).collect();
            let expected: Vec<u16> = (0..=layout::LAST_COLUMN).collect();
            assert_eq!(cols, expected);
        }
    }

    #[test]
    fn graded_row_carries_formulas() {
        let rows = DataRows::new(2);
        let cells = plan_row(&graded(), 0, rows, &AttainmentConfig::default());

        assert_eq!(value_at(&cells, layout::REGULAR), &CellValue::Number(80.0));
        assert_eq!(value_at(&cells, layout::FINAL), &CellValue::Number(90.0));
        assert_eq!(
            value_at(&cells, layout::TARGET_SHARE[0]),
            &CellValue::Formula("=ROUND(H3*$C$1/100,0)".into())
        );
        assert_eq!(
            value_at(&cells, layout::ATTAINMENT[0]),
            &CellValue::Formula("=S3/100".into())
        );
        assert_eq!(
            value_at(&cells, layout::ATTAINMENT_AVERAGE[0]),
            &CellValue::Formula("=AVERAGE(W$3:W$4)".into())
        );
        assert_eq!(
            value_at(&cells, layout::OVERALL_AVERAGE),
            &CellValue::Formula("=AVERAGE(AF$3:AF$4)".into())
        );
        assert_eq!(value_at(&cells, layout::SEQUENCE), &CellValue::Number(1.0));
    }

    #[test]
    fn special_row_blanks_derived_cells() {
        let rows = DataRows::new(2);
        let cells = plan_row(&deferred(), 1, rows, &AttainmentConfig::default());

        assert_eq!(
            value_at(&cells, layout::TOTAL),
            &CellValue::Text("缓考".into())
        );
        assert_eq!(value_at(&cells, layout::REGULAR), &CellValue::Blank);
        assert_eq!(value_at(&cells, layout::ATTAINMENT[2]), &CellValue::Blank);
        assert_eq!(value_at(&cells, layout::OVERALL), &CellValue::Blank);
        assert_eq!(value_at(&cells, layout::SEQUENCE), &CellValue::Number(2.0));
        assert_eq!(
            value_at(&cells, layout::EXPECTATION[0]),
            &CellValue::Number(0.6)
        );
        assert!(cells
            .iter()
            .all(|c| !matches!(c.value, CellValue::Formula(_))));
    }

    #[test]
    fn malformed_and_blank_labels() {
        let rows = DataRows::new(1);
        let config = AttainmentConfig::default();
        let malformed = StudentRecord::special("A", "2023003", "王五", ScoreStatus::Malformed);
        let blank = StudentRecord::special("A", "2023004", "赵六", ScoreStatus::Blank);
        assert_eq!(
            value_at(&plan_row(&malformed, 0, rows, &config), layout::TOTAL),
            &CellValue::Text("成绩异常".into())
        );
        assert_eq!(
            value_at(&plan_row(&blank, 0, rows, &config), layout::TOTAL),
            &CellValue::Text("成绩为空".into())
        );
    }
}
