//! Fixed column contract of the report and its formula builders
//!
//! The calculation sheet has a fixed layout: rows 1-2 are headers, student
//! rows start at row 3 and one averages row follows the last student. Chart
//! ranges reference these columns directly, so nothing here is inferred.
//!
//! Column indices are zero-based (what `rust_xlsxwriter` takes); row numbers
//! inside formulas are one-based A1 references.

use attainment_core::{column_letter, TARGET_COUNT};

pub const CALC_SHEET: &str = "课程目标达成度计算";
pub const STATS_SHEET: &str = "达成度统计";

/// First student row, one-based
pub const FIRST_DATA_ROW: u32 = 3;

// ============================================================================
// Calculation Sheet Columns
// ============================================================================

pub const CLASS: u16 = 0;
pub const STUDENT_ID: u16 = 1;
/// C-E: total score split by target weight
pub const TARGET_SHARE: [u16; TARGET_COUNT] = [2, 3, 4];
pub const REGULAR: u16 = 5;
pub const FINAL: u16 = 6;
pub const TOTAL: u16 = 7;
pub const SEQUENCE: u16 = 8;
pub const NAME: u16 = 9;
/// K-M: regular score normalized per target
pub const REGULAR_BY_TARGET: [u16; TARGET_COUNT] = [10, 11, 12];
pub const REGULAR_COPY: u16 = 13;
/// O-Q: final score normalized per target
pub const FINAL_BY_TARGET: [u16; TARGET_COUNT] = [14, 15, 16];
pub const FINAL_COPY: u16 = 17;
/// S-U: weighted per-target score
pub const WEIGHTED_BY_TARGET: [u16; TARGET_COUNT] = [18, 19, 20];
pub const TOTAL_COPY: u16 = 21;
/// W-Y: per-target attainment
pub const ATTAINMENT: [u16; TARGET_COUNT] = [22, 23, 24];
/// Z-AB: broadcast per-target attainment average
pub const ATTAINMENT_AVERAGE: [u16; TARGET_COUNT] = [25, 26, 27];
/// AC-AE: expectation threshold
pub const EXPECTATION: [u16; TARGET_COUNT] = [28, 29, 30];
pub const OVERALL: u16 = 31;
pub const OVERALL_AVERAGE: u16 = 32;
pub const LAST_COLUMN: u16 = OVERALL_AVERAGE;

/// Weight cells in row 1
pub const REGULAR_WEIGHT: u16 = 12;
pub const FINAL_WEIGHT: u16 = 16;

/// Columns that get an `AVERAGE` in the averages row
pub fn averaged_columns() -> Vec<u16> {
    let mut cols: Vec<u16> = (TARGET_SHARE[0]..=TOTAL).collect();
    cols.extend(REGULAR_BY_TARGET[0]..=TOTAL_COPY);
    cols.extend(ATTAINMENT);
    cols.push(OVERALL);
    cols
}

pub fn letter(col: u16) -> String {
    column_letter(col as usize)
}

fn anchor(col: u16) -> String {
    format!("${}$1", letter(col))
}

// ============================================================================
// Header Rows
// ============================================================================

/// Row-1 merged label spans: (first col, last col, text)
pub const TITLE_SPANS: [(u16, u16, &str); 8] = [
    (REGULAR, TOTAL, "成绩"),
    (REGULAR_BY_TARGET[0], REGULAR_BY_TARGET[1], "平时成绩"),
    (FINAL_BY_TARGET[0], FINAL_BY_TARGET[1], "期末成绩"),
    (WEIGHTED_BY_TARGET[0], TOTAL_COPY, "总成绩"),
    (ATTAINMENT[0], ATTAINMENT[2], "达成度"),
    (ATTAINMENT_AVERAGE[0], ATTAINMENT_AVERAGE[2], "达成度平均值"),
    (EXPECTATION[0], EXPECTATION[2], "达成度期望值"),
    (OVERALL, OVERALL, "算术平均值"),
];

/// Spans rows 1 and 2 of column AG
pub const OVERALL_AVERAGE_TITLE: &str = "总达成度平均值";

/// Row-1 merged spans left empty
pub const EMPTY_SPANS: [(u16, u16); 2] = [(CLASS, STUDENT_ID), (SEQUENCE, NAME)];

/// Row-1 spans holding the score weights
pub const WEIGHT_SPANS: [(u16, u16); 2] = [
    (REGULAR_WEIGHT, REGULAR_COPY),
    (FINAL_WEIGHT, FINAL_COPY),
];

/// Row-2 labels, column by column from A to AF
pub const COLUMN_LABELS: [&str; 32] = [
    "班级", "学号", "目标一", "目标二", "目标三", "平时", "期末", "总分", "序号", "姓名", "目标1",
    "目标2", "目标3", "平时", "目标1", "目标2", "目标3", "期末", "目标1", "目标2", "目标3", "总分",
    "目标1", "目标2", "目标3", "目标1", "目标2", "目标3", "目标1", "目标2", "目标3", "总达成度",
];

pub const AVERAGES_LABEL: &str = "（平均值）";

// ============================================================================
// Row Span
// ============================================================================

/// Student rows of one report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataRows {
    count: u32,
}

impl DataRows {
    /// `count` must be at least one.
    pub fn new(count: usize) -> Self {
        Self {
            count: count.max(1) as u32,
        }
    }

    pub fn count(self) -> u32 {
        self.count
    }

    /// One-based row of the first student
    pub fn first(self) -> u32 {
        FIRST_DATA_ROW
    }

    /// One-based row of the last student
    pub fn last(self) -> u32 {
        FIRST_DATA_ROW + self.count - 1
    }

    /// One-based row of the averages row
    pub fn averages(self) -> u32 {
        self.last() + 1
    }

    /// One-based row of the student at `index`
    pub fn row_of(self, index: usize) -> u32 {
        FIRST_DATA_ROW + index as u32
    }
}

/// Zero-based sheet row for a one-based row number
pub fn sheet_row(row: u32) -> u32 {
    row - 1
}

// ============================================================================
// Per-Row Formulas
// ============================================================================

/// C-E: `=ROUND(H{r}*$C$1/100,0)`
pub fn target_share(target: usize, row: u32) -> String {
    format!(
        "=ROUND({}{}*{}/100,0)",
        letter(TOTAL),
        row,
        anchor(TARGET_SHARE[target])
    )
}

/// K-M from F and O-Q from G: `=(ROUND(F{r}*$C$1/100,0)/$C$1)*100`
pub fn normalized(source: u16, target: usize, row: u32) -> String {
    let weight = anchor(TARGET_SHARE[target]);
    format!(
        "=(ROUND({}{}*{}/100,0)/{})*100",
        letter(source),
        row,
        weight,
        weight
    )
}

/// N, R, V: plain reference to a raw score
pub fn copy_of(source: u16, row: u32) -> String {
    format!("={}{}", letter(source), row)
}

/// S-U: `=K{r}*$M$1/100+O{r}*$Q$1/100`
pub fn weighted(target: usize, row: u32) -> String {
    format!(
        "={}{}*{}/100+{}{}*{}/100",
        letter(REGULAR_BY_TARGET[target]),
        row,
        anchor(REGULAR_WEIGHT),
        letter(FINAL_BY_TARGET[target]),
        row,
        anchor(FINAL_WEIGHT)
    )
}

/// W-Y and AF: score over 100
pub fn ratio(source: u16, row: u32) -> String {
    format!("={}{}/100", letter(source), row)
}

/// Z-AB and AG: the same whole-range average on every student row
pub fn broadcast_average(source: u16, rows: DataRows) -> String {
    let col = letter(source);
    format!("=AVERAGE({col}${}:{col}${})", rows.first(), rows.last())
}

/// Averages row entry
pub fn column_average(col: u16, rows: DataRows) -> String {
    let col = letter(col);
    format!("=AVERAGE({col}{}:{col}{})", rows.first(), rows.last())
}

// ============================================================================
// Statistics Sheet
// ============================================================================

/// Statistics columns: count and share per target
pub const BUCKET_COUNT: [u16; TARGET_COUNT] = [2, 4, 6];
pub const BUCKET_SHARE: [u16; TARGET_COUNT] = [3, 5, 7];
/// One-based row of the first bucket
pub const FIRST_BUCKET_ROW: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparison {
    fn operator(self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
        }
    }

    fn holds(self, value: f64, bound: f64) -> bool {
        match self {
            Self::Greater => value > bound,
            Self::GreaterOrEqual => value >= bound,
            Self::Less => value < bound,
            Self::LessOrEqual => value <= bound,
        }
    }
}

/// One attainment band of the statistics table
#[derive(Clone, Copy, Debug)]
pub struct Bucket {
    pub range_label: &'static str,
    pub description: &'static str,
    pub criteria: &'static [(Comparison, f64)],
}

impl Bucket {
    pub fn contains(&self, value: f64) -> bool {
        self.criteria.iter().all(|(cmp, bound)| cmp.holds(value, *bound))
    }

    /// `COUNTIF`/`COUNTIFS` over one attainment column
    pub fn count_formula(&self, target: usize, rows: DataRows) -> String {
        let col = letter(ATTAINMENT[target]);
        let range = format!("'{}'!{col}{}:{col}{}", CALC_SHEET, rows.first(), rows.last());
        let function = if self.criteria.len() == 1 {
            "COUNTIF"
        } else {
            "COUNTIFS"
        };
        let args: Vec<String> = self
            .criteria
            .iter()
            .map(|(cmp, bound)| format!("{},\"{}{}\"", range, cmp.operator(), bound))
            .collect();
        format!("={}({})", function, args.join(","))
    }
}

pub const BUCKETS: [Bucket; 5] = [
    Bucket {
        range_label: ">0.8",
        description: "完全达成",
        criteria: &[(Comparison::Greater, 0.8)],
    },
    Bucket {
        range_label: "0.6-0.8",
        description: "较好达成",
        criteria: &[
            (Comparison::GreaterOrEqual, 0.6),
            (Comparison::LessOrEqual, 0.8),
        ],
    },
    Bucket {
        range_label: "0.5-0.6",
        description: "基本达成",
        criteria: &[(Comparison::GreaterOrEqual, 0.5), (Comparison::Less, 0.6)],
    },
    Bucket {
        range_label: "0.4-0.5",
        description: "较少达成",
        criteria: &[(Comparison::GreaterOrEqual, 0.4), (Comparison::Less, 0.5)],
    },
    Bucket {
        range_label: "<0.4",
        description: "没有达成",
        criteria: &[(Comparison::Less, 0.4)],
    },
];

/// Share of one bucket: its count over the numeric cells of the column
pub fn share_formula(target: usize, bucket_row: u32, rows: DataRows) -> String {
    let col = letter(ATTAINMENT[target]);
    format!(
        "={}{}/COUNT('{}'!{col}${}:{col}${})",
        letter(BUCKET_COUNT[target]),
        bucket_row,
        CALC_SHEET,
        rows.first(),
        rows.last()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn column_letters_match_contract() {
        assert_eq!(letter(TARGET_SHARE[0]), "C");
        assert_eq!(letter(TOTAL), "H");
        assert_eq!(letter(SEQUENCE), "I");
        assert_eq!(letter(REGULAR_WEIGHT), "M");
        assert_eq!(letter(FINAL_WEIGHT), "Q");
        assert_eq!(letter(ATTAINMENT[0]), "W");
        assert_eq!(letter(ATTAINMENT_AVERAGE[1]), "AA");
        assert_eq!(letter(EXPECTATION[2]), "AE");
        assert_eq!(letter(OVERALL), "AF");
        assert_eq!(letter(LAST_COLUMN), "AG");
        assert_eq!(COLUMN_LABELS.len(), OVERALL as usize + 1);
    }

    #[test]
    fn data_rows_span() {
        let rows = DataRows::new(2);
        assert_eq!(rows.first(), 3);
        assert_eq!(rows.last(), 4);
        assert_eq!(rows.averages(), 5);
        assert_eq!(rows.row_of(1), 4);
        assert_eq!(sheet_row(rows.averages()), 4);
    }

    #[test]
    fn per_row_formulas() {
        assert_eq!(target_share(0, 3), "=ROUND(H3*$C$1/100,0)");
        assert_eq!(target_share(2, 7), "=ROUND(H7*$E$1/100,0)");
        assert_eq!(
            normalized(REGULAR, 1, 3),
            "=(ROUND(F3*$D$1/100,0)/$D$1)*100"
        );
        assert_eq!(normalized(FINAL, 0, 4), "=(ROUND(G4*$C$1/100,0)/$C$1)*100");
        assert_eq!(copy_of(REGULAR, 3), "=F3");
        assert_eq!(weighted(0, 3), "=K3*$M$1/100+O3*$Q$1/100");
        assert_eq!(weighted(2, 3), "=M3*$M$1/100+Q3*$Q$1/100");
        assert_eq!(ratio(WEIGHTED_BY_TARGET[1], 5), "=T5/100");
        assert_eq!(ratio(TOTAL_COPY, 5), "=V5/100");
    }

    #[test]
    fn averages_are_anchored_on_the_data_span() {
        let rows = DataRows::new(40);
        assert_eq!(broadcast_average(ATTAINMENT[0], rows), "=AVERAGE(W$3:W$42)");
        assert_eq!(broadcast_average(OVERALL, rows), "=AVERAGE(AF$3:AF$42)");
        assert_eq!(column_average(TARGET_SHARE[0], rows), "=AVERAGE(C3:C42)");
    }

    #[test]
    fn averaged_columns_skip_identity_and_chart_helpers() {
        let letters: Vec<String> = averaged_columns().into_iter().map(letter).collect();
        let expected = [
            "C", "D", "E", "F", "G", "H", "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U",
            "V", "W", "X", "Y", "AF",
        ];
        assert_eq!(letters, expected);
    }

    #[test]
    fn bucket_formulas() {
        let rows = DataRows::new(2);
        assert_eq!(
            BUCKETS[0].count_formula(0, rows),
            "=COUNTIF('课程目标达成度计算'!W3:W4,\">0.8\")"
        );
        assert_eq!(
            BUCKETS[1].count_formula(1, rows),
            "=COUNTIFS('课程目标达成度计算'!X3:X4,\">=0.6\",'课程目标达成度计算'!X3:X4,\"<=0.8\")"
        );
        assert_eq!(
            share_formula(2, 5, rows),
            "=G5/COUNT('课程目标达成度计算'!Y$3:Y$4)"
        );
    }

    #[test]
    fn buckets_partition_the_unit_interval() {
        for step in 0..=1000 {
            let value = f64::from(step) / 1000.0 * 1.2 - 0.1;
            let hits = BUCKETS.iter().filter(|b| b.contains(value)).count();
            assert_eq!(hits, 1, "value {} falls in {} buckets", value, hits);
        }
        for edge in [0.4, 0.5, 0.6, 0.8] {
            assert_eq!(BUCKETS.iter().filter(|b| b.contains(edge)).count(), 1);
        }
    }
}
