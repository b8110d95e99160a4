//! Header group locator
//!
//! Finds the header row (the first row, within [`HEADER_SCAN_ROWS`], that has
//! both a 学号 and a 姓名 cell) and splits it into column groups. Each 学号
//! column seeds one group; the group's window runs from the nearest class
//! column on its left to the next class column on its right, so parallel
//! groups on one sheet do not borrow each other's columns.
//!
//! Inside a window every cell is classified by [`ROLE_RULES`]. A cell takes
//! the role of its most specific matching rule; per role, the leftmost cell
//! of the highest rank wins.

use crate::grid::Grid;
use attainment_core::{ColumnMapping, ColumnRole};
use std::cmp::Reverse;
use std::ops::Range;

/// Rows scanned for a header row
pub const HEADER_SCAN_ROWS: usize = 50;

const ID_TOKEN: &str = "学号";
const NAME_TOKEN: &str = "姓名";
const CLASS_LABELS: &[&str] = &["班级", "行政班"];

#[derive(Clone, Copy, Debug)]
enum Pattern {
    /// Header text contains any keyword
    Contains(&'static [&'static str]),
    /// Header text equals a keyword
    Exact(&'static [&'static str]),
}

impl Pattern {
    fn matches(self, header: &str) -> bool {
        match self {
            Self::Contains(keywords) => keywords.iter().any(|k| header.contains(k)),
            Self::Exact(keywords) => keywords.contains(&header),
        }
    }
}

/// One entry of the role table
#[derive(Clone, Copy, Debug)]
pub struct RoleRule {
    role: ColumnRole,
    pattern: Pattern,
    rank: u8,
}

/// Role keyword table; ties in rank resolve in table order.
pub const ROLE_RULES: &[RoleRule] = &[
    RoleRule {
        role: ColumnRole::StudentId,
        pattern: Pattern::Contains(&[ID_TOKEN]),
        rank: 3,
    },
    RoleRule {
        role: ColumnRole::Name,
        pattern: Pattern::Contains(&[NAME_TOKEN]),
        rank: 3,
    },
    RoleRule {
        role: ColumnRole::Class,
        pattern: Pattern::Exact(CLASS_LABELS),
        rank: 3,
    },
    RoleRule {
        role: ColumnRole::TotalScore,
        pattern: Pattern::Contains(&["总成绩", "总评成绩", "总分"]),
        rank: 2,
    },
    RoleRule {
        role: ColumnRole::FinalScore,
        pattern: Pattern::Contains(&["期末成绩", "期末", "期末考试"]),
        rank: 2,
    },
    RoleRule {
        role: ColumnRole::RegularScore,
        pattern: Pattern::Contains(&["平时成绩", "平时", "平时分"]),
        rank: 2,
    },
    // A bare 成绩 only counts as the total when nothing more specific matched
    RoleRule {
        role: ColumnRole::TotalScore,
        pattern: Pattern::Exact(&["成绩", "总评"]),
        rank: 1,
    },
];

/// Strip surrounding whitespace and embedded line breaks ("总评\n成绩").
pub fn normalize_header(text: &str) -> String {
    text.trim().replace(['\n', '\r'], "")
}

/// Role of a single header cell, if any
pub fn classify_header(header: &str) -> Option<(ColumnRole, u8)> {
    ROLE_RULES
        .iter()
        .filter(|rule| rule.pattern.matches(header))
        .min_by_key(|rule| Reverse(rule.rank))
        .map(|rule| (rule.role, rule.rank))
}

/// A group whose seed column lacked required roles
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedGroup {
    pub seed: usize,
    pub missing: Vec<ColumnRole>,
}

/// Everything the locator learned about one sheet's header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderLayout {
    pub row: usize,
    /// Complete groups, in seed-column order
    pub groups: Vec<ColumnMapping>,
    pub rejected: Vec<RejectedGroup>,
    /// Every class column of the header row
    pub class_columns: Vec<usize>,
}

/// Locate the header row and its column groups.
pub fn locate(grid: &Grid) -> Option<HeaderLayout> {
    let row = find_header_row(grid)?;
    let headers: Vec<String> = grid
        .row_text(row)
        .iter()
        .map(|t| normalize_header(t))
        .collect();

    let seeds: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.contains(ID_TOKEN))
        .map(|(col, _)| col)
        .collect();
    let class_columns: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| CLASS_LABELS.contains(&h.as_str()))
        .map(|(col, _)| col)
        .collect();

    let mut groups = Vec::new();
    let mut rejected = Vec::new();
    for seed in seeds {
        let window = group_window(seed, &class_columns, headers.len());
        match resolve_group(&headers, seed, window) {
            Ok(mapping) => groups.push(mapping),
            Err(missing) => rejected.push(RejectedGroup { seed, missing }),
        }
    }

    Some(HeaderLayout {
        row,
        groups,
        rejected,
        class_columns,
    })
}

/// First row containing both an id header and a name header.
pub fn find_header_row(grid: &Grid) -> Option<usize> {
    (0..grid.height().min(HEADER_SCAN_ROWS)).find(|&row| {
        let headers: Vec<String> = grid
            .row_text(row)
            .iter()
            .map(|t| normalize_header(t))
            .collect();
        headers.iter().any(|h| h.contains(ID_TOKEN)) && headers.iter().any(|h| h.contains(NAME_TOKEN))
    })
}

/// Columns a seed may draw roles from: from the nearest class column at or
/// left of the seed up to (not including) the next class column.
pub fn group_window(seed: usize, class_columns: &[usize], width: usize) -> Range<usize> {
    let start = class_columns
        .iter()
        .copied()
        .filter(|&c| c < seed)
        .max()
        .unwrap_or(0);
    let end = class_columns
        .iter()
        .copied()
        .filter(|&c| c > seed)
        .min()
        .unwrap_or(width);
    start..end
}

#[derive(Default)]
struct Candidates {
    best: [Option<(u8, usize)>; 6],
}

impl Candidates {
    fn slot(role: ColumnRole) -> usize {
        match role {
            ColumnRole::StudentId => 0,
            ColumnRole::Name => 1,
            ColumnRole::FinalScore => 2,
            ColumnRole::RegularScore => 3,
            ColumnRole::TotalScore => 4,
            ColumnRole::Class => 5,
        }
    }

    fn offer(&mut self, role: ColumnRole, rank: u8, col: usize) {
        let slot = &mut self.best[Self::slot(role)];
        match slot {
            Some((best_rank, _)) if *best_rank >= rank => {}
            _ => *slot = Some((rank, col)),
        }
    }

    fn get(&self, role: ColumnRole) -> Option<usize> {
        self.best[Self::slot(role)].map(|(_, col)| col)
    }
}

fn resolve_group(
    headers: &[String],
    seed: usize,
    window: Range<usize>,
) -> Result<ColumnMapping, Vec<ColumnRole>> {
    let mut candidates = Candidates::default();
    candidates.offer(ColumnRole::StudentId, u8::MAX, seed);

    for col in window {
        let Some(header) = headers.get(col) else {
            break;
        };
        if let Some((role, rank)) = classify_header(header) {
            candidates.offer(role, rank, col);
        }
    }

    let missing: Vec<ColumnRole> = ColumnRole::REQUIRED
        .into_iter()
        .filter(|&role| candidates.get(role).is_none())
        .collect();

    match (
        candidates.get(ColumnRole::Name),
        candidates.get(ColumnRole::FinalScore),
        candidates.get(ColumnRole::RegularScore),
        candidates.get(ColumnRole::TotalScore),
    ) {
        (Some(name), Some(final_score), Some(regular_score), Some(total_score)) => {
            Ok(ColumnMapping {
                student_id: seed,
                name,
                final_score,
                regular_score,
                total_score,
                class_col: candidates.get(ColumnRole::Class),
            })
        }
        _ => Err(missing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use pretty_assertions::assert_eq;

    fn grid(rows: &[&[&str]]) -> Grid {
        Grid::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|s| Cell::from(*s)).collect())
                .collect(),
        )
    }

    #[test]
    fn specific_total_beats_generic() {
        assert_eq!(classify_header("总成绩"), Some((ColumnRole::TotalScore, 2)));
        assert_eq!(classify_header("成绩"), Some((ColumnRole::TotalScore, 1)));
        assert_eq!(classify_header("平时成绩"), Some((ColumnRole::RegularScore, 2)));
        assert_eq!(classify_header("期末考试"), Some((ColumnRole::FinalScore, 2)));
        assert_eq!(classify_header("备注"), None);
    }

    #[test]
    fn multiline_header_is_normalized() {
        let header = normalize_header(" 总评\n成绩 ");
        assert_eq!(header, "总评成绩");
        assert_eq!(classify_header(&header), Some((ColumnRole::TotalScore, 2)));
    }

    #[test]
    fn single_group_detected() {
        let g = grid(&[
            &["高等数学成绩单"],
            &["序号", "学号", "姓名", "平时成绩", "期末成绩", "总评\n成绩"],
        ]);
        let layout = locate(&g).unwrap();
        assert_eq!(layout.row, 1);
        assert_eq!(
            layout.groups,
            vec![ColumnMapping {
                student_id: 1,
                name: 2,
                final_score: 4,
                regular_score: 3,
                total_score: 5,
                class_col: None,
            }]
        );
        assert!(layout.rejected.is_empty());
    }

    #[test]
    fn first_header_row_wins() {
        let g = grid(&[
            &["学号", "姓名", "平时", "期末", "总分"],
            &["学号", "姓名", "平时成绩", "期末成绩", "总成绩"],
        ]);
        assert_eq!(locate(&g).unwrap().row, 0);
    }

    #[test]
    fn generic_score_column_does_not_shadow_specific_total() {
        let g = grid(&[&["学号", "姓名", "成绩", "平时成绩", "期末成绩", "总成绩"]]);
        let layout = locate(&g).unwrap();
        assert_eq!(layout.groups[0].total_score, 5);
    }

    #[test]
    fn parallel_groups_bounded_by_class_columns() {
        let g = grid(&[&[
            "班级", "学号", "姓名", "平时", "期末", "总评", "班级", "学号", "姓名", "平时", "期末",
            "总评",
        ]]);
        let layout = locate(&g).unwrap();
        assert_eq!(layout.class_columns, vec![0, 6]);
        assert_eq!(layout.groups.len(), 2);

        let second = &layout.groups[1];
        assert_eq!(second.student_id, 7);
        assert_eq!(second.name, 8);
        assert_eq!(second.regular_score, 9);
        assert_eq!(second.final_score, 10);
        assert_eq!(second.total_score, 11);
        assert_eq!(second.class_col, Some(6));
        assert_eq!(layout.groups[0].class_col, Some(0));
    }

    #[test]
    fn incomplete_group_is_rejected_with_missing_roles() {
        let g = grid(&[&["学号", "姓名", "平时成绩"]]);
        let layout = locate(&g).unwrap();
        assert!(layout.groups.is_empty());
        assert_eq!(
            layout.rejected,
            vec![RejectedGroup {
                seed: 0,
                missing: vec![ColumnRole::FinalScore, ColumnRole::TotalScore],
            }]
        );
    }

    #[test]
    fn no_header_row() {
        let g = grid(&[&["姓名", "成绩"], &["张三", "90"]]);
        assert_eq!(locate(&g), None);
    }

    #[test]
    fn header_beyond_scan_limit_ignored() {
        let mut rows: Vec<Vec<Cell>> = vec![vec![Cell::Empty]; HEADER_SCAN_ROWS];
        rows.push(vec![Cell::from("学号"), Cell::from("姓名")]);
        assert_eq!(find_header_row(&Grid::from_rows(rows)), None);
    }

    #[test]
    fn window_edges() {
        assert_eq!(group_window(1, &[0, 6], 12), 0..6);
        assert_eq!(group_window(7, &[0, 6], 12), 6..12);
        assert_eq!(group_window(3, &[], 9), 0..9);
    }
}
