//! Cell grid scanner
//!
//! Wraps one worksheet as a rectangular grid addressed from A1. The rest of
//! the parser only sees cells through [`Grid::cell`] and [`Cell::text`].

use calamine::{Data, Range};

static EMPTY: Cell = Cell::Empty;

/// A raw worksheet value
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
}

impl Cell {
    /// Trimmed string form of the cell.
    ///
    /// Whole numbers print without a fractional part so numeric student
    /// ids read the same as their text counterparts.
    pub fn text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => b.to_string(),
            Self::Error(e) => e.clone(),
        }
    }

    /// True for missing cells and whitespace-only text
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
            Self::Bool(_) | Self::Error(_) => false,
        }
    }

    /// Numeric value of the cell, parsing text when needed
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Empty | Self::Bool(_) | Self::Error(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Self::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Self::Text(s.clone()),
            Data::Int(i) => Self::Number(*i as f64),
            Data::Float(f) => Self::Number(*f),
            Data::Bool(b) => Self::Bool(*b),
            Data::DateTime(dt) => Self::Number(dt.as_f64()),
            Data::Error(e) => Self::Error(format!("{:?}", e)),
        }
    }
}

/// Rectangular view of one worksheet
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    width: usize,
}

impl Grid {
    /// Build a grid from rows starting at A1; short rows are padded.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { rows, width }
    }

    /// Build a grid from a calamine range, keeping absolute positions.
    pub fn from_range(range: &Range<Data>) -> Self {
        let Some((start_row, start_col)) = range.start() else {
            return Self::default();
        };
        let (start_row, start_col) = (start_row as usize, start_col as usize);
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row];
        for source in range.rows() {
            let mut row = vec![Cell::Empty; start_col];
            row.extend(source.iter().map(Cell::from));
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Cell at (row, col); out-of-range positions read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Text of every cell in `row`
    pub fn row_text(&self, row: usize) -> Vec<String> {
        (0..self.width).map(|col| self.cell(row, col).text()).collect()
    }
}
