use serde::{Deserialize, Serialize};
use std::fmt;

/// One untyped value of the decoded sheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(s: &str) -> Self {
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Header row plus data rows of the single sheet being imported.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawMatrix {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawMatrix {
    /// Builds the matrix from every decoded row: the first non-empty row
    /// becomes the header and trailing empty rows are dropped.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Option<Self> {
        let is_blank = |row: &Vec<Cell>| row.iter().all(Cell::is_empty);

        let mut rows: Vec<Vec<Cell>> = rows.into_iter().skip_while(|r| is_blank(r)).collect();
        while rows.last().is_some_and(|r| is_blank(r)) {
            rows.pop();
        }
        if rows.is_empty() {
            return None;
        }

        let header_row = rows.remove(0);
        let headers = header_row.iter().map(|c| c.to_string().trim().to_string()).collect();
        Some(RawMatrix { headers, rows })
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }
}
