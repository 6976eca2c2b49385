//! Text tables printed by the database CLI's `sql` command.
//!
//! ```text
//!  id | node_id
//! ----+---------
//!  4  | 2
//!  5  | 3
//! ```

use crate::ControlPlaneError;
use crate::Result;

/// One result row, cells keyed by column name in header order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new<I, K, V>(cells: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(
        &self,
        column: &str,
    ) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn text(
        &self,
        column: &str,
    ) -> Result<&str> {
        self.get(column).ok_or_else(|| {
            ControlPlaneError::MissingColumn {
                column: column.to_string(),
            }
            .into()
        })
    }

    /// Integer held by the cell: its first run of ASCII digits.
    pub fn int(
        &self,
        column: &str,
    ) -> Result<u64> {
        let value = self.text(column)?;
        first_integer(value).ok_or_else(|| {
            ControlPlaneError::InvalidInteger {
                column: column.to_string(),
                value: value.to_string(),
            }
            .into()
        })
    }
}

/// Record type decoded from a [`Row`]
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(
        columns: Vec<String>,
        rows: Vec<Row>,
    ) -> Self {
        Self { columns, rows }
    }

    /// Parses CLI output. A result with no data rows is an empty table.
    pub fn parse(text: &str) -> Self {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let columns: Vec<String> = match lines.next() {
            Some(header) => split_cells(header),
            None => return Self::default(),
        };

        // separator
        lines.next();

        let rows = lines
            .map(|line| Row::new(columns.iter().cloned().zip(split_cells(line))))
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn decode<T: FromRow>(&self) -> Result<Vec<T>> {
        self.rows.iter().map(T::from_row).collect()
    }

    /// First row decoded, `None` for an empty result.
    pub fn decode_first<T: FromRow>(&self) -> Result<Option<T>> {
        self.rows.first().map(T::from_row).transpose()
    }
}

fn split_cells(line: &str) -> Vec<String> {
    line.split('|').map(|cell| cell.trim().to_string()).collect()
}

pub(crate) fn first_integer(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
