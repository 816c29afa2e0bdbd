use std::fmt;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;

pub const ORIGIN_COLUMN: &str = "Origin";
pub const PAGE_COLUMN: &str = "Page";
pub const TABLE_INDEX_COLUMN: &str = "TableIndex";

/// Metadata columns in the order they are pinned to the front of the sheet.
pub const METADATA_COLUMNS: [&str; 3] = [ORIGIN_COLUMN, PAGE_COLUMN, TABLE_INDEX_COLUMN];

#[must_use]
pub fn is_metadata_column(name: &str) -> bool {
    METADATA_COLUMNS.contains(&name)
}

/// Rows of raw cell text as returned by an extraction strategy. The first row
/// holds header candidates.
pub type RawTable = Vec<Vec<Option<String>>>;

/// A positioned word on a page, in top-left-origin coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Money,
    Date,
    Percent,
    Number,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Financial,
    Date,
    Person,
    General,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    Integer(i64),
    Number(f64),
    /// A fraction, so `15,5%` is stored as `0.155`.
    Percent(f64),
    Date(NaiveDate),
}

impl CellValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

/// Renders a float the way a spreadsheet preview shows it: integral values
/// keep one decimal, everything else uses the shortest round-trip form.
#[must_use]
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Number(value) => f.write_str(&format_float(*value)),
            Self::Percent(value) => {
                let scaled = (value * 100.0 * 1e10).round() / 1e10;
                write!(f, "{}%", format_float(scaled))
            }
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// One table found on one page, with its provenance columns appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTable {
    pub page: u32,
    pub table_index: usize,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// Type each data column was coerced to. Empty until coercion runs.
    pub column_types: IndexMap<String, ColumnType>,
}

impl ExtractedTable {
    #[must_use]
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    #[must_use]
    pub fn column_values(&self, index: usize) -> Vec<&CellValue> {
        self.rows.iter().filter_map(|row| row.get(index)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub table_count: usize,
    /// Coerced type per column, first table wins. Columns missing here were
    /// never coerced and are typed from their text when the sheet is planned.
    pub column_types: IndexMap<String, ColumnType>,
}

impl ConsolidatedTable {
    #[must_use]
    pub fn column_values(&self, index: usize) -> Vec<&CellValue> {
        self.rows.iter().filter_map(|row| row.get(index)).collect()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
