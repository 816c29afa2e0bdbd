use std::io;

use thiserror::Error;

/// Failure of one extraction call on one page.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read PDF structure: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to decode page content: {0}")]
    ContentDecode(String),
}

/// A raw table that cannot be turned into named columns.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("row {row} has {found} cells but the header has {expected}")]
    RowWiderThanHeader {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// The typed consolidation path could not run; the caller falls back to a raw
/// concatenation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsolidateError {
    #[error("table {table_index} on page {page} repeats column '{column}'")]
    DuplicateColumn {
        page: u32,
        table_index: usize,
        column: String,
    },

    #[error("table {table_index} on page {page} has a row of {found} cells for {expected} columns")]
    RaggedRow {
        page: u32,
        table_index: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Consolidate(#[from] ConsolidateError),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("no pages available after applying selection")]
    NoPagesSelected,
}
