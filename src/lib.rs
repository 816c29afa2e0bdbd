mod classify;
mod context;
mod convert;
mod csv_out;
mod detect;
mod error;
mod extract;
mod format;
mod header;
mod merge;
mod model;
mod options;
mod page;
mod pdf_reader;
mod standardize;
mod table_detect;
mod table_parse;
mod warning;
mod xlsx_out;

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::csv_out::preview_rows;
use crate::extract::extract_page_tables;
use crate::format::plan_layout;
use crate::xlsx_out::{write_fallback_xlsx, write_table_xlsx};

pub use classify::classify_table;
pub use context::{default_provenance, derive_provenance};
pub use convert::{coerce_cell, coerce_table, convert_to_date, convert_to_numeric, convert_to_percent};
pub use csv_out::write_preview_csv;
pub use detect::{DetectionProfile, ValuePatterns, detect_column_type, sample_values};
pub use error::{ConsolidateError, ConvertError, ExtractError, TableError};
pub use extract::DEFAULT_MIN_ROW_FILL;
pub use format::{CellStyle, FormatProfile, SheetLayout};
pub use header::normalize_headers;
pub use merge::{concat_raw, consolidate};
pub use model::{
    CellValue, ColumnType, ConsolidatedTable, ExtractedTable, METADATA_COLUMNS, ORIGIN_COLUMN,
    PAGE_COLUMN, RawTable, TABLE_INDEX_COLUMN, TableKind, Word,
};
pub use options::{ConvertOptions, DEFAULT_PREVIEW_ROWS, DEFAULT_SHEET_NAME, PageSelection};
pub use page::{ExtractionStrategy, LineMode, TablePage};
pub use pdf_reader::{PdfDocument, PdfPage};
pub use standardize::standardize_columns;
pub use warning::{ConvertWarning, WarningCode};
pub use xlsx_out::FALLBACK_SHEET_NAME;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    pub table_count: usize,
    pub row_count: usize,
    pub columns: Vec<String>,
    /// Leading consolidated rows rendered as text.
    pub preview: Vec<Vec<String>>,
    pub warnings: Vec<ConvertWarning>,
    /// The typed consolidation failed and the raw tables were stacked instead.
    pub used_fallback: bool,
}

fn typed_consolidation(
    tables: &[ExtractedTable],
    detection: &DetectionProfile,
) -> Result<ConsolidatedTable, ConsolidateError> {
    let coerced = standardize_columns(tables)
        .iter()
        .map(|table| coerce_table(table, detection))
        .collect::<Vec<_>>();
    consolidate(&coerced)
}

fn extract_tables<P: TablePage>(
    pages: &[P],
    options: &ConvertOptions,
    warnings: &mut Vec<ConvertWarning>,
) -> Vec<ExtractedTable> {
    let mut tables = Vec::new();
    for page in pages {
        tables.extend(extract_page_tables(
            page,
            &options.strategies,
            options.min_row_fill,
            warnings,
        ));
    }
    tables
}

fn render(table: &ConsolidatedTable, options: &ConvertOptions) -> Result<Vec<u8>, ConvertError> {
    let layout = plan_layout(table, &options.detection);
    write_table_xlsx(table, &layout, &options.format, options.sheet_name.trim())
}

/// Consolidates with types and renders the sheet. Any failure on that path
/// falls back to the raw tables stacked as text.
fn consolidate_and_render(
    tables: &[ExtractedTable],
    options: &ConvertOptions,
    warnings: &mut Vec<ConvertWarning>,
) -> Result<(ConsolidatedTable, Vec<u8>, bool), ConvertError> {
    let typed = typed_consolidation(tables, &options.detection)
        .map_err(ConvertError::from)
        .and_then(|table| render(&table, options).map(|bytes| (table, bytes)));

    match typed {
        Ok((table, bytes)) => Ok((table, bytes, false)),
        Err(error) => {
            let message = format!("typed consolidation failed, stacking raw tables: {error}");
            warn!("{message}");
            warnings.push(ConvertWarning::new(WarningCode::ConsolidationFallback, message));
            let table = concat_raw(tables);
            let bytes = render(&table, options)?;
            Ok((table, bytes, true))
        }
    }
}

fn run<P: TablePage>(
    pages: &[P],
    options: &ConvertOptions,
) -> Result<(Vec<u8>, ConversionReport), ConvertError> {
    let mut warnings = Vec::new();
    let tables = extract_tables(pages, options, &mut warnings);

    if tables.is_empty() {
        let message = "no valid table was found in the selected pages";
        warn!("{message}");
        warnings.push(ConvertWarning::new(WarningCode::NoTablesFound, message));
        let bytes = write_fallback_xlsx(&options.format)?;
        return Ok((
            bytes,
            ConversionReport {
                table_count: 0,
                row_count: 0,
                columns: Vec::new(),
                preview: Vec::new(),
                warnings,
                used_fallback: false,
            },
        ));
    }

    let (table, bytes, used_fallback) = consolidate_and_render(&tables, options, &mut warnings)?;
    info!(
        tables = table.table_count,
        rows = table.row_count(),
        columns = table.columns.len(),
        used_fallback,
        "tables consolidated"
    );
    Ok((
        bytes,
        ConversionReport {
            table_count: table.table_count,
            row_count: table.row_count(),
            preview: preview_rows(&table, options.preview_rows),
            columns: table.columns,
            warnings,
            used_fallback,
        },
    ))
}

/// Runs extraction, consolidation and formatting over `pages` and returns the
/// workbook bytes.
///
/// # Errors
///
/// Fails on invalid options or when the workbook cannot be serialized.
/// Problems with single tables only add warnings to the report.
pub fn convert_pages<P: TablePage>(
    pages: &[P],
    options: &ConvertOptions,
) -> Result<(Vec<u8>, ConversionReport), ConvertError> {
    options.validate().map_err(ConvertError::InvalidOption)?;
    run(pages, options)
}

/// Converts the PDF at `input_pdf` and writes the workbook to `output_xlsx`.
///
/// # Errors
///
/// Fails when the PDF cannot be read, no page is selected or the workbook
/// cannot be written.
pub fn convert_pdf_to_xlsx(
    input_pdf: &Path,
    output_xlsx: &Path,
    options: &ConvertOptions,
) -> Result<ConversionReport, ConvertError> {
    options.validate().map_err(ConvertError::InvalidOption)?;

    let document = PdfDocument::load(input_pdf)?;
    let pages = document.pages(options.pages.as_ref())?;
    let (bytes, report) = run(&pages, options)?;
    std::fs::write(output_xlsx, bytes)?;
    Ok(report)
}

/// Converts an uploaded PDF held in memory. The bytes are spooled to a
/// temporary file that is removed as soon as the document is loaded, whether
/// loading succeeds or not.
///
/// # Errors
///
/// Same as [`convert_pdf_to_xlsx`], plus failures creating the temporary file.
pub fn convert_pdf_bytes_to_xlsx(
    input_pdf: &[u8],
    options: &ConvertOptions,
) -> Result<(Vec<u8>, ConversionReport), ConvertError> {
    options.validate().map_err(ConvertError::InvalidOption)?;

    let document = {
        let mut spool = tempfile::Builder::new()
            .prefix("pdf2xlsx-")
            .suffix(".pdf")
            .tempfile()?;
        spool.write_all(input_pdf)?;
        spool.flush()?;
        PdfDocument::load(spool.path())?
    };
    let pages = document.pages(options.pages.as_ref())?;
    run(&pages, options)
}
