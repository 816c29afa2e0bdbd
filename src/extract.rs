use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::context::derive_provenance;
use crate::error::TableError;
use crate::header::normalize_headers_reserving;
use crate::model::{CellValue, ExtractedTable, METADATA_COLUMNS, RawTable};
use crate::page::{ExtractionStrategy, TablePage};
use crate::warning::{ConvertWarning, WarningCode};

/// A row survives sparse-row filtering only with more non-blank cells than
/// this share of its width.
pub const DEFAULT_MIN_ROW_FILL: f32 = 0.3;

fn is_plausible(tables: &[RawTable]) -> bool {
    tables.iter().any(|table| table.len() > 1)
}

/// Runs `strategies` in order and keeps the first plausible result. A failing
/// strategy is skipped; when none is plausible the last successful result
/// stands.
pub(crate) fn select_tables<P: TablePage + ?Sized>(
    page: &P,
    strategies: &[ExtractionStrategy],
) -> Vec<RawTable> {
    let mut selected = Vec::new();
    for strategy in strategies {
        match page.extract_tables(*strategy) {
            Ok(tables) => {
                let plausible = is_plausible(&tables);
                debug!(
                    page = page.page_number(),
                    %strategy,
                    tables = tables.len(),
                    plausible,
                    "extraction strategy finished"
                );
                selected = tables;
                if plausible {
                    break;
                }
            }
            Err(error) => {
                debug!(page = page.page_number(), %strategy, %error, "extraction strategy failed");
            }
        }
    }
    selected
}

#[allow(clippy::cast_precision_loss)]
fn keep_row(row: &[CellValue], min_row_fill: f32) -> bool {
    if row.iter().all(CellValue::is_null) {
        return false;
    }
    let filled = row.iter().filter(|cell| !cell.is_blank()).count();
    filled as f32 > row.len() as f32 * min_row_fill
}

/// Names the columns of `table` from its first row and returns the data rows
/// that survive sparse-row filtering. Short rows are padded with nulls.
pub(crate) fn build_rows(
    table: &RawTable,
    min_row_fill: f32,
) -> Result<(Vec<String>, Vec<Vec<CellValue>>), TableError> {
    let Some((header, data)) = table.split_first() else {
        return Ok((Vec::new(), Vec::new()));
    };
    let columns = normalize_headers_reserving(header, &METADATA_COLUMNS);

    let mut rows = Vec::with_capacity(data.len());
    for (index, raw_row) in data.iter().enumerate() {
        if raw_row.len() > columns.len() {
            return Err(TableError::RowWiderThanHeader {
                row: index + 1,
                expected: columns.len(),
                found: raw_row.len(),
            });
        }
        let mut row = raw_row
            .iter()
            .cloned()
            .map(CellValue::from)
            .collect::<Vec<_>>();
        row.resize(columns.len(), CellValue::Null);
        if keep_row(&row, min_row_fill) {
            rows.push(row);
        }
    }

    Ok((columns, rows))
}

#[allow(clippy::cast_possible_wrap)]
fn with_metadata(
    mut columns: Vec<String>,
    mut rows: Vec<Vec<CellValue>>,
    origin: &str,
    page: u32,
    table_index: usize,
) -> ExtractedTable {
    columns.extend(METADATA_COLUMNS.iter().map(|name| (*name).to_string()));
    for row in &mut rows {
        row.push(CellValue::Text(origin.to_string()));
        row.push(CellValue::Integer(i64::from(page)));
        row.push(CellValue::Integer(table_index as i64));
    }
    ExtractedTable {
        page,
        table_index,
        columns,
        rows,
        column_types: IndexMap::new(),
    }
}

/// Extracts every usable table of one page. Tables with a shape problem are
/// skipped with a warning; the page never fails as a whole.
pub(crate) fn extract_page_tables<P: TablePage + ?Sized>(
    page: &P,
    strategies: &[ExtractionStrategy],
    min_row_fill: f32,
    warnings: &mut Vec<ConvertWarning>,
) -> Vec<ExtractedTable> {
    let page_number = page.page_number();
    let mut out = Vec::new();

    for (offset, raw) in select_tables(page, strategies).iter().enumerate() {
        let table_index = offset + 1;
        if raw.len() <= 1 {
            continue;
        }

        let (columns, rows) = match build_rows(raw, min_row_fill) {
            Ok(built) => built,
            Err(error) => {
                let message = format!("skipping table on page {page_number}: {error}");
                warn!(page = page_number, table_index, "{message}");
                warnings.push(
                    ConvertWarning::new(WarningCode::TableSkipped, message)
                        .with_page(page_number)
                        .with_table_index(table_index),
                );
                continue;
            }
        };
        if rows.is_empty() {
            continue;
        }

        let origin = derive_provenance(page, raw, table_index);
        debug!(page = page_number, table_index, %origin, rows = rows.len(), "table extracted");
        out.push(with_metadata(columns, rows, &origin, page_number, table_index));
    }

    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::model::CellValue;
    use crate::page::test_support::{MemoryPage, raw};
    use crate::page::{ExtractionStrategy, LineMode};
    use crate::warning::WarningCode;

    use super::{DEFAULT_MIN_ROW_FILL, build_rows, extract_page_tables, select_tables};

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    #[test]
    fn first_plausible_strategy_wins() {
        let mut page = MemoryPage::new(1, &[]).with_text_tables(vec![raw(&[&["only header"]])]);
        page.lines_tables = Some(vec![raw(&[&["A", "B"], &["1", "2"]])]);
        page.strict_tables = Some(vec![raw(&[&["C"], &["3"], &["4"]])]);

        let tables = select_tables(&page, &ExtractionStrategy::default_order());
        assert_eq!(tables, vec![raw(&[&["A", "B"], &["1", "2"]])]);
    }

    #[test]
    fn failing_strategies_are_skipped_and_last_success_kept() {
        let mut page = MemoryPage::new(1, &[]).with_text_tables(vec![raw(&[&["H"]])]);
        page.lines_tables = None;
        page.strict_tables = None;

        let tables = select_tables(&page, &ExtractionStrategy::default_order());
        assert_eq!(tables, vec![raw(&[&["H"]])]);

        let only_failures = [ExtractionStrategy::uniform(LineMode::Lines)];
        assert!(select_tables(&page, &only_failures).is_empty());
    }

    #[test]
    fn pads_short_rows_and_drops_sparse_ones() {
        let table = vec![
            vec![Some("A".to_string()), Some("B".to_string()), Some("C".to_string())],
            vec![Some("1".to_string())],
            vec![None, None, None],
            vec![Some("2".to_string()), Some("3".to_string()), Some(String::new())],
        ];
        let (columns, rows) = build_rows(&table, DEFAULT_MIN_ROW_FILL).expect("table is valid");
        assert_eq!(columns, vec!["A", "B", "C"]);
        assert_eq!(
            rows,
            vec![
                vec![text("1"), CellValue::Null, CellValue::Null],
                vec![text("2"), text("3"), text("")],
            ]
        );
    }

    #[test]
    fn rows_wider_than_header_are_rejected() {
        let table = raw(&[&["A"], &["1", "2"]]);
        assert!(build_rows(&table, DEFAULT_MIN_ROW_FILL).is_err());
    }

    #[test]
    fn appends_metadata_and_warns_on_bad_tables() {
        let page = MemoryPage::new(3, &["Extrato", "Data Valor", "01/01/2023 10,00"])
            .with_text_tables(vec![
                raw(&[&["Data", "Valor"], &["01/01/2023", "10,00"]]),
                raw(&[&["X"], &["1", "2"]]),
                raw(&[&["Y"]]),
            ]);
        let mut warnings = Vec::new();

        let tables = extract_page_tables(
            &page,
            &ExtractionStrategy::default_order(),
            DEFAULT_MIN_ROW_FILL,
            &mut warnings,
        );

        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(
            table.columns,
            vec!["Data", "Valor", "Origin", "Page", "TableIndex"]
        );
        assert_eq!(
            table.rows[0],
            vec![
                text("01/01/2023"),
                text("10,00"),
                text("Extrato"),
                CellValue::Integer(3),
                CellValue::Integer(1),
            ]
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, WarningCode::TableSkipped);
        assert_eq!(warnings[0].table_index, Some(2));
    }
}
