use indexmap::{IndexMap, IndexSet};

use crate::error::ConsolidateError;
use crate::model::{CellValue, ColumnType, ConsolidatedTable, ExtractedTable, METADATA_COLUMNS};

fn validate(table: &ExtractedTable) -> Result<(), ConsolidateError> {
    let mut seen = IndexSet::with_capacity(table.columns.len());
    for column in &table.columns {
        if !seen.insert(column.as_str()) {
            return Err(ConsolidateError::DuplicateColumn {
                page: table.page,
                table_index: table.table_index,
                column: column.clone(),
            });
        }
    }
    if let Some(row) = table.rows.iter().find(|row| row.len() != table.columns.len()) {
        return Err(ConsolidateError::RaggedRow {
            page: table.page,
            table_index: table.table_index,
            expected: table.columns.len(),
            found: row.len(),
        });
    }
    Ok(())
}

fn union_of_columns(tables: &[ExtractedTable]) -> IndexSet<String> {
    tables
        .iter()
        .flat_map(|table| table.columns.iter().cloned())
        .collect()
}

/// Coerced type of every column in `columns`, taken from the first table that
/// typed it.
fn merge_column_types(tables: &[ExtractedTable], columns: &[String]) -> IndexMap<String, ColumnType> {
    columns
        .iter()
        .filter_map(|column| {
            tables
                .iter()
                .find_map(|table| table.column_types.get(column))
                .map(|column_type| (column.clone(), *column_type))
        })
        .collect()
}

/// Stacks the rows of every table under `columns`. A cell takes the first
/// source column with its label; labels the table lacks stay null.
fn stack_rows(tables: &[ExtractedTable], columns: &[String]) -> Vec<Vec<CellValue>> {
    let mut rows = Vec::new();
    for table in tables {
        let positions = columns
            .iter()
            .map(|column| table.column_position(column))
            .collect::<Vec<_>>();
        for row in &table.rows {
            rows.push(
                positions
                    .iter()
                    .map(|position| {
                        position
                            .and_then(|index| row.get(index))
                            .cloned()
                            .unwrap_or(CellValue::Null)
                    })
                    .collect(),
            );
        }
    }
    rows
}

/// Unions the columns of `tables` and stacks their rows in input order. The
/// metadata columns that are present come first; the rest keep the order in
/// which they were first seen.
///
/// # Errors
///
/// Fails when a table repeats a column label or has a row whose width does
/// not match its columns.
pub fn consolidate(tables: &[ExtractedTable]) -> Result<ConsolidatedTable, ConsolidateError> {
    for table in tables {
        validate(table)?;
    }

    let union = union_of_columns(tables);
    let mut columns = METADATA_COLUMNS
        .iter()
        .filter(|name| union.contains(**name))
        .map(|name| (*name).to_string())
        .collect::<Vec<_>>();
    columns.extend(
        union
            .iter()
            .filter(|column| !METADATA_COLUMNS.contains(&column.as_str()))
            .cloned(),
    );

    let rows = stack_rows(tables, &columns);
    Ok(ConsolidatedTable {
        column_types: merge_column_types(tables, &columns),
        columns,
        rows,
        table_count: tables.len(),
    })
}

/// Best-effort outer union that never fails: columns in first-seen order, no
/// reordering and no validation.
#[must_use]
pub fn concat_raw(tables: &[ExtractedTable]) -> ConsolidatedTable {
    let columns = union_of_columns(tables).into_iter().collect::<Vec<_>>();
    let rows = stack_rows(tables, &columns);
    ConsolidatedTable {
        column_types: merge_column_types(tables, &columns),
        columns,
        rows,
        table_count: tables.len(),
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use crate::error::ConsolidateError;
    use crate::model::{CellValue, ColumnType, ExtractedTable};

    use super::{concat_raw, consolidate};

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    fn table(page: u32, columns: &[&str], rows: Vec<Vec<CellValue>>) -> ExtractedTable {
        ExtractedTable {
            page,
            table_index: 1,
            columns: columns.iter().map(|column| (*column).to_string()).collect(),
            rows,
            column_types: IndexMap::new(),
        }
    }

    #[test]
    fn unions_columns_and_fills_missing_cells_with_null() {
        let first = table(
            1,
            &["A", "B", "Origin", "Page", "TableIndex"],
            vec![
                vec![text("a1"), text("b1"), text("p1"), CellValue::Integer(1), CellValue::Integer(1)],
                vec![text("a2"), text("b2"), text("p1"), CellValue::Integer(1), CellValue::Integer(1)],
            ],
        );
        let second = table(
            2,
            &["B", "C", "Origin", "Page", "TableIndex"],
            vec![vec![
                text("b3"),
                text("c3"),
                text("p2"),
                CellValue::Integer(2),
                CellValue::Integer(1),
            ]],
        );

        let consolidated = consolidate(&[first, second]).expect("tables are well formed");
        assert_eq!(
            consolidated.columns,
            vec!["Origin", "Page", "TableIndex", "A", "B", "C"]
        );
        assert_eq!(consolidated.row_count(), 3);
        assert_eq!(consolidated.table_count, 2);
        assert_eq!(
            consolidated.rows[2],
            vec![
                text("p2"),
                CellValue::Integer(2),
                CellValue::Integer(1),
                CellValue::Null,
                text("b3"),
                text("c3"),
            ]
        );
        assert!(consolidated.rows[..2].iter().all(|row| row[5].is_null()));
    }

    #[test]
    fn only_present_metadata_columns_move_first() {
        let only = table(1, &["X", "Page"], vec![vec![text("x"), CellValue::Integer(4)]]);
        let consolidated = consolidate(&[only]).expect("table is well formed");
        assert_eq!(consolidated.columns, vec!["Page", "X"]);
        assert_eq!(consolidated.rows[0], vec![CellValue::Integer(4), text("x")]);
    }

    #[test]
    fn keeps_the_first_coerced_type_of_each_column() {
        let mut first = table(1, &["Qtd", "Page"], vec![vec![CellValue::Number(1.0), CellValue::Integer(1)]]);
        first.column_types.insert("Qtd".to_string(), ColumnType::Number);
        let mut second = table(2, &["Qtd", "Total"], vec![vec![CellValue::Number(2.0), text("x")]]);
        second.column_types.insert("Qtd".to_string(), ColumnType::Money);
        second.column_types.insert("Total".to_string(), ColumnType::Text);

        let consolidated = consolidate(&[first, second]).expect("tables are well formed");
        assert_eq!(consolidated.column_types.get("Qtd"), Some(&ColumnType::Number));
        assert_eq!(consolidated.column_types.get("Total"), Some(&ColumnType::Text));
        assert!(!consolidated.column_types.contains_key("Page"));
    }

    #[test]
    fn rejects_duplicate_labels_and_ragged_rows() {
        let duplicate = table(1, &["A", "A"], vec![vec![text("1"), text("2")]]);
        assert_eq!(
            consolidate(&[duplicate]),
            Err(ConsolidateError::DuplicateColumn {
                page: 1,
                table_index: 1,
                column: "A".to_string(),
            })
        );

        let ragged = table(3, &["A", "B"], vec![vec![text("1")]]);
        assert!(matches!(
            consolidate(&[ragged]),
            Err(ConsolidateError::RaggedRow { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn raw_concatenation_tolerates_malformed_tables() {
        let duplicate = table(1, &["A", "A", "Page"], vec![vec![text("1"), text("2")]]);
        let other = table(2, &["B"], vec![vec![text("3")]]);
        let merged = concat_raw(&[duplicate, other]);
        assert_eq!(merged.columns, vec!["A", "Page", "B"]);
        assert_eq!(
            merged.rows,
            vec![
                vec![text("1"), CellValue::Null, CellValue::Null],
                vec![CellValue::Null, CellValue::Null, text("3")],
            ]
        );
    }
}
