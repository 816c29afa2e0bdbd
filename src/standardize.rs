use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::classify::classify_table;
use crate::model::{ExtractedTable, TableKind};

#[derive(Debug, Default)]
struct Variants {
    counts: IndexMap<String, usize>,
}

impl Variants {
    fn record(&mut self, label: &str) {
        *self.counts.entry(label.to_string()).or_insert(0) += 1;
    }

    /// Most frequent spelling; the first one seen wins a tie.
    fn canonical(&self) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for (label, count) in &self.counts {
            if best.is_none_or(|(_, best_count)| *count > best_count) {
                best = Some((label.as_str(), *count));
            }
        }
        best.map(|(label, _)| label)
    }
}

fn canonical_labels(tables: &[&ExtractedTable]) -> IndexMap<String, String> {
    let mut frequency: IndexMap<String, Variants> = IndexMap::new();
    for table in tables {
        for column in &table.columns {
            frequency
                .entry(column.to_lowercase())
                .or_default()
                .record(column);
        }
    }

    frequency
        .iter()
        .filter_map(|(key, variants)| {
            variants
                .canonical()
                .map(|label| (key.clone(), label.to_string()))
        })
        .collect()
}

fn rename_columns(table: &ExtractedTable, canonical: &IndexMap<String, String>) -> ExtractedTable {
    let mut taken = table.columns.iter().cloned().collect::<HashSet<_>>();
    let mut columns = Vec::with_capacity(table.columns.len());

    for column in &table.columns {
        let target = canonical
            .get(&column.to_lowercase())
            .filter(|target| *target != column);
        match target {
            // A rename onto a label the table already carries would merge two
            // columns, so that column keeps its own spelling.
            Some(target) if !taken.contains(target) => {
                debug!(from = %column, to = %target, "standardized column label");
                taken.remove(column);
                taken.insert(target.clone());
                columns.push(target.clone());
            }
            _ => columns.push(column.clone()),
        }
    }

    let column_types = table
        .columns
        .iter()
        .zip(&columns)
        .filter_map(|(old, new)| {
            table
                .column_types
                .get(old)
                .map(|column_type| (new.clone(), *column_type))
        })
        .collect();

    ExtractedTable {
        columns,
        column_types,
        ..table.clone()
    }
}

/// Reconciles column-name spellings that differ only in case within each group
/// of tables sharing a [`TableKind`]. Only labels change; values, row counts
/// and the order of `tables` are preserved.
#[must_use]
pub fn standardize_columns(tables: &[ExtractedTable]) -> Vec<ExtractedTable> {
    let kinds = tables
        .iter()
        .map(|table| classify_table(&table.columns))
        .collect::<Vec<_>>();

    let mut groups: IndexMap<TableKind, Vec<&ExtractedTable>> = IndexMap::new();
    for (table, kind) in tables.iter().zip(&kinds) {
        groups.entry(*kind).or_default().push(table);
    }

    let canonical_by_kind = groups
        .iter()
        .map(|(kind, members)| (*kind, canonical_labels(members)))
        .collect::<IndexMap<_, _>>();

    tables
        .iter()
        .zip(&kinds)
        .map(|(table, kind)| match canonical_by_kind.get(kind) {
            Some(canonical) => rename_columns(table, canonical),
            None => table.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use crate::model::{CellValue, ExtractedTable};

    use super::standardize_columns;

    fn table(index: usize, columns: &[&str]) -> ExtractedTable {
        ExtractedTable {
            page: 1,
            table_index: index,
            columns: columns.iter().map(|column| (*column).to_string()).collect(),
            rows: vec![vec![CellValue::Null; columns.len()]],
            column_types: IndexMap::new(),
        }
    }

    fn labels(tables: &[ExtractedTable]) -> Vec<Vec<String>> {
        tables.iter().map(|table| table.columns.clone()).collect()
    }

    #[test]
    fn most_frequent_spelling_wins_within_group() {
        let tables = vec![
            table(1, &["Data", "Valor", "Total"]),
            table(2, &["data", "Valor", "Total"]),
            table(3, &["DATA", "valor", "Total"]),
        ];
        let standardized = standardize_columns(&tables);
        assert_eq!(
            labels(&standardized),
            vec![vec!["Data", "Valor", "Total"]; 3]
        );
    }

    #[test]
    fn ties_resolve_to_first_seen_spelling() {
        let tables = vec![table(1, &["Data", "Obs"]), table(2, &["data", "Mês"])];
        let standardized = standardize_columns(&tables);
        assert_eq!(standardized[1].columns, vec!["Data", "Mês"]);
    }

    #[test]
    fn groups_do_not_rename_each_other() {
        let tables = vec![
            table(1, &["Nome", "CPF", "obs"]),
            table(2, &["Valor", "Saldo", "OBS"]),
        ];
        let standardized = standardize_columns(&tables);
        assert_eq!(labels(&standardized), labels(&tables));
    }

    #[test]
    fn keeps_order_and_values() {
        let tables = vec![
            table(1, &["Nome", "CPF"]),
            table(2, &["Data", "Dia"]),
            table(3, &["nome", "cpf"]),
        ];
        let standardized = standardize_columns(&tables);
        let indices = standardized
            .iter()
            .map(|table| table.table_index)
            .collect::<Vec<_>>();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(standardized[2].columns, vec!["Nome", "CPF"]);
        assert_eq!(standardized[2].rows, tables[2].rows);
    }

    #[test]
    fn rerun_is_a_no_op() {
        let tables = vec![
            table(1, &["Data", "Valor"]),
            table(2, &["data", "Valor", "Obs"]),
            table(3, &["DATA", "valor"]),
        ];
        let once = standardize_columns(&tables);
        let twice = standardize_columns(&once);
        assert_eq!(labels(&once), labels(&twice));
    }

    #[test]
    fn never_introduces_duplicate_labels() {
        let tables = vec![
            table(1, &["Data", "Valor"]),
            table(2, &["Data", "Valor"]),
            table(3, &["data", "Data", "Valor"]),
        ];
        let standardized = standardize_columns(&tables);
        assert_eq!(standardized[2].columns, vec!["data", "Data", "Valor"]);
    }
}
