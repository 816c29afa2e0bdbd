use tracing::debug;

use crate::error::ExtractError;
use crate::model::RawTable;
use crate::page::TablePage;

/// Lines kept from the text directly above a table.
pub const CONTEXT_LINES_ABOVE: usize = 7;
/// Lines kept from the end of the page when nothing above the table is found.
pub const CONTEXT_LINES_PAGE_TAIL: usize = 3;

#[must_use]
pub fn default_provenance(page: u32, table_index: usize) -> String {
    format!("Page {page}, Table {table_index}")
}

fn last_lines(text: &str, count: usize) -> Option<String> {
    let lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();
    if lines.is_empty() {
        return None;
    }
    let start = lines.len().saturating_sub(count);
    Some(lines[start..].join(" "))
}

fn table_top<P: TablePage + ?Sized>(page: &P, table: &RawTable) -> Result<Option<f32>, ExtractError> {
    let cells = table
        .iter()
        .flatten()
        .filter_map(|cell| cell.as_deref().map(str::trim))
        .filter(|cell| !cell.is_empty())
        .collect::<Vec<_>>();
    if cells.is_empty() {
        return Ok(None);
    }

    let top = page
        .words()?
        .into_iter()
        .find(|word| cells.iter().any(|cell| word.text.contains(cell)))
        .map(|word| word.top)
        .filter(|top| *top > 0.0);
    Ok(top)
}

fn text_above_table<P: TablePage + ?Sized>(
    page: &P,
    table: &RawTable,
) -> Result<Option<String>, ExtractError> {
    let Some(top) = table_top(page, table)? else {
        return Ok(None);
    };
    Ok(last_lines(&page.text_above(top)?, CONTEXT_LINES_ABOVE))
}

/// Describes where `table` came from: the text lines just above it, else the
/// tail of the page text, else `Page <n>, Table <m>`. Extraction failures only
/// downgrade the result.
#[must_use]
pub fn derive_provenance<P: TablePage + ?Sized>(
    page: &P,
    table: &RawTable,
    table_index: usize,
) -> String {
    let page_number = page.page_number();
    match text_above_table(page, table) {
        Ok(Some(context)) => return context,
        Ok(None) => {}
        Err(error) => {
            debug!(page = page_number, table_index, %error, "could not locate text above table");
        }
    }

    match page.text() {
        Ok(text) => {
            if let Some(tail) = last_lines(&text, CONTEXT_LINES_PAGE_TAIL) {
                return tail;
            }
        }
        Err(error) => {
            debug!(page = page_number, table_index, %error, "could not read page text");
        }
    }

    default_provenance(page_number, table_index)
}

#[cfg(test)]
mod tests {
    use crate::page::test_support::{MemoryPage, raw};

    use super::derive_provenance;

    #[test]
    fn uses_up_to_seven_lines_above_table() {
        let page = MemoryPage::new(
            1,
            &[
                "l1", "l2", "l3", "l4", "l5", "l6", "l7", "l8", "Data Valor", "01/01/2023 10,00",
            ],
        );
        let table = raw(&[&["Data", "Valor"], &["01/01/2023", "10,00"]]);
        assert_eq!(
            derive_provenance(&page, &table, 1),
            "l2 l3 l4 l5 l6 l7 l8"
        );
    }

    #[test]
    fn first_word_matching_any_cell_sets_the_cut() {
        let page = MemoryPage::new(2, &["Relatorio Mensal", "Nome Valor", "Ana 10"]);
        let table = raw(&[&["Nome", "Valor"], &["Ana", "10"]]);
        assert_eq!(derive_provenance(&page, &table, 1), "Relatorio Mensal");
    }

    #[test]
    fn falls_back_to_page_tail_when_nothing_is_above() {
        let page = MemoryPage::new(3, &["Nome Valor", "Ana 10", "", "fim", "assinatura"]);
        let table = raw(&[&["Nome", "Valor"], &["Ana", "10"]]);
        assert_eq!(derive_provenance(&page, &table, 1), "Ana 10 fim assinatura");
    }

    #[test]
    fn falls_back_to_page_tail_when_words_fail() {
        let mut page = MemoryPage::new(4, &["Titulo", "Nome Valor"]);
        page.broken_words = true;
        let table = raw(&[&["Nome", "Valor"]]);
        assert_eq!(derive_provenance(&page, &table, 2), "Titulo Nome Valor");
    }

    #[test]
    fn default_when_page_has_no_text() {
        let page = MemoryPage::new(5, &[]);
        let table = raw(&[&["Nome", "Valor"], &["Ana", "10"]]);
        assert_eq!(derive_provenance(&page, &table, 3), "Page 5, Table 3");
    }

    #[test]
    fn blank_cells_never_match() {
        let page = MemoryPage::new(6, &["Cabecalho", "x y"]);
        let table = raw(&[&[" ", ""], &["x", "y"]]);
        assert_eq!(derive_provenance(&page, &table, 1), "Cabecalho");
    }
}
