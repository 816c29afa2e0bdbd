use crate::model::RawTable;

/// Splits a rendered text line on tabs and runs of two or more spaces.
pub(crate) fn split_line_into_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut whitespace_run = 0_usize;

    for ch in trimmed.chars() {
        if ch == '\t' {
            if !current.trim().is_empty() {
                cells.push(current.trim().to_string());
                current.clear();
            }
            whitespace_run = 0;
            continue;
        }

        if ch.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run >= 2 {
                if !current.trim().is_empty() {
                    cells.push(current.trim().to_string());
                    current.clear();
                }
                continue;
            }
            current.push(' ');
            continue;
        }

        whitespace_run = 0;
        current.push(ch);
    }

    if !current.trim().is_empty() {
        cells.push(current.trim().to_string());
    }

    cells
}

/// Pads every row with empty cells up to the widest row.
pub(crate) fn normalize_rows(rows: Vec<Vec<String>>) -> RawTable {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    rows.into_iter()
        .map(|row| {
            let mut out = row.into_iter().map(Some).collect::<Vec<_>>();
            out.resize(width, Some(String::new()));
            out
        })
        .collect()
}

/// Groups consecutive lines with at least `min_cols` cells into tables of two
/// or more rows.
pub(crate) fn detect_text_tables<S: AsRef<str>>(lines: &[S], min_cols: usize) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut current_rows: Vec<Vec<String>> = Vec::new();

    let flush_current = |rows: &mut Vec<Vec<String>>, tables: &mut Vec<RawTable>| {
        if rows.len() >= 2 {
            tables.push(normalize_rows(std::mem::take(rows)));
        } else {
            rows.clear();
        }
    };

    for line in lines {
        let cells = split_line_into_cells(line.as_ref());
        if cells.len() >= min_cols {
            current_rows.push(cells);
        } else {
            flush_current(&mut current_rows, &mut tables);
        }
    }

    flush_current(&mut current_rows, &mut tables);
    tables
}
