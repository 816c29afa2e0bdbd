use std::io::Write;

use csv::WriterBuilder;

use crate::error::ConvertError;
use crate::model::ConsolidatedTable;

/// The header plus the first `limit` rows of `table` as display strings.
#[must_use]
pub fn preview_rows(table: &ConsolidatedTable, limit: usize) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .take(limit)
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect()
}

/// Writes `columns` and `rows` as comma-separated records.
///
/// # Errors
///
/// Returns an error when the writer fails.
pub fn write_preview_csv<W: Write>(
    writer: W,
    columns: &[String],
    rows: &[Vec<String>],
) -> Result<(), ConvertError> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
