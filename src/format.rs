use crate::detect::{DetectionProfile, detect_column_type, sample_values};
use crate::model::{CellValue, ColumnType, ConsolidatedTable, is_metadata_column};

pub const MIN_COLUMN_WIDTH: f64 = 10.0;
pub const MAX_COLUMN_WIDTH: f64 = 50.0;
/// Extra characters added to the longest text of a column.
pub const COLUMN_WIDTH_PADDING: usize = 2;

/// Number formats, colours and fixed texts of the generated sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatProfile {
    pub locale: String,
    pub money_format: String,
    pub percent_format: String,
    pub number_format: String,
    pub date_format: String,
    pub header_fill: u32,
    pub header_font: u32,
    /// Single cell written when no table survives extraction.
    pub no_tables_message: String,
}

impl FormatProfile {
    /// Brazilian Portuguese conventions: `R$` currency and day-first dates.
    #[must_use]
    pub fn brazilian() -> Self {
        Self {
            locale: "pt-BR".to_string(),
            money_format: "\"R$ \"#,##0.00".to_string(),
            percent_format: "0.00%".to_string(),
            number_format: "#,##0.00".to_string(),
            date_format: "dd/mm/yyyy".to_string(),
            header_fill: 0x4F_81_BD,
            header_font: 0xFF_FF_FF,
            no_tables_message: "Nenhuma tabela válida foi encontrada".to_string(),
        }
    }

    #[must_use]
    pub fn us_english() -> Self {
        Self {
            locale: "en-US".to_string(),
            money_format: "$#,##0.00".to_string(),
            date_format: "mm/dd/yyyy".to_string(),
            no_tables_message: "No valid table was found".to_string(),
            ..Self::brazilian()
        }
    }

    /// Resolves a locale tag. Anything unknown, and no tag at all, yields the
    /// Brazilian profile.
    #[must_use]
    pub fn for_locale(locale: Option<&str>) -> Self {
        let normalized = locale
            .map(|tag| tag.trim().replace('_', "-").to_ascii_lowercase())
            .unwrap_or_default();
        match normalized.as_str() {
            "en" | "en-us" => Self::us_english(),
            _ => Self::brazilian(),
        }
    }
}

impl Default for FormatProfile {
    fn default() -> Self {
        Self::brazilian()
    }
}

/// How one data cell is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    /// Provenance columns: bordered, wrapped, never number formatted.
    Metadata,
    Money,
    Percent,
    Number,
    Date,
    Text,
    /// A typed column whose cell does not hold a value of that type.
    Plain,
}

/// Per-column decisions for one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    /// `None` for metadata columns.
    pub column_types: Vec<Option<ColumnType>>,
    pub widths: Vec<f64>,
    /// First unfrozen row and column.
    pub freeze: (u32, u16),
    /// Last row and column covered by the auto-filter, header included.
    pub autofilter: Option<(u32, u16)>,
}

impl SheetLayout {
    #[must_use]
    pub fn style_for(&self, column: usize, value: &CellValue) -> CellStyle {
        match self.column_types.get(column).copied().flatten() {
            None => CellStyle::Metadata,
            Some(column_type) => cell_style(column_type, value),
        }
    }
}

/// Text columns wrap every cell; typed columns format only cells holding the
/// matching native value.
#[must_use]
pub fn cell_style(column_type: ColumnType, value: &CellValue) -> CellStyle {
    match (column_type, value) {
        (ColumnType::Text, _) => CellStyle::Text,
        (ColumnType::Money, CellValue::Number(_) | CellValue::Integer(_)) => CellStyle::Money,
        (ColumnType::Number, CellValue::Number(_) | CellValue::Integer(_)) => CellStyle::Number,
        (ColumnType::Percent, CellValue::Percent(_)) => CellStyle::Percent,
        (ColumnType::Date, CellValue::Date(_)) => CellStyle::Date,
        _ => CellStyle::Plain,
    }
}

#[allow(clippy::cast_precision_loss)]
fn column_width(header: &str, values: &[&CellValue]) -> f64 {
    let longest = values
        .iter()
        .map(|value| value.to_string().chars().count())
        .chain(std::iter::once(header.chars().count()))
        .max()
        .unwrap_or(0);
    ((longest + COLUMN_WIDTH_PADDING) as f64).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
}

/// Decides column types, widths, frozen panes and filter range for `table`.
/// Coerced columns keep the type they were coerced to; the others are typed
/// from their text by the same detector.
#[must_use]
pub fn plan_layout(table: &ConsolidatedTable, detection: &DetectionProfile) -> SheetLayout {
    let mut column_types = Vec::with_capacity(table.columns.len());
    let mut widths = Vec::with_capacity(table.columns.len());

    for (index, column) in table.columns.iter().enumerate() {
        let values = table.column_values(index);
        widths.push(column_width(column, &values));
        if is_metadata_column(column) {
            column_types.push(None);
        } else if let Some(column_type) = table.column_types.get(column) {
            column_types.push(Some(*column_type));
        } else {
            let samples = sample_values(values, detection.sample_size);
            column_types.push(Some(detect_column_type(column, &samples, detection)));
        }
    }

    let autofilter = u16::try_from(table.columns.len())
        .ok()
        .and_then(|count| count.checked_sub(1))
        .zip(u32::try_from(table.rows.len()).ok());

    SheetLayout {
        column_types,
        widths,
        freeze: (1, 3),
        autofilter: autofilter.map(|(last_col, last_row)| (last_row, last_col)),
    }
}
