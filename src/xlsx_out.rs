use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{
    Color, ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError,
};

use crate::error::ConvertError;
use crate::format::{CellStyle, FormatProfile, SheetLayout};
use crate::model::{CellValue, ConsolidatedTable};

/// Sheet written when no table could be extracted.
pub const FALLBACK_SHEET_NAME: &str = "Info";

struct SheetFormats {
    header: Format,
    metadata: Format,
    money: Format,
    percent: Format,
    number: Format,
    date: Format,
    text: Format,
    plain: Format,
}

impl SheetFormats {
    fn new(profile: &FormatProfile) -> Self {
        let bordered = || Format::new().set_border(FormatBorder::Thin);
        let wrapped = || {
            bordered()
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap()
        };
        let right = || bordered().set_align(FormatAlign::Right);

        Self {
            header: wrapped()
                .set_bold()
                .set_font_color(Color::RGB(profile.header_font))
                .set_background_color(Color::RGB(profile.header_fill))
                .set_align(FormatAlign::Center),
            metadata: wrapped(),
            money: right().set_num_format(&profile.money_format),
            percent: right().set_num_format(&profile.percent_format),
            number: right().set_num_format(&profile.number_format),
            date: bordered()
                .set_align(FormatAlign::Center)
                .set_num_format(&profile.date_format),
            text: wrapped(),
            plain: bordered(),
        }
    }

    fn for_style(&self, style: CellStyle) -> &Format {
        match style {
            CellStyle::Metadata => &self.metadata,
            CellStyle::Money => &self.money,
            CellStyle::Percent => &self.percent,
            CellStyle::Number => &self.number,
            CellStyle::Date => &self.date,
            CellStyle::Text => &self.text,
            CellStyle::Plain => &self.plain,
        }
    }
}

/// Excel serial dates only cover the years 1900 to 9999.
#[allow(clippy::cast_possible_truncation)]
fn excel_date(date: NaiveDate) -> Option<ExcelDateTime> {
    let year = u16::try_from(date.year()).ok()?;
    ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).ok()
}

#[allow(clippy::cast_precision_loss)]
fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: &Format,
) -> Result<(), XlsxError> {
    match value {
        CellValue::Null => {
            worksheet.write_blank(row, col, format)?;
        }
        CellValue::Text(text) => {
            worksheet.write_string_with_format(row, col, text, format)?;
        }
        CellValue::Integer(number) => {
            worksheet.write_number_with_format(row, col, *number as f64, format)?;
        }
        CellValue::Number(number) | CellValue::Percent(number) => {
            worksheet.write_number_with_format(row, col, *number, format)?;
        }
        CellValue::Date(date) => match excel_date(*date) {
            Some(datetime) => {
                worksheet.write_datetime_with_format(row, col, &datetime, format)?;
            }
            None => {
                let text = date.format("%d/%m/%Y").to_string();
                worksheet.write_string_with_format(row, col, text, format)?;
            }
        },
    }
    Ok(())
}

fn column_index(index: usize) -> Result<u16, XlsxError> {
    u16::try_from(index).map_err(|_| XlsxError::ParameterError(format!("too many columns: {index}")))
}

fn row_index(index: usize) -> Result<u32, XlsxError> {
    u32::try_from(index).map_err(|_| XlsxError::ParameterError(format!("too many rows: {index}")))
}

fn fill_sheet(
    worksheet: &mut Worksheet,
    table: &ConsolidatedTable,
    layout: &SheetLayout,
    formats: &SheetFormats,
) -> Result<(), XlsxError> {
    for (index, column) in table.columns.iter().enumerate() {
        let col = column_index(index)?;
        worksheet.write_string_with_format(0, col, column, &formats.header)?;
        if let Some(width) = layout.widths.get(index) {
            worksheet.set_column_width(col, *width)?;
        }
    }

    for (row_offset, row) in table.rows.iter().enumerate() {
        let excel_row = row_index(row_offset + 1)?;
        for (index, value) in row.iter().enumerate() {
            let format = formats.for_style(layout.style_for(index, value));
            write_cell(worksheet, excel_row, column_index(index)?, value, format)?;
        }
    }

    worksheet.set_freeze_panes(layout.freeze.0, layout.freeze.1)?;
    if let Some((last_row, last_col)) = layout.autofilter {
        worksheet.autofilter(0, 0, last_row, last_col)?;
    }
    Ok(())
}

fn table_workbook(
    table: &ConsolidatedTable,
    layout: &SheetLayout,
    profile: &FormatProfile,
    sheet_name: &str,
) -> Result<Workbook, XlsxError> {
    let formats = SheetFormats::new(profile);
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;
    fill_sheet(worksheet, table, layout, &formats)?;
    Ok(workbook)
}

fn fallback_workbook(profile: &FormatProfile) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(FALLBACK_SHEET_NAME)?;
    worksheet.write_string(0, 0, &profile.no_tables_message)?;
    worksheet.set_column_width(0, 50)?;
    Ok(workbook)
}

/// Serializes the formatted sheet into XLSX bytes.
pub(crate) fn write_table_xlsx(
    table: &ConsolidatedTable,
    layout: &SheetLayout,
    profile: &FormatProfile,
    sheet_name: &str,
) -> Result<Vec<u8>, ConvertError> {
    Ok(table_workbook(table, layout, profile, sheet_name)?.save_to_buffer()?)
}

/// Serializes the one-cell workbook used when nothing was extracted.
pub(crate) fn write_fallback_xlsx(profile: &FormatProfile) -> Result<Vec<u8>, ConvertError> {
    Ok(fallback_workbook(profile)?.save_to_buffer()?)
}
