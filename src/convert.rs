use chrono::NaiveDate;

use crate::detect::{DetectionProfile, detect_column_type, sample_values};
use crate::model::{CellValue, ColumnType, ExtractedTable, is_metadata_column};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldOrder {
    DayFirst,
    YearFirst,
}

#[derive(Debug, Clone, Copy)]
struct DatePattern {
    separator: char,
    order: FieldOrder,
    four_digit_year: bool,
}

const fn pattern(separator: char, order: FieldOrder, four_digit_year: bool) -> DatePattern {
    DatePattern {
        separator,
        order,
        four_digit_year,
    }
}

/// Tried in order; the first pattern that yields a valid calendar date wins.
const DATE_PATTERNS: [DatePattern; 8] = [
    pattern('/', FieldOrder::DayFirst, true),
    pattern('-', FieldOrder::DayFirst, true),
    pattern('/', FieldOrder::YearFirst, true),
    pattern('-', FieldOrder::YearFirst, true),
    pattern('/', FieldOrder::DayFirst, false),
    pattern('-', FieldOrder::DayFirst, false),
    pattern('/', FieldOrder::YearFirst, false),
    pattern('-', FieldOrder::YearFirst, false),
];

fn parse_field(text: &str, min_digits: usize, max_digits: usize) -> Option<u32> {
    if text.len() < min_digits
        || text.len() > max_digits
        || !text.chars().all(|ch| ch.is_ascii_digit())
    {
        return None;
    }
    text.parse().ok()
}

fn parse_year(text: &str, four_digit_year: bool) -> Option<i32> {
    if four_digit_year {
        return parse_field(text, 4, 4).and_then(|year| i32::try_from(year).ok());
    }
    // Two-digit years pivot at 69: 00-68 are 2000s, 69-99 are 1900s.
    let short = i32::try_from(parse_field(text, 2, 2)?).ok()?;
    Some(if short < 69 { 2000 + short } else { 1900 + short })
}

impl DatePattern {
    fn parse(self, text: &str) -> Option<NaiveDate> {
        let parts = text.split(self.separator).collect::<Vec<_>>();
        let [first, month, last] = parts.as_slice() else {
            return None;
        };
        let (year, day) = match self.order {
            FieldOrder::DayFirst => (*last, *first),
            FieldOrder::YearFirst => (*first, *last),
        };
        let year = parse_year(year, self.four_digit_year)?;
        let month = parse_field(month, 1, 2)?;
        let day = parse_field(day, 1, 2)?;
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// Parses a money or plain-number cell. Everything but digits, separators and
/// minus signs is dropped first, so `R$ 1.234,56` becomes `1234.56`.
///
/// When both `.` and `,` appear, the rightmost one is the decimal separator
/// and the other one groups thousands; a lone `,` is a decimal comma.
#[must_use]
pub fn convert_to_numeric(value: &str) -> Option<f64> {
    let kept = value
        .trim()
        .chars()
        .filter(|ch| ch.is_ascii_digit() || matches!(ch, ',' | '.' | '-'))
        .collect::<String>();

    let normalized = match (kept.rfind(','), kept.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => kept.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => kept.replace(',', ""),
        (Some(_), None) => kept.replace(',', "."),
        (None, _) => kept,
    };

    normalized.parse::<f64>().ok().filter(|number| number.is_finite())
}

/// Parses `dd/mm/yyyy`, `yyyy-mm-dd` and the other day-first or year-first
/// forms with `/` or `-` separators and 2- or 4-digit years.
#[must_use]
pub fn convert_to_date(value: &str) -> Option<NaiveDate> {
    let text = value.trim();
    DATE_PATTERNS.iter().find_map(|pattern| pattern.parse(text))
}

/// Parses `15,5%` into the fraction `0.155`.
#[must_use]
pub fn convert_to_percent(value: &str) -> Option<f64> {
    let text = value.trim();
    let text = text.strip_suffix('%').unwrap_or(text).trim();
    text.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .map(|number| number / 100.0)
}

/// Converts one cell to the native value of `column_type`. Cells that are
/// already typed pass through; text that does not parse becomes null.
#[must_use]
pub fn coerce_cell(value: &CellValue, column_type: ColumnType) -> CellValue {
    let CellValue::Text(text) = value else {
        return value.clone();
    };

    match column_type {
        ColumnType::Money | ColumnType::Number => {
            convert_to_numeric(text).map_or(CellValue::Null, CellValue::Number)
        }
        ColumnType::Date => convert_to_date(text).map_or(CellValue::Null, CellValue::Date),
        ColumnType::Percent => convert_to_percent(text).map_or(CellValue::Null, CellValue::Percent),
        ColumnType::Text => value.clone(),
    }
}

/// Returns a copy of `table` whose data columns hold native values according
/// to the detected type of each column. Metadata columns and columns without
/// any non-null value are copied unchanged.
#[must_use]
pub fn coerce_table(table: &ExtractedTable, profile: &DetectionProfile) -> ExtractedTable {
    let column_types = table
        .columns
        .iter()
        .enumerate()
        .map(|(index, name)| {
            if is_metadata_column(name) {
                return None;
            }
            let samples = sample_values(table.column_values(index), profile.sample_size);
            if samples.is_empty() {
                return None;
            }
            Some(detect_column_type(name, &samples, profile))
        })
        .collect::<Vec<_>>();

    let rows = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&column_types)
                .map(|(cell, column_type)| match column_type {
                    Some(column_type) => coerce_cell(cell, *column_type),
                    None => cell.clone(),
                })
                .collect()
        })
        .collect();

    let column_types = table
        .columns
        .iter()
        .zip(&column_types)
        .filter_map(|(name, column_type)| column_type.map(|column_type| (name.clone(), column_type)))
        .collect();

    ExtractedTable {
        rows,
        column_types,
        ..table.clone()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use indexmap::IndexMap;

    use crate::detect::DetectionProfile;
    use crate::model::{CellValue, ColumnType, ExtractedTable};

    use super::{coerce_table, convert_to_date, convert_to_numeric, convert_to_percent};

    fn approx(left: Option<f64>, right: f64) -> bool {
        left.is_some_and(|value| (value - right).abs() < 1e-9)
    }

    #[test]
    fn numeric_handles_brazilian_grouping() {
        assert!(approx(convert_to_numeric("1.234,56"), 1234.56));
        assert!(approx(convert_to_numeric("R$ 10,50"), 10.5));
        assert!(approx(convert_to_numeric("-3,5"), -3.5));
        assert!(approx(convert_to_numeric("1,234.56"), 1234.56));
        assert!(approx(convert_to_numeric("42"), 42.0));
    }

    #[test]
    fn numeric_returns_none_on_garbage() {
        assert_eq!(convert_to_numeric("abc"), None);
        assert_eq!(convert_to_numeric(""), None);
        assert_eq!(convert_to_numeric("1.2.3"), None);
        assert_eq!(convert_to_numeric("--"), None);
    }

    #[test]
    fn percent_becomes_fraction() {
        assert!(approx(convert_to_percent("15,5%"), 0.155));
        assert!(approx(convert_to_percent(" 20 % "), 0.2));
        assert!(approx(convert_to_percent("7.25"), 0.0725));
        assert_eq!(convert_to_percent("n/a"), None);
    }

    #[test]
    fn dates_in_all_supported_shapes() {
        let expected = NaiveDate::from_ymd_opt(2023, 12, 31).expect("valid date");
        assert_eq!(convert_to_date("31/12/2023"), Some(expected));
        assert_eq!(convert_to_date("31-12-2023"), Some(expected));
        assert_eq!(convert_to_date("2023/12/31"), Some(expected));
        assert_eq!(convert_to_date(" 2023-12-31 "), Some(expected));
        assert_eq!(convert_to_date("31/12/23"), Some(expected));
        // Day-first shapes are tried before year-first ones.
        assert_eq!(
            convert_to_date("23-12-31"),
            NaiveDate::from_ymd_opt(2031, 12, 23)
        );
        assert_eq!(
            convert_to_date("1/2/70"),
            NaiveDate::from_ymd_opt(1970, 2, 1)
        );
    }

    #[test]
    fn invalid_dates_are_none() {
        assert_eq!(convert_to_date("31/02/2023"), None);
        assert_eq!(convert_to_date("2023"), None);
        assert_eq!(convert_to_date("12/2023/01"), None);
        assert_eq!(convert_to_date("hoje"), None);
    }

    #[test]
    fn coercion_types_each_data_column() {
        let table = ExtractedTable {
            page: 1,
            table_index: 1,
            columns: vec![
                "Data".to_string(),
                "Valor".to_string(),
                "Obs".to_string(),
                "Page".to_string(),
            ],
            rows: vec![
                vec![
                    CellValue::Text("01/02/2023".to_string()),
                    CellValue::Text("R$ 10,50".to_string()),
                    CellValue::Text("pago".to_string()),
                    CellValue::Integer(1),
                ],
                vec![
                    CellValue::Text("ontem".to_string()),
                    CellValue::Text("x".to_string()),
                    CellValue::Null,
                    CellValue::Integer(1),
                ],
            ],
            column_types: IndexMap::new(),
        };

        let coerced = coerce_table(&table, &DetectionProfile::default());
        assert_eq!(
            coerced.rows[0][0],
            CellValue::Date(NaiveDate::from_ymd_opt(2023, 2, 1).expect("valid date"))
        );
        assert_eq!(coerced.rows[0][1], CellValue::Number(10.5));
        assert_eq!(coerced.rows[0][2], CellValue::Text("pago".to_string()));
        assert_eq!(coerced.rows[1][0], CellValue::Null);
        assert_eq!(coerced.rows[1][1], CellValue::Null);
        assert_eq!(coerced.rows[1][3], CellValue::Integer(1));
        assert_eq!(coerced.columns, table.columns);
        assert_eq!(coerced.column_types.get("Data"), Some(&ColumnType::Date));
        assert_eq!(coerced.column_types.get("Valor"), Some(&ColumnType::Money));
        assert_eq!(coerced.column_types.get("Obs"), Some(&ColumnType::Text));
        assert!(!coerced.column_types.contains_key("Page"));
    }
}
