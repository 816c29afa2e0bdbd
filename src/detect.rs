use std::sync::LazyLock;

use regex::Regex;

use crate::model::{CellValue, ColumnType};

pub const MONEY_KEYWORDS: &[&str] = &[
    "valor", "preço", "custo", "total", "r$", "reais", "saldo", "montante",
];
pub const DATE_KEYWORDS: &[&str] = &["data", "período", "mês", "ano", "dia", "dt_"];
pub const PERCENT_KEYWORDS: &[&str] = &["percentual", "%", "porcentagem", "taxa"];
pub const QUANTITY_KEYWORDS: &[&str] = &["quantidade", "qtd", "qtde", "volume", "número", "num"];

/// Share of matched samples a category needs before it wins.
pub const VALUE_MATCH_THRESHOLD: f64 = 0.6;
/// Number of non-null values inspected per column.
pub const SAMPLE_SIZE: usize = 20;

pub const MONEY_PATTERN: &str = r"^R?\$?\s*\d+[.,]\d+$|^\d+[.,]\d+\s*R?\$?$";
pub const PERCENT_PATTERN: &str = r"^\d+[.,]?\d*\s*%$";
pub const DATE_PATTERN: &str = r"^\d{1,2}[/-]\d{1,2}[/-]\d{2,4}$|^\d{2,4}[/-]\d{1,2}[/-]\d{1,2}$";
pub const NUMBER_PATTERN: &str = r"^\d+[.,]?\d*$";

static MONEY_RE: LazyLock<Regex> = LazyLock::new(|| compile(MONEY_PATTERN));
static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| compile(PERCENT_PATTERN));
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| compile(DATE_PATTERN));
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| compile(NUMBER_PATTERN));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in detection pattern is valid")
}

/// Value patterns, tried in the order money, percent, date, number.
#[derive(Debug, Clone)]
pub struct ValuePatterns {
    pub money: Regex,
    pub percent: Regex,
    pub date: Regex,
    pub number: Regex,
}

impl ValuePatterns {
    /// # Errors
    ///
    /// Fails when one of the patterns is not a valid regular expression.
    pub fn new(money: &str, percent: &str, date: &str, number: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            money: Regex::new(money)?,
            percent: Regex::new(percent)?,
            date: Regex::new(date)?,
            number: Regex::new(number)?,
        })
    }

    fn classify(&self, value: &str) -> Option<ColumnType> {
        if self.money.is_match(value) {
            Some(ColumnType::Money)
        } else if self.percent.is_match(value) {
            Some(ColumnType::Percent)
        } else if self.date.is_match(value) {
            Some(ColumnType::Date)
        } else if self.number.is_match(value) {
            Some(ColumnType::Number)
        } else {
            None
        }
    }
}

impl Default for ValuePatterns {
    fn default() -> Self {
        Self {
            money: MONEY_RE.clone(),
            percent: PERCENT_RE.clone(),
            date: DATE_RE.clone(),
            number: NUMBER_RE.clone(),
        }
    }
}

impl PartialEq for ValuePatterns {
    fn eq(&self, other: &Self) -> bool {
        self.money.as_str() == other.money.as_str()
            && self.percent.as_str() == other.percent.as_str()
            && self.date.as_str() == other.date.as_str()
            && self.number.as_str() == other.number.as_str()
    }
}

/// Keyword lists, value patterns and thresholds driving column type detection.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionProfile {
    pub money_keywords: Vec<String>,
    pub date_keywords: Vec<String>,
    pub percent_keywords: Vec<String>,
    pub quantity_keywords: Vec<String>,
    pub patterns: ValuePatterns,
    pub threshold: f64,
    pub sample_size: usize,
}

fn owned(keywords: &[&str]) -> Vec<String> {
    keywords.iter().map(|keyword| (*keyword).to_string()).collect()
}

impl Default for DetectionProfile {
    fn default() -> Self {
        Self {
            money_keywords: owned(MONEY_KEYWORDS),
            date_keywords: owned(DATE_KEYWORDS),
            percent_keywords: owned(PERCENT_KEYWORDS),
            quantity_keywords: owned(QUANTITY_KEYWORDS),
            patterns: ValuePatterns::default(),
            threshold: VALUE_MATCH_THRESHOLD,
            sample_size: SAMPLE_SIZE,
        }
    }
}

fn contains_any(name: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| name.contains(keyword.as_str()))
}

fn type_from_name(name: &str, profile: &DetectionProfile) -> Option<ColumnType> {
    let name = name.to_lowercase();
    if contains_any(&name, &profile.money_keywords) {
        Some(ColumnType::Money)
    } else if contains_any(&name, &profile.date_keywords) {
        Some(ColumnType::Date)
    } else if contains_any(&name, &profile.percent_keywords) {
        Some(ColumnType::Percent)
    } else if contains_any(&name, &profile.quantity_keywords) {
        Some(ColumnType::Number)
    } else {
        None
    }
}

#[derive(Debug, Default)]
struct Tally {
    money: usize,
    percent: usize,
    date: usize,
    number: usize,
}

#[allow(clippy::cast_precision_loss)]
fn type_from_values<S: AsRef<str>>(samples: &[S], profile: &DetectionProfile) -> ColumnType {
    let mut tally = Tally::default();
    for sample in samples {
        let value = sample.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        match profile.patterns.classify(value) {
            Some(ColumnType::Money) => tally.money += 1,
            Some(ColumnType::Percent) => tally.percent += 1,
            Some(ColumnType::Date) => tally.date += 1,
            Some(ColumnType::Number) => tally.number += 1,
            Some(ColumnType::Text) | None => {}
        }
    }

    let total = tally.money + tally.percent + tally.date + tally.number;
    if total == 0 {
        return ColumnType::Text;
    }

    [
        (ColumnType::Money, tally.money),
        (ColumnType::Percent, tally.percent),
        (ColumnType::Date, tally.date),
        (ColumnType::Number, tally.number),
    ]
    .into_iter()
    .find(|(_, count)| *count as f64 / total as f64 >= profile.threshold)
    .map_or(ColumnType::Text, |(column_type, _)| column_type)
}

/// Classifies a column from its name first and its sampled values second.
///
/// This is the only detector in the crate. Coercion calls it before
/// consolidation; sheet planning calls it only for columns that were never
/// coerced.
#[must_use]
pub fn detect_column_type<S: AsRef<str>>(
    name: &str,
    samples: &[S],
    profile: &DetectionProfile,
) -> ColumnType {
    type_from_name(name, profile).unwrap_or_else(|| type_from_values(samples, profile))
}

/// The displayed text of the first `sample_size` non-null values of a column.
#[must_use]
pub fn sample_values<'a, I>(values: I, sample_size: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a CellValue>,
{
    values
        .into_iter()
        .filter(|value| !value.is_null())
        .take(sample_size)
        .map(ToString::to_string)
        .collect()
}
