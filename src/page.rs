use std::fmt;
use std::str::FromStr;

use crate::error::ExtractError;
use crate::model::{RawTable, Word};

/// Vertical distance under which two words sit on the same text line.
pub(crate) const LINE_TOLERANCE: f32 = 3.0;

/// How one axis of a table grid is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    /// Column and row breaks come from the placement of words.
    Text,
    /// Ruling lines and rectangle borders drawn on the page.
    Lines,
    /// Ruling lines only; rectangle borders are ignored.
    LinesStrict,
}

impl LineMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Lines => "lines",
            Self::LinesStrict => "lines_strict",
        }
    }
}

impl FromStr for LineMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "text" => Ok(Self::Text),
            "lines" => Ok(Self::Lines),
            "lines_strict" => Ok(Self::LinesStrict),
            other => Err(format!(
                "unknown line mode '{other}', expected text, lines or lines_strict"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStrategy {
    pub vertical: LineMode,
    pub horizontal: LineMode,
}

impl ExtractionStrategy {
    #[must_use]
    pub const fn uniform(mode: LineMode) -> Self {
        Self {
            vertical: mode,
            horizontal: mode,
        }
    }

    /// Strategies tried on every page, in order.
    #[must_use]
    pub fn default_order() -> Vec<Self> {
        vec![
            Self::uniform(LineMode::Text),
            Self::uniform(LineMode::Lines),
            Self::uniform(LineMode::LinesStrict),
        ]
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.vertical.as_str(), self.horizontal.as_str())
    }
}

/// A page that can hand out tables, words and text. The built-in
/// implementation reads PDF content streams; anything else that can produce
/// raw grids plugs into the same pipeline.
pub trait TablePage {
    /// 1-based page number.
    fn page_number(&self) -> u32;

    fn extract_tables(&self, strategy: ExtractionStrategy) -> Result<Vec<RawTable>, ExtractError>;

    /// Words in reading order: top to bottom, then left to right.
    fn words(&self) -> Result<Vec<Word>, ExtractError>;

    /// Text of the region above `top`.
    fn text_above(&self, top: f32) -> Result<String, ExtractError>;

    fn text(&self) -> Result<String, ExtractError>;
}

/// Sorts words into reading order and groups them into lines.
pub(crate) fn group_into_lines(words: &[Word]) -> Vec<Vec<Word>> {
    let mut sorted = words.to_vec();
    sorted.sort_by(|left, right| {
        left.top
            .total_cmp(&right.top)
            .then(left.x0.total_cmp(&right.x0))
    });

    let mut lines: Vec<Vec<Word>> = Vec::new();
    for word in sorted {
        match lines.last_mut() {
            Some(line) if line.first().is_some_and(|first| (word.top - first.top).abs() <= LINE_TOLERANCE) => {
                line.push(word);
            }
            _ => lines.push(vec![word]),
        }
    }

    for line in &mut lines {
        line.sort_by(|left, right| left.x0.total_cmp(&right.x0));
    }
    lines
}

/// Joins a line of words; a gap wider than `wide_gap` becomes a double space
/// so the line can later be split into cells.
pub(crate) fn render_line(line: &[Word], wide_gap: f32) -> String {
    let mut out = String::new();
    let mut previous: Option<&Word> = None;
    for word in line {
        if let Some(previous) = previous {
            if word.x0 - previous.x1 > wide_gap {
                out.push_str("  ");
            } else {
                out.push(' ');
            }
        }
        out.push_str(&word.text);
        previous = Some(word);
    }
    out
}

pub(crate) fn words_to_text(words: &[Word]) -> String {
    group_into_lines(words)
        .iter()
        .map(|line| render_line(line, f32::INFINITY))
        .collect::<Vec<_>>()
        .join("\n")
}


#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::model::Word;

    use super::{ExtractionStrategy, LineMode, group_into_lines, render_line, words_to_text};

    fn word(text: &str, x0: f32, x1: f32, top: f32) -> Word {
        Word {
            text: text.to_string(),
            x0,
            x1,
            top,
            bottom: top + 10.0,
        }
    }

    #[test]
    fn groups_words_by_vertical_position() {
        let words = vec![
            word("b", 40.0, 50.0, 101.0),
            word("c", 10.0, 20.0, 130.0),
            word("a", 10.0, 20.0, 100.0),
        ];
        let lines = group_into_lines(&words);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][0].text, "a");
        assert_eq!(lines[0][1].text, "b");
        assert_eq!(words_to_text(&words), "a b\nc");
    }

    #[test]
    fn wide_gaps_become_double_spaces() {
        let line = vec![
            word("Data", 0.0, 24.0, 0.0),
            word("de", 30.0, 42.0, 0.0),
            word("Valor", 80.0, 110.0, 0.0),
        ];
        assert_eq!(render_line(&line, 9.0), "Data de  Valor");
    }

    #[test]
    fn parses_line_modes_and_formats_strategy() {
        assert_eq!(LineMode::from_str("lines_strict"), Ok(LineMode::LinesStrict));
        assert!(LineMode::from_str("grid").is_err());
        let order = ExtractionStrategy::default_order();
        assert_eq!(order[0].to_string(), "text/text");
        assert_eq!(order.len(), 3);
    }
}
