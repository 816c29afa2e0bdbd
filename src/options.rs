use std::collections::BTreeSet;
use std::str::FromStr;

use crate::detect::DetectionProfile;
use crate::extract::DEFAULT_MIN_ROW_FILL;
use crate::format::FormatProfile;
use crate::page::ExtractionStrategy;

/// Sheet that receives the consolidated table.
pub const DEFAULT_SHEET_NAME: &str = "All Tables";
/// Rows copied into [`crate::ConversionReport::preview`].
pub const DEFAULT_PREVIEW_ROWS: usize = 20;
/// Excel refuses longer sheet names.
const MAX_SHEET_NAME_LEN: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<u32>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut pages = BTreeSet::new();
        for token in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((start, end)) = token.split_once('-') {
                let start: u32 = start
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range start: '{start}'"))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range end: '{end}'"))?;
                if start == 0 || end == 0 {
                    return Err("pages are 1-based".to_string());
                }
                if end < start {
                    return Err(format!(
                        "invalid range '{token}': end is smaller than start"
                    ));
                }
                pages.extend(start..=end);
            } else {
                let page: u32 = token
                    .parse()
                    .map_err(|_| format!("invalid page number: '{token}'"))?;
                if page == 0 {
                    return Err("pages are 1-based".to_string());
                }
                pages.insert(page);
            }
        }

        if pages.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { pages })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub pages: Option<PageSelection>,
    /// Tried in order on every page until one yields a plausible table.
    pub strategies: Vec<ExtractionStrategy>,
    pub min_row_fill: f32,
    pub sheet_name: String,
    pub detection: DetectionProfile,
    pub format: FormatProfile,
    pub preview_rows: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            pages: None,
            strategies: ExtractionStrategy::default_order(),
            min_row_fill: DEFAULT_MIN_ROW_FILL,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            detection: DetectionProfile::default(),
            format: FormatProfile::default(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl ConvertOptions {
    /// Checks the options that cannot be expressed in the types.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid option.
    pub fn validate(&self) -> Result<(), String> {
        if self.strategies.is_empty() {
            return Err("at least one extraction strategy is required".to_string());
        }
        if !(0.0..1.0).contains(&self.min_row_fill) {
            return Err(format!(
                "min_row_fill must be in [0, 1), got {}",
                self.min_row_fill
            ));
        }
        let name = self.sheet_name.trim();
        if name.is_empty() {
            return Err("sheet name cannot be empty".to_string());
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(format!(
                "sheet name '{name}' is longer than {MAX_SHEET_NAME_LEN} characters"
            ));
        }
        if let Some(ch) = name.chars().find(|ch| "[]:*?/\\".contains(*ch)) {
            return Err(format!("sheet name '{name}' contains '{ch}'"));
        }
        if !(self.detection.threshold > 0.0 && self.detection.threshold <= 1.0) {
            return Err(format!(
                "detection threshold must be in (0, 1], got {}",
                self.detection.threshold
            ));
        }
        if self.detection.sample_size == 0 {
            return Err("detection sample size must be positive".to_string());
        }
        Ok(())
    }
}
