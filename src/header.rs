use std::collections::HashSet;

pub(crate) const BLANK_HEADER_LABEL: &str = "Column";

fn clean_label(raw: Option<&str>) -> String {
    let collapsed = raw
        .map(|value| value.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    if collapsed.is_empty() {
        BLANK_HEADER_LABEL.to_string()
    } else {
        collapsed
    }
}

/// Turns raw header cells into unique, non-empty labels, same length and order.
#[must_use]
pub fn normalize_headers(raw: &[Option<String>]) -> Vec<String> {
    normalize_headers_reserving(raw, &[])
}

/// Like [`normalize_headers`], but labels listed in `reserved` count as
/// already taken, so a header equal to one of them gets a numeric suffix.
#[must_use]
pub fn normalize_headers_reserving(raw: &[Option<String>], reserved: &[&str]) -> Vec<String> {
    let mut seen = reserved
        .iter()
        .map(|label| (*label).to_string())
        .collect::<HashSet<_>>();
    let mut labels = Vec::with_capacity(raw.len());

    for cell in raw {
        let base = clean_label(cell.as_deref());
        let mut label = base.clone();
        let mut suffix = 1_usize;
        while seen.contains(&label) {
            label = format!("{base}_{suffix}");
            suffix += 1;
        }
        seen.insert(label.clone());
        labels.push(label);
    }

    labels
}
