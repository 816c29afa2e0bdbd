use std::collections::BTreeMap;
use std::path::Path;

use encoding_rs::{UTF_16BE, WINDOWS_1252};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{ConvertError, ExtractError};
use crate::model::{RawTable, Word};
use crate::options::PageSelection;
use crate::page::{ExtractionStrategy, TablePage, words_to_text};
use crate::table_detect::{Edge, EdgeSource, Orientation, detect_tables};
use crate::table_parse::split_line_into_cells;

/// US Letter, used when no page in the tree declares a media box.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
/// Advance of one glyph as a share of the font size.
const GLYPH_ADVANCE: f32 = 0.5;
/// Segments closer to axis-aligned than this are treated as rules.
const AXIS_SLACK: f32 = 0.5;
const MAX_PARENT_DEPTH: usize = 32;

fn split_text_into_pages(raw_text: &str) -> Vec<String> {
    let mut pages = raw_text
        .split('\u{000C}')
        .map(str::to_string)
        .collect::<Vec<_>>();
    if pages.last().is_some_and(String::is_empty) {
        pages.pop();
    }
    pages
}

fn looks_decoding_broken(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    if text.contains("?Identity-H Unimplemented?") {
        return true;
    }

    let total = text.chars().count();
    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();

    replacement * 8 > total || control * 5 > total
}

fn decode_pdf_bytes(encoding: Option<&str>, bytes: &[u8]) -> String {
    if encoding.is_some_and(|name| name.eq_ignore_ascii_case("WinAnsiEncoding")) {
        let (latin, _, _) = WINDOWS_1252.decode(bytes);
        return latin.into_owned();
    }

    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    if bytes.starts_with(&[0xFE, 0xFF]) || bytes.starts_with(&[0xFF, 0xFE]) {
        let bytes = if bytes.len() > 2 { &bytes[2..] } else { bytes };
        let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(bytes);
        if !had_errors && !utf16.is_empty() {
            return utf16.into_owned();
        }
    }

    if let Some(name) = encoding {
        let lower = name.to_ascii_lowercase();

        if lower.contains("utf16")
            || lower.contains("ucs2")
            || lower.contains("identity-h")
            || lower.contains("unicode")
        {
            let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(bytes);
            if !had_errors && !utf16.is_empty() {
                return utf16.into_owned();
            }
        }
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => WINDOWS_1252.decode(bytes).0.into_owned(),
    }
}

fn extraction_quality_score(text: &str) -> i64 {
    if text.trim().is_empty() {
        return i64::MIN / 4;
    }

    let mut non_empty_lines = 0_i64;
    let mut multi_cell_lines = 0_i64;
    let mut numeric_lines = 0_i64;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        non_empty_lines += 1;
        if split_line_into_cells(line).len() >= 2 {
            multi_cell_lines += 1;
        }
        if line.chars().any(|ch| ch.is_ascii_digit()) {
            numeric_lines += 1;
        }
    }

    let broken_penalty = if looks_decoding_broken(text) { 800 } else { 0 };
    multi_cell_lines * 50 + numeric_lines * 15 + non_empty_lines - broken_penalty
}

fn choose_best_text(candidates: &[String]) -> String {
    candidates
        .iter()
        .max_by_key(|text| extraction_quality_score(text))
        .cloned()
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translate(x: f32, y: f32) -> Self {
        Self {
            e: x,
            f: y,
            ..Self::IDENTITY
        }
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let values = numbers(operands);
        let [a, b, c, d, e, f] = values.as_slice() else {
            return None;
        };
        Some(Self {
            a: *a,
            b: *b,
            c: *c,
            d: *d,
            e: *e,
            f: *f,
        })
    }

    fn then(self, other: Self) -> Self {
        Self {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }
}

#[allow(clippy::cast_precision_loss, clippy::unnecessary_cast)]
fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(number).collect()
}

/// Positioned words and ruling edges of one page.
#[derive(Debug, Clone, Default, PartialEq)]
struct PageLayout {
    words: Vec<Word>,
    edges: Vec<Edge>,
}

/// Collects glyphs into words: a glyph continues the current word when it
/// sits on the same line and starts where the word ends.
#[derive(Debug, Default)]
struct WordBuilder {
    current: Option<Word>,
    words: Vec<Word>,
}

impl WordBuilder {
    fn push_glyph(&mut self, ch: char, x0: f32, x1: f32, top: f32, bottom: f32) {
        if ch.is_whitespace() {
            self.flush();
            return;
        }
        let height = bottom - top;
        if let Some(word) = self.current.as_mut() {
            if (word.top - top).abs() <= height * 0.2 && (x0 - word.x1).abs() <= height * 0.1 {
                word.text.push(ch);
                word.x1 = x1;
                return;
            }
        }
        self.flush();
        self.current = Some(Word {
            text: ch.to_string(),
            x0,
            x1,
            top,
            bottom,
        });
    }

    fn flush(&mut self) {
        if let Some(word) = self.current.take() {
            self.words.push(word);
        }
    }

    fn finish(mut self) -> Vec<Word> {
        self.flush();
        self.words
    }
}

#[derive(Debug, Clone, Copy)]
struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    font_size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_size: 12.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
        }
    }
}

/// Walks a content stream and records text placement and stroked or filled
/// axis-aligned segments. Output coordinates have their origin at the top
/// left of the media box.
struct Interpreter<'a> {
    media_box: [f32; 4],
    encodings: &'a BTreeMap<Vec<u8>, &'a str>,
    encoding: Option<&'a str>,
    ctm: Matrix,
    saved: Vec<Matrix>,
    text: TextState,
    words: WordBuilder,
    subpath_start: Option<(f32, f32)>,
    point: Option<(f32, f32)>,
    pending: Vec<((f32, f32), (f32, f32), EdgeSource)>,
    edges: Vec<Edge>,
}

impl<'a> Interpreter<'a> {
    fn new(media_box: [f32; 4], encodings: &'a BTreeMap<Vec<u8>, &'a str>) -> Self {
        Self {
            media_box,
            encodings,
            encoding: None,
            ctm: Matrix::IDENTITY,
            saved: Vec::new(),
            text: TextState::default(),
            words: WordBuilder::default(),
            subpath_start: None,
            point: None,
            pending: Vec::new(),
            edges: Vec::new(),
        }
    }

    fn flip_x(&self, x: f32) -> f32 {
        x - self.media_box[0]
    }

    fn flip_y(&self, y: f32) -> f32 {
        self.media_box[3] - y
    }

    fn apply(&mut self, operation: &Operation) {
        let operands = operation.operands.as_slice();
        match operation.operator.as_str() {
            "q" => self.saved.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.saved.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(matrix) = Matrix::from_operands(operands) {
                    self.ctm = matrix.then(self.ctm);
                }
            }
            "BT" => {
                self.text.matrix = Matrix::IDENTITY;
                self.text.line_matrix = Matrix::IDENTITY;
            }
            "ET" => self.words.flush(),
            "Tf" => {
                if let Some(name) = operands.first().and_then(|operand| operand.as_name().ok()) {
                    self.encoding = self.encodings.get(name).copied();
                }
                if let Some(size) = operands.get(1).and_then(number) {
                    self.text.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    self.text.leading = leading;
                }
            }
            "Tc" => {
                if let Some(spacing) = operands.first().and_then(number) {
                    self.text.char_spacing = spacing;
                }
            }
            "Tw" => {
                if let Some(spacing) = operands.first().and_then(number) {
                    self.text.word_spacing = spacing;
                }
            }
            "Td" => {
                if let [tx, ty] = numbers(operands).as_slice() {
                    self.move_line(*tx, *ty);
                }
            }
            "TD" => {
                if let [tx, ty] = numbers(operands).as_slice() {
                    self.text.leading = -*ty;
                    self.move_line(*tx, *ty);
                }
            }
            "Tm" => {
                if let Some(matrix) = Matrix::from_operands(operands) {
                    self.text.matrix = matrix;
                    self.text.line_matrix = matrix;
                }
            }
            "T*" => self.next_line(),
            "Tj" => self.show_operands(operands),
            "TJ" => {
                for operand in operands {
                    if let Object::Array(items) = operand {
                        self.show_operands(items);
                    }
                }
            }
            "'" => {
                self.next_line();
                self.show_operands(operands);
            }
            "\"" => {
                if let Some(spacing) = operands.first().and_then(number) {
                    self.text.word_spacing = spacing;
                }
                if let Some(spacing) = operands.get(1).and_then(number) {
                    self.text.char_spacing = spacing;
                }
                self.next_line();
                self.show_operands(operands.get(2..).unwrap_or_default());
            }
            _ => self.apply_path(operation.operator.as_str(), operands),
        }
    }

    fn apply_path(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "m" => {
                if let [x, y] = numbers(operands).as_slice() {
                    let point = self.ctm.apply(*x, *y);
                    self.subpath_start = Some(point);
                    self.point = Some(point);
                }
            }
            "l" => {
                if let [x, y] = numbers(operands).as_slice() {
                    let next = self.ctm.apply(*x, *y);
                    if let Some(current) = self.point {
                        self.pending.push((current, next, EdgeSource::Line));
                    }
                    self.point = Some(next);
                }
            }
            "re" => {
                if let [x, y, width, height] = numbers(operands).as_slice() {
                    let corners = [
                        self.ctm.apply(*x, *y),
                        self.ctm.apply(*x + *width, *y),
                        self.ctm.apply(*x + *width, *y + *height),
                        self.ctm.apply(*x, *y + *height),
                    ];
                    for index in 0..4 {
                        self.pending
                            .push((corners[index], corners[(index + 1) % 4], EdgeSource::Rect));
                    }
                    self.subpath_start = Some(corners[0]);
                    self.point = Some(corners[0]);
                }
            }
            "h" => self.close_subpath(),
            "s" | "b" | "b*" => {
                self.close_subpath();
                self.paint();
            }
            "S" | "f" | "F" | "f*" | "B" | "B*" => self.paint(),
            "n" => {
                self.pending.clear();
                self.point = None;
            }
            _ => {}
        }
    }

    fn close_subpath(&mut self) {
        if let (Some(start), Some(current)) = (self.subpath_start, self.point) {
            if start != current {
                self.pending.push((current, start, EdgeSource::Line));
            }
            self.point = Some(start);
        }
    }

    fn paint(&mut self) {
        for (from, to, source) in std::mem::take(&mut self.pending) {
            if let Some(edge) = self.edge_between(from, to, source) {
                self.edges.push(edge);
            }
        }
        self.point = None;
    }

    fn edge_between(&self, from: (f32, f32), to: (f32, f32), source: EdgeSource) -> Option<Edge> {
        let (x0, y0) = (self.flip_x(from.0), self.flip_y(from.1));
        let (x1, y1) = (self.flip_x(to.0), self.flip_y(to.1));
        if (y0 - y1).abs() <= AXIS_SLACK {
            Some(Edge {
                orientation: Orientation::Horizontal,
                position: (y0 + y1) / 2.0,
                start: x0.min(x1),
                end: x0.max(x1),
                source,
            })
        } else if (x0 - x1).abs() <= AXIS_SLACK {
            Some(Edge {
                orientation: Orientation::Vertical,
                position: (x0 + x1) / 2.0,
                start: y0.min(y1),
                end: y0.max(y1),
                source,
            })
        } else {
            None
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.text.line_matrix = Matrix::translate(tx, ty).then(self.text.line_matrix);
        self.text.matrix = self.text.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.text.leading);
    }

    fn show_operands(&mut self, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => {
                    let decoded = decode_pdf_bytes(self.encoding, bytes);
                    self.show_text(&decoded);
                }
                other => {
                    if let Some(adjustment) = number(other) {
                        self.advance(-adjustment / 1000.0 * self.text.font_size);
                    }
                }
            }
        }
    }

    fn show_text(&mut self, text: &str) {
        for ch in text.chars() {
            let rendering = self.text.matrix.then(self.ctm);
            let scale = rendering.c.hypot(rendering.d);
            let scale = if scale > 0.0 { scale } else { 1.0 };
            let size = self.text.font_size * scale;
            let glyph = GLYPH_ADVANCE * self.text.font_size;
            let (x, y) = rendering.apply(0.0, 0.0);
            let (x_end, _) = rendering.apply(glyph, 0.0);

            let x0 = self.flip_x(x);
            let bottom = self.flip_y(y);
            self.words
                .push_glyph(ch, x0, self.flip_x(x_end), bottom - size, bottom);

            let mut advance = glyph + self.text.char_spacing;
            if ch == ' ' {
                advance += self.text.word_spacing;
            }
            self.advance(advance);
        }
    }

    fn advance(&mut self, distance: f32) {
        self.text.matrix = Matrix::translate(distance, 0.0).then(self.text.matrix);
    }

    fn finish(self) -> PageLayout {
        PageLayout {
            words: self.words.finish(),
            edges: self.edges,
        }
    }
}

fn media_box_of(document: &Document, dictionary: &Dictionary) -> Option<[f32; 4]> {
    let object = dictionary.get(b"MediaBox").ok()?;
    let object = match object {
        Object::Reference(id) => document.get_object(*id).ok()?,
        other => other,
    };
    let Object::Array(items) = object else {
        return None;
    };
    let values = numbers(items);
    let [x0, y0, x1, y1] = values.as_slice() else {
        return None;
    };
    Some([x0.min(*x1), y0.min(*y1), x0.max(*x1), y0.max(*y1)])
}

/// The page's media box, inherited from the page tree when the page itself
/// has none.
fn media_box(document: &Document, page_id: ObjectId) -> [f32; 4] {
    let mut current = document.get_dictionary(page_id).ok();
    for _ in 0..MAX_PARENT_DEPTH {
        let Some(dictionary) = current else {
            break;
        };
        if let Some(media_box) = media_box_of(document, dictionary) {
            return media_box;
        }
        current = dictionary
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| document.get_dictionary(id))
            .ok();
    }
    DEFAULT_MEDIA_BOX
}

fn read_layout(document: &Document, page_id: ObjectId) -> Result<PageLayout, ExtractError> {
    let raw_content = document.get_page_content(page_id)?;
    let content = Content::decode(&raw_content)?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut interpreter = Interpreter::new(media_box(document, page_id), &encodings);
    for operation in &content.operations {
        interpreter.apply(operation);
    }
    Ok(interpreter.finish())
}

/// A loaded PDF ready to hand out pages.
#[derive(Debug)]
pub struct PdfDocument {
    document: Document,
    page_texts: Option<Vec<String>>,
}

impl PdfDocument {
    /// Loads `path` with lopdf and runs pdf-extract once for per-page text.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be parsed as a PDF.
    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        let document = Document::load(path)?;
        let page_count = document.get_pages().len();
        let page_texts = match pdf_extract::extract_text(path) {
            Ok(text) => {
                let pages = split_text_into_pages(&text);
                (pages.len() == page_count).then_some(pages)
            }
            Err(error) => {
                debug!(%error, "pdf-extract could not read the document");
                None
            }
        };
        Ok(Self {
            document,
            page_texts,
        })
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Pages in document order, restricted to `selection` when given.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::NoPagesSelected`] when nothing is left.
    pub fn pages(&self, selection: Option<&PageSelection>) -> Result<Vec<PdfPage<'_>>, ConvertError> {
        let mut pages = Vec::new();
        for (index, (page_number, page_id)) in self.document.get_pages().into_iter().enumerate() {
            if selection.is_some_and(|selection| !selection.contains(page_number)) {
                continue;
            }
            let layout = read_layout(&self.document, page_id).map_err(|error| {
                debug!(page = page_number, %error, "page content could not be interpreted");
                error.to_string()
            });
            let extracted_text = self
                .page_texts
                .as_ref()
                .and_then(|texts| texts.get(index).cloned());
            pages.push(PdfPage {
                document: &self.document,
                number: page_number,
                layout,
                extracted_text,
            });
        }

        if pages.is_empty() {
            return Err(ConvertError::NoPagesSelected);
        }
        Ok(pages)
    }
}

/// One page of a [`PdfDocument`].
#[derive(Debug)]
pub struct PdfPage<'a> {
    document: &'a Document,
    number: u32,
    layout: Result<PageLayout, String>,
    extracted_text: Option<String>,
}

impl PdfPage<'_> {
    fn layout(&self) -> Result<&PageLayout, ExtractError> {
        self.layout
            .as_ref()
            .map_err(|message| ExtractError::ContentDecode(message.clone()))
    }
}

impl TablePage for PdfPage<'_> {
    fn page_number(&self) -> u32 {
        self.number
    }

    fn extract_tables(&self, strategy: ExtractionStrategy) -> Result<Vec<RawTable>, ExtractError> {
        let layout = self.layout()?;
        Ok(detect_tables(&layout.words, &layout.edges, strategy))
    }

    fn words(&self) -> Result<Vec<Word>, ExtractError> {
        let mut words = self.layout()?.words.clone();
        words.sort_by(|left, right| {
            left.top
                .total_cmp(&right.top)
                .then(left.x0.total_cmp(&right.x0))
        });
        Ok(words)
    }

    fn text_above(&self, top: f32) -> Result<String, ExtractError> {
        let above = self
            .layout()?
            .words
            .iter()
            .filter(|word| word.bottom <= top)
            .cloned()
            .collect::<Vec<_>>();
        Ok(words_to_text(&above))
    }

    fn text(&self) -> Result<String, ExtractError> {
        let mut candidates = Vec::new();
        if let Some(text) = self
            .extracted_text
            .as_ref()
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text.clone());
        }
        if let Ok(layout) = self.layout() {
            let text = words_to_text(&layout.words);
            if !text.trim().is_empty() {
                candidates.push(text);
            }
        }
        if let Some(text) = self
            .document
            .extract_text(&[self.number])
            .ok()
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text);
        }
        Ok(choose_best_text(&candidates))
    }
}
