use crate::model::{RawTable, Word};
use crate::page::{ExtractionStrategy, LineMode, group_into_lines, render_line, words_to_text};
use crate::table_parse::detect_text_tables;

/// Edges closer than this are snapped onto one position.
pub(crate) const SNAP_TOLERANCE: f32 = 3.0;
/// Collinear edges with a gap up to this are joined.
pub(crate) const JOIN_TOLERANCE: f32 = 3.0;
/// Shorter edges are ignored.
pub(crate) const EDGE_MIN_LENGTH: f32 = 3.0;
/// Slack when testing whether a horizontal and a vertical edge cross.
pub(crate) const INTERSECTION_TOLERANCE: f32 = 3.0;
/// Minimum cells per line for the text layout.
pub(crate) const MIN_TEXT_COLUMNS: usize = 2;
/// Glyph widths between two words that start a new cell.
const CELL_GAP_GLYPHS: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeSource {
    Line,
    Rect,
}

/// An axis-aligned ruling segment in top-left-origin coordinates. `position`
/// is the y of a horizontal edge or the x of a vertical one; `start..end`
/// spans the other axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Edge {
    pub orientation: Orientation,
    pub position: f32,
    pub start: f32,
    pub end: f32,
    pub source: EdgeSource,
}

impl Edge {
    fn length(&self) -> f32 {
        self.end - self.start
    }
}

fn accepts(mode: LineMode, edge: &Edge) -> bool {
    match mode {
        LineMode::LinesStrict => edge.source == EdgeSource::Line,
        LineMode::Lines | LineMode::Text => true,
    }
}

/// Tables laid out with whitespace: cells split where the gap between two
/// words is wider than a glyph and a half.
pub(crate) fn text_layout_tables(words: &[Word]) -> Vec<RawTable> {
    let lines = group_into_lines(words)
        .iter()
        .map(|line| {
            let glyph = line
                .iter()
                .map(|word| word.bottom - word.top)
                .fold(0.0_f32, f32::max)
                * 0.5;
            render_line(line, glyph * CELL_GAP_GLYPHS)
        })
        .collect::<Vec<_>>();
    detect_text_tables(&lines, MIN_TEXT_COLUMNS)
}

fn snap(edges: &mut [Edge]) {
    edges.sort_by(|left, right| left.position.total_cmp(&right.position));
    let mut start = 0;
    while start < edges.len() {
        let anchor = edges[start].position;
        let mut end = start;
        while end < edges.len() && edges[end].position - anchor <= SNAP_TOLERANCE {
            end += 1;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = edges[start..end].iter().map(|edge| edge.position).sum::<f32>()
            / (end - start) as f32;
        for edge in &mut edges[start..end] {
            edge.position = mean;
        }
        start = end;
    }
}

fn join(mut edges: Vec<Edge>) -> Vec<Edge> {
    edges.sort_by(|left, right| {
        left.position
            .total_cmp(&right.position)
            .then(left.start.total_cmp(&right.start))
    });
    let mut joined: Vec<Edge> = Vec::new();
    for edge in edges {
        match joined.last_mut() {
            Some(last)
                if (last.position - edge.position).abs() < f32::EPSILON
                    && edge.start <= last.end + JOIN_TOLERANCE =>
            {
                last.end = last.end.max(edge.end);
            }
            _ => joined.push(edge),
        }
    }
    joined
}

fn prepare(edges: &[Edge], orientation: Orientation, mode: LineMode) -> Vec<Edge> {
    let mut selected = edges
        .iter()
        .filter(|edge| edge.orientation == orientation)
        .filter(|edge| accepts(mode, edge))
        .filter(|edge| edge.length() >= EDGE_MIN_LENGTH)
        .copied()
        .collect::<Vec<_>>();
    snap(&mut selected);
    join(selected)
}

fn crosses(horizontal: &Edge, vertical: &Edge) -> bool {
    vertical.position >= horizontal.start - INTERSECTION_TOLERANCE
        && vertical.position <= horizontal.end + INTERSECTION_TOLERANCE
        && horizontal.position >= vertical.start - INTERSECTION_TOLERANCE
        && horizontal.position <= vertical.end + INTERSECTION_TOLERANCE
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut index: usize) -> usize {
        while self.parent[index] != index {
            self.parent[index] = self.parent[self.parent[index]];
            index = self.parent[index];
        }
        index
    }

    fn union(&mut self, left: usize, right: usize) {
        let left = self.find(left);
        let right = self.find(right);
        if left != right {
            self.parent[right] = left;
        }
    }
}

fn distinct_positions(mut positions: Vec<f32>) -> Vec<f32> {
    positions.sort_by(f32::total_cmp);
    positions.dedup_by(|next, kept| (*next - *kept).abs() <= SNAP_TOLERANCE);
    positions
}

fn fill_grid(xs: &[f32], ys: &[f32], words: &[Word]) -> RawTable {
    ys.windows(2)
        .map(|row| {
            xs.windows(2)
                .map(|column| {
                    let inside = words
                        .iter()
                        .filter(|word| {
                            let cx = (word.x0 + word.x1) / 2.0;
                            let cy = (word.top + word.bottom) / 2.0;
                            cx > column[0] && cx < column[1] && cy > row[0] && cy < row[1]
                        })
                        .cloned()
                        .collect::<Vec<_>>();
                    Some(words_to_text(&inside))
                })
                .collect()
        })
        .collect()
}

/// Tables drawn with ruling lines. Every connected set of crossing edges with
/// at least two rules per axis becomes one grid.
pub(crate) fn ruled_tables(
    edges: &[Edge],
    words: &[Word],
    strategy: ExtractionStrategy,
) -> Vec<RawTable> {
    let horizontals = prepare(edges, Orientation::Horizontal, strategy.horizontal);
    let verticals = prepare(edges, Orientation::Vertical, strategy.vertical);
    if horizontals.len() < 2 || verticals.len() < 2 {
        return Vec::new();
    }

    let offset = horizontals.len();
    let mut groups = DisjointSet::new(offset + verticals.len());
    for (h_index, horizontal) in horizontals.iter().enumerate() {
        for (v_index, vertical) in verticals.iter().enumerate() {
            if crosses(horizontal, vertical) {
                groups.union(h_index, offset + v_index);
            }
        }
    }

    let mut components: Vec<(usize, Vec<f32>, Vec<f32>)> = Vec::new();
    for index in 0..offset + verticals.len() {
        let root = groups.find(index);
        let slot = match components.iter().position(|(id, _, _)| *id == root) {
            Some(slot) => slot,
            None => {
                components.push((root, Vec::new(), Vec::new()));
                components.len() - 1
            }
        };
        if index < offset {
            components[slot].2.push(horizontals[index].position);
        } else {
            components[slot].1.push(verticals[index - offset].position);
        }
    }

    let mut grids = components
        .into_iter()
        .filter_map(|(_, xs, ys)| {
            let xs = distinct_positions(xs);
            let ys = distinct_positions(ys);
            (xs.len() >= 2 && ys.len() >= 2).then_some((xs, ys))
        })
        .collect::<Vec<_>>();
    grids.sort_by(|left, right| {
        left.1[0]
            .total_cmp(&right.1[0])
            .then(left.0[0].total_cmp(&right.0[0]))
    });

    grids
        .iter()
        .map(|(xs, ys)| fill_grid(xs, ys, words))
        .collect()
}

/// Finds tables on one page. A text vertical mode splits columns on word
/// gaps; any other vertical mode reads a ruled grid.
pub(crate) fn detect_tables(
    words: &[Word],
    edges: &[Edge],
    strategy: ExtractionStrategy,
) -> Vec<RawTable> {
    match strategy.vertical {
        LineMode::Text => text_layout_tables(words),
        LineMode::Lines | LineMode::LinesStrict => ruled_tables(edges, words, strategy),
    }
}
