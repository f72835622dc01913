//! Table model - table, cell attributes and grid rectangles
//!
//! Tables are stored as `Table -> TableRow -> TableCell` nodes. A cell
//! covers `row_span x col_span` grid positions starting at the first free
//! column of its row; [`TableMap`](crate::TableMap) expands the spans into a
//! rectangular occupancy grid.

use serde::{Deserialize, Serialize};

/// Column ceiling for tables. Column insertion is refused beyond this.
pub const MAX_TABLE_COLUMNS: usize = 8;

// =============================================================================
// Alignment
// =============================================================================

/// Horizontal placement of the table on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableAlignment {
    #[default]
    Left,
    Center,
    Right,
}

impl TableAlignment {
    /// Value used for the `justify-self` style property
    pub fn as_css(self) -> &'static str {
        match self {
            TableAlignment::Left => "left",
            TableAlignment::Center => "center",
            TableAlignment::Right => "right",
        }
    }

    /// Parse a `justify-self` value. `start`/`end` map to left/right.
    pub fn from_css(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" | "flex-start" => Some(TableAlignment::Left),
            "center" => Some(TableAlignment::Center),
            "right" | "end" | "flex-end" => Some(TableAlignment::Right),
            _ => None,
        }
    }
}

// =============================================================================
// Table
// =============================================================================

/// Table-level attributes. Rows are the node's children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub alignment: TableAlignment,
    /// Width as a percentage of the available width
    #[serde(default)]
    pub width: Option<f32>,
    /// Per-column widths, empty when the layout decides
    #[serde(default)]
    pub column_widths: Vec<f32>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alignment(mut self, alignment: TableAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_width(mut self, percent: f32) -> Self {
        self.width = Some(percent);
        self
    }

    pub fn with_column_widths(mut self, widths: Vec<f32>) -> Self {
        self.column_widths = widths;
        self
    }

    /// Keep the width list in step with an inserted column.
    /// The new column copies the width of its neighbour.
    pub fn insert_column_width(&mut self, index: usize) {
        if self.column_widths.is_empty() {
            return;
        }
        let index = index.min(self.column_widths.len());
        let neighbour = if index > 0 {
            self.column_widths[index - 1]
        } else {
            self.column_widths[0]
        };
        self.column_widths.insert(index, neighbour);
    }

    pub fn remove_column_widths(&mut self, start: usize, count: usize) {
        if start >= self.column_widths.len() {
            return;
        }
        let end = (start + count).min(self.column_widths.len());
        self.column_widths.drain(start..end);
    }
}

// =============================================================================
// Cells
// =============================================================================

/// Header flags of a cell, tracked independently
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeaderState {
    /// Cell belongs to a header row
    #[serde(default)]
    pub row: bool,
    /// Cell belongs to a header column
    #[serde(default)]
    pub column: bool,
}

impl HeaderState {
    pub const NONE: HeaderState = HeaderState { row: false, column: false };

    pub fn is_header(self) -> bool {
        self.row || self.column
    }
}

/// Cell attributes. Block content is the node's children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub row_span: u32,
    pub col_span: u32,
    #[serde(default)]
    pub header: HeaderState,
    /// Header flags of every grid position a merged cell covers, row-major
    /// over its footprint. Recorded by merging so unmerging can restore them;
    /// empty when the cell was not produced by a merge.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub covered_headers: Vec<HeaderState>,
}

impl TableCell {
    pub fn new() -> Self {
        Self {
            row_span: 1,
            col_span: 1,
            header: HeaderState::NONE,
            covered_headers: Vec::new(),
        }
    }

    pub fn with_header(header: HeaderState) -> Self {
        Self { header, ..Self::new() }
    }

    pub fn spanning(row_span: u32, col_span: u32) -> Self {
        Self {
            row_span,
            col_span,
            header: HeaderState::NONE,
            covered_headers: Vec::new(),
        }
    }

    /// Row span, at least 1
    pub fn effective_row_span(&self) -> usize {
        self.row_span.max(1) as usize
    }

    /// Column span, at least 1
    pub fn effective_col_span(&self) -> usize {
        self.col_span.max(1) as usize
    }

    pub fn is_merged(&self) -> bool {
        self.effective_row_span() > 1 || self.effective_col_span() > 1
    }

    /// Recorded header flags, if they still match the cell's spans
    pub fn recorded_headers(&self) -> Option<&[HeaderState]> {
        let positions = self.effective_row_span() * self.effective_col_span();
        (positions > 1 && self.covered_headers.len() == positions).then_some(self.covered_headers.as_slice())
    }
}

impl Default for TableCell {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Grid Rectangles
// =============================================================================

/// Inclusive rectangle of grid positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRect {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl GridRect {
    /// Rectangle between two corners, in any order
    pub fn new(start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> Self {
        Self {
            start_row: start_row.min(end_row),
            start_col: start_col.min(end_col),
            end_row: start_row.max(end_row),
            end_col: start_col.max(end_col),
        }
    }

    /// Rectangle anchored at `(row, col)` covering `rows x cols` positions
    pub fn from_origin(row: usize, col: usize, rows: usize, cols: usize) -> Self {
        Self {
            start_row: row,
            start_col: col,
            end_row: row + rows.max(1) - 1,
            end_col: col + cols.max(1) - 1,
        }
    }

    pub fn row_count(&self) -> usize {
        self.end_row - self.start_row + 1
    }

    pub fn col_count(&self) -> usize {
        self.end_col - self.start_col + 1
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }

    pub fn is_origin(&self, row: usize, col: usize) -> bool {
        row == self.start_row && col == self.start_col
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &GridRect) -> GridRect {
        GridRect {
            start_row: self.start_row.min(other.start_row),
            start_col: self.start_col.min(other.start_col),
            end_row: self.end_row.max(other.end_row),
            end_col: self.end_col.max(other.end_col),
        }
    }

    /// Check whether the rectangle crosses the horizontal line above `row`
    pub fn crosses_row_boundary(&self, row: usize) -> bool {
        self.start_row < row && row <= self.end_row
    }

    /// Check whether the rectangle crosses the vertical line left of `col`
    pub fn crosses_col_boundary(&self, col: usize) -> bool {
        self.start_col < col && col <= self.end_col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_headers_must_match_spans() {
        let header = HeaderState { row: true, column: false };
        let mut cell = TableCell::spanning(1, 2);
        assert!(cell.recorded_headers().is_none());

        cell.covered_headers = vec![header, HeaderState::NONE];
        assert_eq!(cell.recorded_headers(), Some(&[header, HeaderState::NONE][..]));

        // A span change leaves the record describing another footprint
        cell.col_span = 3;
        assert!(cell.recorded_headers().is_none());
    }

    #[test]
    fn test_alignment_css() {
        assert_eq!(TableAlignment::from_css(" Center "), Some(TableAlignment::Center));
        assert_eq!(TableAlignment::from_css("end"), Some(TableAlignment::Right));
        assert_eq!(TableAlignment::from_css("stretch"), None);
        assert_eq!(TableAlignment::Right.as_css(), "right");
    }

    #[test]
    fn test_effective_spans() {
        let cell = TableCell::spanning(0, 3);
        assert_eq!(cell.effective_row_span(), 1);
        assert_eq!(cell.effective_col_span(), 3);
        assert!(cell.is_merged());
        assert!(!TableCell::new().is_merged());
    }

    #[test]
    fn test_grid_rect() {
        let rect = GridRect::new(2, 3, 0, 1);
        assert_eq!(rect, GridRect { start_row: 0, start_col: 1, end_row: 2, end_col: 3 });
        assert_eq!(rect.row_count(), 3);
        assert_eq!(rect.col_count(), 3);
        assert!(rect.contains(1, 2));
        assert!(!rect.contains(3, 2));
        assert!(rect.is_origin(0, 1));

        let other = GridRect::from_origin(4, 0, 1, 1);
        assert_eq!(rect.union(&other), GridRect::new(0, 0, 4, 3));
    }

    #[test]
    fn test_boundary_crossing() {
        let rect = GridRect::from_origin(1, 0, 2, 1);
        assert!(rect.crosses_row_boundary(2));
        assert!(!rect.crosses_row_boundary(1));
        assert!(!rect.crosses_row_boundary(3));
        assert!(!rect.crosses_col_boundary(1));
    }

    #[test]
    fn test_column_widths_follow_columns() {
        let mut table = Table::new().with_column_widths(vec![100.0, 50.0]);
        table.insert_column_width(1);
        assert_eq!(table.column_widths, vec![100.0, 100.0, 50.0]);
        table.remove_column_widths(0, 2);
        assert_eq!(table.column_widths, vec![50.0]);

        let mut auto = Table::new();
        auto.insert_column_width(0);
        assert!(auto.column_widths.is_empty());
    }
}
