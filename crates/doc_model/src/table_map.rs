//! Table grid resolution
//!
//! [`TableMap`] expands a table's row/cell structure into a rectangular
//! occupancy grid. Rows are walked top to bottom; each cell claims a
//! `row_span x col_span` rectangle at the first column of its row not
//! already claimed by a vertical span from above. Malformed spans are
//! clamped with a warning instead of failing.

use crate::{DocumentTree, GridRect, NodeId, NodeType};
use std::collections::HashMap;

/// Where a cell sits in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPlacement {
    pub cell_id: NodeId,
    /// Index of the row node that owns the cell
    pub row_index: usize,
    /// Footprint after clamping
    pub rect: GridRect,
}

/// Read-only grid view of one table
#[derive(Debug, Clone)]
pub struct TableMap {
    table_id: NodeId,
    row_ids: Vec<NodeId>,
    grid: Vec<Vec<Option<NodeId>>>,
    placements: HashMap<NodeId, CellPlacement>,
    column_count: usize,
    clamped: bool,
}

impl TableMap {
    /// Resolve the grid of `table_id`, or None if it is not a table
    pub fn build(tree: &DocumentTree, table_id: NodeId) -> Option<TableMap> {
        tree.get_table(table_id)?;

        let row_ids: Vec<NodeId> = tree
            .children(table_id)
            .iter()
            .copied()
            .filter(|&id| tree.node_type(id) == Some(NodeType::TableRow))
            .collect();
        let row_count = row_ids.len();
        let mut grid: Vec<Vec<Option<NodeId>>> = vec![Vec::new(); row_count];
        let mut placements = HashMap::new();
        let mut clamped = false;

        for (r, &row_id) in row_ids.iter().enumerate() {
            let mut c = 0;
            for &cell_id in tree.children(row_id) {
                let Some(cell) = tree.get_table_cell(cell_id) else {
                    continue;
                };

                while is_claimed(&grid[r], c) {
                    c += 1;
                }

                let mut row_span = cell.effective_row_span();
                if r + row_span > row_count {
                    tracing::warn!(
                        "Cell {} spans {} rows past the end of table {}, clamping",
                        cell_id,
                        r + row_span - row_count,
                        table_id
                    );
                    row_span = row_count - r;
                    clamped = true;
                }

                let wanted_cols = cell.effective_col_span();
                let col_span = (c..c + wanted_cols)
                    .take_while(|&col| (r..r + row_span).all(|row| !is_claimed(&grid[row], col)))
                    .count()
                    .max(1);
                if col_span < wanted_cols {
                    tracing::warn!(
                        "Cell {} column span {} overlaps claimed positions in table {}, clamping to {}",
                        cell_id,
                        wanted_cols,
                        table_id,
                        col_span
                    );
                    clamped = true;
                }

                for row in grid.iter_mut().skip(r).take(row_span) {
                    for col in c..c + col_span {
                        claim(row, col, cell_id);
                    }
                }
                placements.insert(
                    cell_id,
                    CellPlacement {
                        cell_id,
                        row_index: r,
                        rect: GridRect::from_origin(r, c, row_span, col_span),
                    },
                );
                c += col_span;
            }
        }

        let column_count = grid.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut grid {
            row.resize(column_count, None);
        }

        Some(TableMap {
            table_id,
            row_ids,
            grid,
            placements,
            column_count,
            clamped,
        })
    }

    /// Resolve the table around any node inside a cell.
    /// Returns the map and the innermost cell containing `node_id`.
    pub fn for_node(tree: &DocumentTree, node_id: NodeId) -> Option<(TableMap, NodeId)> {
        let cell_id = tree.find_ancestor_of_type(node_id, NodeType::TableCell)?;
        let row_id = tree.parent(cell_id)?;
        let table_id = tree.parent(row_id)?;
        let map = TableMap::build(tree, table_id)?;
        Some((map, cell_id))
    }

    pub fn table_id(&self) -> NodeId {
        self.table_id
    }

    pub fn row_count(&self) -> usize {
        self.row_ids.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn row_id(&self, row: usize) -> Option<NodeId> {
        self.row_ids.get(row).copied()
    }

    pub fn row_ids(&self) -> &[NodeId] {
        &self.row_ids
    }

    /// The cell covering `(row, col)`
    pub fn cell_at(&self, row: usize, col: usize) -> Option<NodeId> {
        self.grid.get(row)?.get(col).copied().flatten()
    }

    pub fn placement(&self, cell_id: NodeId) -> Option<&CellPlacement> {
        self.placements.get(&cell_id)
    }

    pub fn rect_of(&self, cell_id: NodeId) -> Option<GridRect> {
        self.placements.get(&cell_id).map(|placement| placement.rect)
    }

    pub fn cell_count(&self) -> usize {
        self.placements.len()
    }

    /// Every placed cell, ordered by origin in row-major order
    pub fn cells(&self) -> Vec<NodeId> {
        self.cells_in_rect(GridRect::new(
            0,
            0,
            self.row_count().saturating_sub(1),
            self.column_count.saturating_sub(1),
        ))
    }

    /// Cells owned by row node `row`, ordered by starting column
    pub fn cells_originating_in_row(&self, row: usize) -> Vec<NodeId> {
        let mut cells: Vec<&CellPlacement> = self
            .placements
            .values()
            .filter(|placement| placement.row_index == row)
            .collect();
        cells.sort_by_key(|placement| placement.rect.start_col);
        cells.into_iter().map(|placement| placement.cell_id).collect()
    }

    /// Cells touching `rect`, by first appearance in row-major order
    pub fn cells_in_rect(&self, rect: GridRect) -> Vec<NodeId> {
        let mut seen = Vec::new();
        for row in rect.start_row..=rect.end_row {
            for col in rect.start_col..=rect.end_col {
                if let Some(cell_id) = self.cell_at(row, col) {
                    if !seen.contains(&cell_id) {
                        seen.push(cell_id);
                    }
                }
            }
        }
        seen
    }

    /// Grow `rect` until it fully contains every cell footprint it touches
    pub fn covering_rect(&self, rect: GridRect) -> GridRect {
        let mut current = rect;
        loop {
            let grown = self
                .cells_in_rect(current)
                .iter()
                .filter_map(|&cell_id| self.rect_of(cell_id))
                .fold(current, |acc, footprint| acc.union(&footprint));
            if grown == current {
                return current;
            }
            current = grown;
        }
    }

    /// Bounding rectangle covering the full footprints of `cells`
    pub fn bounding_rect(&self, cells: &[NodeId]) -> Option<GridRect> {
        let rect = cells
            .iter()
            .filter_map(|&cell_id| self.rect_of(cell_id))
            .reduce(|acc, footprint| acc.union(&footprint))?;
        Some(self.covering_rect(rect))
    }

    /// True when every position is covered by exactly one declared footprint
    pub fn is_fully_tiled(&self) -> bool {
        !self.clamped && self.grid.iter().flatten().all(Option::is_some)
    }

    /// True when some span had to be clamped during resolution
    pub fn was_clamped(&self) -> bool {
        self.clamped
    }
}

fn is_claimed(row: &[Option<NodeId>], col: usize) -> bool {
    row.get(col).is_some_and(Option::is_some)
}

fn claim(row: &mut Vec<Option<NodeId>>, col: usize, cell_id: NodeId) {
    if row.len() <= col {
        row.resize(col + 1, None);
    }
    row[col] = Some(cell_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DocNode, Table, TableCell};

    /// Build a table from per-row `(row_span, col_span)` lists
    fn table_from_spans(spans: &[&[(u32, u32)]]) -> (DocumentTree, NodeId, Vec<Vec<NodeId>>) {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let table_id = tree.insert_node(DocNode::table(Table::new()), root, None).unwrap();
        let mut ids = Vec::new();
        for row_spans in spans {
            let row_id = tree.insert_node(DocNode::table_row(), table_id, None).unwrap();
            let mut row_ids = Vec::new();
            for &(row_span, col_span) in row_spans.iter() {
                let cell = TableCell::spanning(row_span, col_span);
                let cell_id = tree.insert_node(DocNode::table_cell(cell), row_id, None).unwrap();
                tree.insert_node(DocNode::paragraph(), cell_id, None).unwrap();
                row_ids.push(cell_id);
            }
            ids.push(row_ids);
        }
        (tree, table_id, ids)
    }

    #[test]
    fn test_plain_grid() {
        let (tree, table_id, ids) = table_from_spans(&[&[(1, 1), (1, 1)], &[(1, 1), (1, 1)]]);
        let map = TableMap::build(&tree, table_id).unwrap();
        assert_eq!(map.row_count(), 2);
        assert_eq!(map.column_count(), 2);
        assert_eq!(map.cell_at(1, 0), Some(ids[1][0]));
        assert_eq!(map.cell_at(2, 0), None);
        assert!(map.is_fully_tiled());
        assert_eq!(map.cells(), vec![ids[0][0], ids[0][1], ids[1][0], ids[1][1]]);
    }

    #[test]
    fn test_vertical_span_shifts_next_row() {
        // A spans two rows; the second row's only cell lands in column 1
        let (tree, table_id, ids) = table_from_spans(&[&[(2, 1), (1, 1)], &[(1, 1)]]);
        let map = TableMap::build(&tree, table_id).unwrap();
        assert_eq!(map.cell_at(1, 0), Some(ids[0][0]));
        assert_eq!(map.cell_at(1, 1), Some(ids[1][0]));
        assert_eq!(map.rect_of(ids[1][0]), Some(GridRect::from_origin(1, 1, 1, 1)));
        assert!(map.is_fully_tiled());
    }

    #[test]
    fn test_horizontal_span() {
        let (tree, table_id, ids) = table_from_spans(&[&[(1, 3)], &[(1, 1), (1, 1), (1, 1)]]);
        let map = TableMap::build(&tree, table_id).unwrap();
        assert_eq!(map.column_count(), 3);
        assert_eq!(map.cell_at(0, 2), Some(ids[0][0]));
        assert_eq!(map.cells_in_rect(GridRect::new(0, 1, 0, 2)), vec![ids[0][0]]);
        assert!(map.is_fully_tiled());
    }

    #[test]
    fn test_row_span_past_end_is_clamped() {
        let (tree, table_id, ids) = table_from_spans(&[&[(5, 1), (1, 1)], &[(1, 1)]]);
        let map = TableMap::build(&tree, table_id).unwrap();
        assert_eq!(map.rect_of(ids[0][0]), Some(GridRect::from_origin(0, 0, 2, 1)));
        assert!(map.was_clamped());
        assert!(!map.is_fully_tiled());
    }

    #[test]
    fn test_overlapping_col_span_is_clamped() {
        // Row 1's first cell wants two columns but column 1 is held by B
        let (tree, table_id, ids) = table_from_spans(&[&[(1, 1), (2, 1)], &[(1, 2)]]);
        let map = TableMap::build(&tree, table_id).unwrap();
        assert_eq!(map.rect_of(ids[1][0]), Some(GridRect::from_origin(1, 0, 1, 1)));
        assert_eq!(map.cell_at(1, 1), Some(ids[0][1]));
        assert!(map.was_clamped());
    }

    #[test]
    fn test_short_row_leaves_gap() {
        let (tree, table_id, _) = table_from_spans(&[&[(1, 1), (1, 1)], &[(1, 1)]]);
        let map = TableMap::build(&tree, table_id).unwrap();
        assert_eq!(map.cell_at(1, 1), None);
        assert!(!map.is_fully_tiled());
    }

    #[test]
    fn test_covering_rect_grows_to_merged_cells() {
        // B spans rows 0-1 in column 1; selecting A..C must pull in all of B
        let (tree, table_id, ids) =
            table_from_spans(&[&[(1, 1), (2, 1), (1, 1)], &[(1, 1), (1, 1)], &[(1, 3)]]);
        let map = TableMap::build(&tree, table_id).unwrap();
        let rect = map.bounding_rect(&[ids[0][0], ids[0][1]]).unwrap();
        assert_eq!(rect, GridRect::new(0, 0, 1, 1));

        let rect = map.bounding_rect(&[ids[1][1], ids[2][0]]).unwrap();
        assert_eq!(rect, GridRect::new(0, 0, 2, 2));
    }

    #[test]
    fn test_for_node_finds_cell() {
        let (mut tree, table_id, ids) = table_from_spans(&[&[(1, 1)]]);
        let para = tree.children(ids[0][0])[0];
        let run = tree.insert_node(DocNode::text("x"), para, None).unwrap();
        let (map, cell) = TableMap::for_node(&tree, run).unwrap();
        assert_eq!(map.table_id(), table_id);
        assert_eq!(cell, ids[0][0]);
        assert!(TableMap::for_node(&tree, tree.root_id()).is_none());
    }

    #[test]
    fn test_not_a_table() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let para = tree.insert_node(DocNode::paragraph(), root, None).unwrap();
        assert!(TableMap::build(&tree, para).is_none());
    }
}
