//! Table editing commands
//!
//! Every command resolves its table from the selection at execution time and
//! works through the [`TableMap`] grid, so merged cells are handled by their
//! full footprint rather than by row/child index.

use crate::command::{
    caret_inside, caret_near_removed, remove_block, resolve_cell_range, resolve_table_target, TableTarget,
};
use crate::{Command, CommandResult, EditError, Result};
use doc_model::{
    DocNode, DocumentTree, EditorSelection, GridRect, HeaderState, NodeId, NodeType, Table,
    TableAlignment, TableMap, MAX_TABLE_COLUMNS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Side of the selected cell a new row or column goes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Before,
    After,
}

/// Column count of the table around the selection, if any
pub fn column_count_at(tree: &DocumentTree, selection: &EditorSelection) -> Option<usize> {
    resolve_table_target(tree, selection)
        .ok()
        .map(|target| target.map.column_count())
}

/// Whether another column may be added to the table around the selection
pub fn can_insert_column(tree: &DocumentTree, selection: &EditorSelection) -> bool {
    column_count_at(tree, selection).is_some_and(|count| count < MAX_TABLE_COLUMNS)
}

fn footprint(map: &TableMap, cell_id: NodeId) -> Result<GridRect> {
    map.rect_of(cell_id)
        .ok_or_else(|| EditError::SelectionUnresolved(format!("cell {} is not placed in the grid", cell_id)))
}

fn set_spans(tree: &mut DocumentTree, cell_id: NodeId, row_span: usize, col_span: usize) -> Result<()> {
    let cell = tree
        .get_table_cell_mut(cell_id)
        .ok_or(doc_model::DocModelError::NodeNotFound(cell_id.as_uuid()))?;
    cell.row_span = row_span as u32;
    cell.col_span = col_span as u32;
    // Recorded flags describe the old footprint
    cell.covered_headers.clear();
    Ok(())
}

fn header_of(tree: &DocumentTree, cell_id: Option<NodeId>) -> HeaderState {
    cell_id
        .and_then(|id| tree.get_table_cell(id))
        .map(|cell| cell.header)
        .unwrap_or_default()
}

/// Header flags at one grid position. A merged cell answers from its
/// recorded flags when it has them.
fn header_at(tree: &DocumentTree, map: &TableMap, row: usize, col: usize) -> HeaderState {
    let Some(cell_id) = map.cell_at(row, col) else {
        return HeaderState::NONE;
    };
    let Some(cell) = tree.get_table_cell(cell_id) else {
        return HeaderState::NONE;
    };
    match (cell.recorded_headers(), map.rect_of(cell_id)) {
        (Some(recorded), Some(rect)) => {
            recorded[(row - rect.start_row) * rect.col_count() + (col - rect.start_col)]
        }
        _ => cell.header,
    }
}

/// Remove a table and keep its container valid
fn remove_table(tree: &mut DocumentTree, table_id: NodeId) -> Result<EditorSelection> {
    let parent_id = tree
        .parent(table_id)
        .ok_or_else(|| EditError::InvalidCommand("table has no parent".into()))?;
    let index = tree.index_in_parent(table_id).unwrap_or(0);
    remove_block(tree, table_id)?;

    // A cell or the document must keep at least one block
    if tree.children(parent_id).is_empty() {
        tree.insert_node(DocNode::paragraph(), parent_id, None)?;
    }
    Ok(caret_near_removed(tree, parent_id, index))
}

// =============================================================================
// Merge / Unmerge
// =============================================================================

/// Merge the selected cells into the top-left cell of their covering rectangle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeCells;

impl MergeCells {
    pub fn new() -> Self {
        Self
    }
}

impl Command for MergeCells {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let range = resolve_cell_range(tree, selection)?;
        if range.cells.len() < 2 {
            return Err(EditError::SelectionUnresolved(
                "merging needs at least two cells".into(),
            ));
        }
        let map = range.map;
        let rect = map
            .bounding_rect(&range.cells)
            .ok_or_else(|| EditError::SelectionUnresolved("selected cells are not placed".into()))?;
        let cells = map.cells_in_rect(rect);
        let target = map
            .cell_at(rect.start_row, rect.start_col)
            .ok_or_else(|| EditError::InvalidCommand("merge area has no top-left cell".into()))?;

        let mut new_tree = tree.clone();

        let donors: Vec<NodeId> = cells
            .iter()
            .copied()
            .filter(|&cell| cell != target && !tree.is_empty_cell(cell))
            .collect();

        if !donors.is_empty() && tree.is_empty_cell(target) {
            for child in tree.children(target).to_vec() {
                new_tree.remove_node(child)?;
            }
        }
        for donor in &donors {
            for child in tree.children(*donor).to_vec() {
                new_tree.move_node(child, target, None)?;
            }
        }
        for &cell in cells.iter().filter(|&&cell| cell != target) {
            new_tree.remove_node(cell)?;
        }

        let covered_headers: Vec<HeaderState> = (rect.start_row..=rect.end_row)
            .flat_map(|row| (rect.start_col..=rect.end_col).map(move |col| (row, col)))
            .map(|(row, col)| header_at(tree, &map, row, col))
            .collect();
        set_spans(&mut new_tree, target, rect.row_count(), rect.col_count())?;
        if let Some(cell) = new_tree.get_table_cell_mut(target) {
            cell.covered_headers = covered_headers;
        }
        if new_tree.children(target).is_empty() {
            new_tree.insert_node(DocNode::paragraph(), target, None)?;
        }

        let selection = caret_inside(&new_tree, target);
        Ok(CommandResult {
            tree: new_tree,
            selection,
        })
    }

    fn display_name(&self) -> &str {
        "Merge Cells"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

/// Split a merged cell back into single cells
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnmergeCell;

impl UnmergeCell {
    pub fn new() -> Self {
        Self
    }
}

impl Command for UnmergeCell {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        if !selection.is_collapsed() {
            return Err(EditError::SelectionUnresolved(
                "unmerging needs a caret inside one cell".into(),
            ));
        }
        let TableTarget { map, cell_id } = resolve_table_target(tree, selection)?;
        let rect = footprint(&map, cell_id)?;
        if rect.row_count() == 1 && rect.col_count() == 1 {
            return Err(EditError::InvalidCommand("cell is not merged".into()));
        }

        let own_header = header_of(tree, Some(cell_id));
        let recorded = tree
            .get_table_cell(cell_id)
            .and_then(|cell| cell.recorded_headers())
            .map(<[HeaderState]>::to_vec);
        let recorded_at = |row: usize, col: usize| {
            recorded
                .as_ref()
                .map(|headers| headers[(row - rect.start_row) * rect.col_count() + (col - rect.start_col)])
        };

        let mut new_tree = tree.clone();
        set_spans(&mut new_tree, cell_id, 1, 1)?;
        if let (Some(header), Some(cell)) = (recorded_at(rect.start_row, rect.start_col), new_tree.get_table_cell_mut(cell_id)) {
            cell.header = header;
        }

        for row in rect.start_row..=rect.end_row {
            let row_id = map
                .row_id(row)
                .ok_or_else(|| EditError::InvalidCommand(format!("row {} is missing", row)))?;

            // Without recorded flags, header flags come from the rest of the
            // line outside the merged area
            let row_flag = (0..map.column_count())
                .filter(|&col| !rect.contains(row, col))
                .find_map(|col| map.cell_at(row, col))
                .map(|other| header_of(tree, Some(other)).row)
                .unwrap_or(own_header.row);

            let mut index = map
                .cells_originating_in_row(row)
                .iter()
                .filter(|&&other| map.rect_of(other).is_some_and(|r| r.start_col < rect.start_col))
                .count();
            if row == rect.start_row {
                index += 1;
            }

            for col in rect.start_col..=rect.end_col {
                if rect.is_origin(row, col) {
                    continue;
                }
                let column_flag = (0..map.row_count())
                    .filter(|&r| !rect.contains(r, col))
                    .find_map(|r| map.cell_at(r, col))
                    .map(|other| header_of(tree, Some(other)).column)
                    .unwrap_or(own_header.column);

                let header = recorded_at(row, col).unwrap_or(HeaderState {
                    row: row_flag,
                    column: column_flag,
                });
                new_tree.insert_empty_cell(row_id, Some(index), header)?;
                index += 1;
            }
        }

        Ok(CommandResult {
            tree: new_tree,
            selection: *selection,
        })
    }

    fn display_name(&self) -> &str {
        "Unmerge Cell"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

// =============================================================================
// Rows
// =============================================================================

/// Insert a full row above or below the selected cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertRow {
    pub position: InsertPosition,
}

impl InsertRow {
    pub fn above() -> Self {
        Self {
            position: InsertPosition::Before,
        }
    }

    pub fn below() -> Self {
        Self {
            position: InsertPosition::After,
        }
    }
}

impl Command for InsertRow {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let TableTarget { map, cell_id } = resolve_table_target(tree, selection)?;
        let rect = footprint(&map, cell_id)?;
        let boundary = match self.position {
            InsertPosition::Before => rect.start_row,
            InsertPosition::After => rect.end_row + 1,
        };
        // Header flags are copied from the selected side of the new line
        let reference_row = match self.position {
            InsertPosition::Before => boundary,
            InsertPosition::After => boundary - 1,
        };

        let mut new_tree = tree.clone();
        let row_id = new_tree.insert_node(DocNode::table_row(), map.table_id(), Some(boundary))?;

        let mut extended = HashSet::new();
        for col in 0..map.column_count() {
            if boundary > 0 {
                if let Some(above) = map.cell_at(boundary - 1, col) {
                    let above_rect = footprint(&map, above)?;
                    if above_rect.crosses_row_boundary(boundary) {
                        if extended.insert(above) {
                            set_spans(&mut new_tree, above, above_rect.row_count() + 1, above_rect.col_count())?;
                        }
                        continue;
                    }
                }
            }
            let header = HeaderState {
                row: false,
                column: header_of(tree, map.cell_at(reference_row, col)).column,
            };
            new_tree.insert_empty_cell(row_id, None, header)?;
        }

        Ok(CommandResult {
            tree: new_tree,
            selection: *selection,
        })
    }

    fn display_name(&self) -> &str {
        match self.position {
            InsertPosition::Before => "Insert Row Above",
            InsertPosition::After => "Insert Row Below",
        }
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

/// Delete the row(s) covered by the selected cell
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteRow;

impl DeleteRow {
    pub fn new() -> Self {
        Self
    }
}

impl Command for DeleteRow {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let TableTarget { map, cell_id } = resolve_table_target(tree, selection)?;
        let rect = footprint(&map, cell_id)?;
        let (first, last) = (rect.start_row, rect.end_row);
        let mut new_tree = tree.clone();

        if rect.row_count() >= map.row_count() {
            let selection = remove_table(&mut new_tree, map.table_id())?;
            return Ok(CommandResult {
                tree: new_tree,
                selection,
            });
        }

        let mut relocated: Vec<(NodeId, GridRect)> = Vec::new();
        for cell in map.cells() {
            let cell_rect = footprint(&map, cell)?;
            if cell_rect.end_row < first || cell_rect.start_row > last {
                continue;
            }
            let overlap = cell_rect.end_row.min(last) + 1 - cell_rect.start_row.max(first);
            if cell_rect.start_row < first {
                set_spans(&mut new_tree, cell, cell_rect.row_count() - overlap, cell_rect.col_count())?;
            } else if cell_rect.end_row > last {
                set_spans(&mut new_tree, cell, cell_rect.end_row - last, cell_rect.col_count())?;
                relocated.push((cell, cell_rect));
            }
        }

        // Cells hanging below the deleted rows move into the first surviving row
        if !relocated.is_empty() {
            let next_row = last + 1;
            let next_row_id = map
                .row_id(next_row)
                .ok_or_else(|| EditError::InvalidCommand(format!("row {} is missing", next_row)))?;
            relocated.sort_by_key(|(_, cell_rect)| cell_rect.start_col);
            let existing = map.cells_originating_in_row(next_row);
            for (moved, (cell, cell_rect)) in relocated.iter().enumerate() {
                let before = existing
                    .iter()
                    .filter(|&&other| map.rect_of(other).is_some_and(|r| r.start_col < cell_rect.start_col))
                    .count();
                new_tree.move_node(*cell, next_row_id, Some(before + moved))?;
            }
        }

        for row in first..=last {
            if let Some(row_id) = map.row_id(row) {
                remove_block(&mut new_tree, row_id)?;
            }
        }

        let selection = caret_near_removed(&new_tree, map.table_id(), first);
        Ok(CommandResult {
            tree: new_tree,
            selection,
        })
    }

    fn display_name(&self) -> &str {
        "Delete Row"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

// =============================================================================
// Columns
// =============================================================================

/// Insert a full column left or right of the selected cell.
/// Refused once the table has [`MAX_TABLE_COLUMNS`] columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertColumn {
    pub position: InsertPosition,
}

impl InsertColumn {
    pub fn left() -> Self {
        Self {
            position: InsertPosition::Before,
        }
    }

    pub fn right() -> Self {
        Self {
            position: InsertPosition::After,
        }
    }
}

impl Command for InsertColumn {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let TableTarget { map, cell_id } = resolve_table_target(tree, selection)?;
        if map.column_count() >= MAX_TABLE_COLUMNS {
            return Err(EditError::InvalidCommand(format!(
                "table already has {} columns",
                map.column_count()
            )));
        }
        let rect = footprint(&map, cell_id)?;
        let boundary = match self.position {
            InsertPosition::Before => rect.start_col,
            InsertPosition::After => rect.end_col + 1,
        };
        let reference_col = match self.position {
            InsertPosition::Before => boundary,
            InsertPosition::After => boundary - 1,
        };

        let mut new_tree = tree.clone();
        let mut extended = HashSet::new();
        for row in 0..map.row_count() {
            if boundary > 0 {
                if let Some(left) = map.cell_at(row, boundary - 1) {
                    let left_rect = footprint(&map, left)?;
                    if left_rect.crosses_col_boundary(boundary) {
                        if extended.insert(left) {
                            set_spans(&mut new_tree, left, left_rect.row_count(), left_rect.col_count() + 1)?;
                        }
                        continue;
                    }
                }
            }

            let row_id = map
                .row_id(row)
                .ok_or_else(|| EditError::InvalidCommand(format!("row {} is missing", row)))?;
            let index = map
                .cells_originating_in_row(row)
                .iter()
                .filter(|&&other| map.rect_of(other).is_some_and(|r| r.start_col < boundary))
                .count();
            let header = HeaderState {
                row: header_of(tree, map.cell_at(row, reference_col)).row,
                column: false,
            };
            new_tree.insert_empty_cell(row_id, Some(index), header)?;
        }

        if let Some(table) = new_tree.get_table_mut(map.table_id()) {
            table.insert_column_width(boundary);
        }

        Ok(CommandResult {
            tree: new_tree,
            selection: *selection,
        })
    }

    fn display_name(&self) -> &str {
        match self.position {
            InsertPosition::Before => "Insert Column Left",
            InsertPosition::After => "Insert Column Right",
        }
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

/// Delete the column(s) covered by the selected cell
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteColumn;

impl DeleteColumn {
    pub fn new() -> Self {
        Self
    }
}

impl Command for DeleteColumn {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let TableTarget { map, cell_id } = resolve_table_target(tree, selection)?;
        let rect = footprint(&map, cell_id)?;
        let (first, last) = (rect.start_col, rect.end_col);
        let mut new_tree = tree.clone();

        if rect.col_count() >= map.column_count() {
            let selection = remove_table(&mut new_tree, map.table_id())?;
            return Ok(CommandResult {
                tree: new_tree,
                selection,
            });
        }

        for cell in map.cells() {
            let cell_rect = footprint(&map, cell)?;
            if cell_rect.end_col < first || cell_rect.start_col > last {
                continue;
            }
            let overlap = cell_rect.end_col.min(last) + 1 - cell_rect.start_col.max(first);
            if overlap < cell_rect.col_count() {
                set_spans(&mut new_tree, cell, cell_rect.row_count(), cell_rect.col_count() - overlap)?;
            } else {
                remove_block(&mut new_tree, cell)?;
            }
        }

        if let Some(table) = new_tree.get_table_mut(map.table_id()) {
            table.remove_column_widths(first, rect.col_count());
        }

        let row_id = map.row_id(rect.start_row).unwrap_or(map.table_id());
        let selection = caret_inside(&new_tree, row_id);
        Ok(CommandResult {
            tree: new_tree,
            selection,
        })
    }

    fn display_name(&self) -> &str {
        "Delete Column"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

// =============================================================================
// Whole table
// =============================================================================

/// Insert a new table after the block holding the selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertTable {
    pub rows: usize,
    pub columns: usize,
    /// Mark the first row as a header row
    pub header_row: bool,
    pub table: Table,
}

impl InsertTable {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            header_row: false,
            table: Table::new(),
        }
    }

    pub fn with_header_row(mut self) -> Self {
        self.header_row = true;
        self
    }
}

impl Command for InsertTable {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        if self.rows == 0 || self.columns == 0 {
            return Err(EditError::InvalidCommand("a table needs at least one row and column".into()));
        }
        let columns = self.columns.min(MAX_TABLE_COLUMNS);

        // Climb to the block whose container accepts tables
        let mut block = selection.focus_node();
        let (parent_id, index) = loop {
            match tree.parent(block) {
                Some(parent)
                    if tree
                        .node_type(parent)
                        .is_some_and(|kind| kind.accepts_child(NodeType::Table)) =>
                {
                    break (parent, tree.index_in_parent(block).map(|i| i + 1));
                }
                Some(parent) => block = parent,
                None if block == tree.root_id() => break (block, None),
                None => {
                    return Err(EditError::SelectionUnresolved(format!(
                        "node {} is not in the document",
                        block
                    )))
                }
            }
        };

        let mut new_tree = tree.clone();
        let table_id = new_tree.insert_table(self.table.clone(), parent_id, index, self.rows, columns)?;
        if self.header_row {
            if let Some(&first_row) = new_tree.children(table_id).first() {
                for cell in new_tree.children(first_row).to_vec() {
                    if let Some(cell) = new_tree.get_table_cell_mut(cell) {
                        cell.header.row = true;
                    }
                }
            }
        }

        let selection = caret_inside(&new_tree, table_id);
        Ok(CommandResult {
            tree: new_tree,
            selection,
        })
    }

    fn display_name(&self) -> &str {
        "Insert Table"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

/// Delete the table holding the selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteTable;

impl DeleteTable {
    pub fn new() -> Self {
        Self
    }
}

impl Command for DeleteTable {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let TableTarget { map, .. } = resolve_table_target(tree, selection)?;
        let mut new_tree = tree.clone();
        let selection = remove_table(&mut new_tree, map.table_id())?;
        Ok(CommandResult {
            tree: new_tree,
            selection,
        })
    }

    fn display_name(&self) -> &str {
        "Delete Table"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

/// Set the table's horizontal alignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignTable {
    pub alignment: TableAlignment,
}

impl AlignTable {
    pub fn new(alignment: TableAlignment) -> Self {
        Self { alignment }
    }
}

impl Command for AlignTable {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let TableTarget { map, .. } = resolve_table_target(tree, selection)?;
        let mut new_tree = tree.clone();
        if let Some(table) = new_tree.get_table_mut(map.table_id()) {
            table.alignment = self.alignment;
        }
        Ok(CommandResult {
            tree: new_tree,
            selection: *selection,
        })
    }

    fn display_name(&self) -> &str {
        "Align Table"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

// =============================================================================
// Header state
// =============================================================================

/// Which header flag a toggle flips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderLine {
    Row,
    Column,
}

/// Flip the header flag of the selected cell's row or column. Every cell in
/// that line ends up with the selected cell's new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleHeader {
    pub line: HeaderLine,
}

impl ToggleHeader {
    pub fn row() -> Self {
        Self { line: HeaderLine::Row }
    }

    pub fn column() -> Self {
        Self {
            line: HeaderLine::Column,
        }
    }
}

impl Command for ToggleHeader {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let TableTarget { map, cell_id } = resolve_table_target(tree, selection)?;
        let rect = footprint(&map, cell_id)?;
        let current = header_of(tree, Some(cell_id));

        let (line_rect, value) = match self.line {
            HeaderLine::Row => (
                GridRect::new(rect.start_row, 0, rect.start_row, map.column_count().saturating_sub(1)),
                !current.row,
            ),
            HeaderLine::Column => (
                GridRect::new(0, rect.start_col, map.row_count().saturating_sub(1), rect.start_col),
                !current.column,
            ),
        };

        let mut new_tree = tree.clone();
        for cell_id in map.cells_in_rect(line_rect) {
            let cell_rect = footprint(&map, cell_id)?;
            let Some(cell) = new_tree.get_table_cell_mut(cell_id) else {
                continue;
            };
            match self.line {
                HeaderLine::Row => cell.header.row = value,
                HeaderLine::Column => cell.header.column = value,
            }
            // Keep a merged cell's recorded flags in step for the toggled line
            if cell.recorded_headers().is_some() {
                for (index, header) in cell.covered_headers.iter_mut().enumerate() {
                    let row = cell_rect.start_row + index / cell_rect.col_count();
                    let col = cell_rect.start_col + index % cell_rect.col_count();
                    if line_rect.contains(row, col) {
                        match self.line {
                            HeaderLine::Row => header.row = value,
                            HeaderLine::Column => header.column = value,
                        }
                    }
                }
            }
        }

        Ok(CommandResult {
            tree: new_tree,
            selection: *selection,
        })
    }

    fn display_name(&self) -> &str {
        match self.line {
            HeaderLine::Row => "Toggle Header Row",
            HeaderLine::Column => "Toggle Header Column",
        }
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::TableMap;

    /// A 2x2 table holding "A" "B" / "C" "D". Returns the tree, the table
    /// and the cells in reading order.
    fn create_test_table() -> (DocumentTree, NodeId, Vec<NodeId>) {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        tree.append_paragraph(root, "Dear Officer,").unwrap();
        let table_id = tree.insert_table(Table::new(), root, None, 2, 2).unwrap();
        let cells = TableMap::build(&tree, table_id).unwrap().cells();
        for (cell, text) in cells.iter().zip(["A", "B", "C", "D"]) {
            let para = tree.children(*cell)[0];
            tree.insert_node(DocNode::text(text), para, None).unwrap();
        }
        (tree, table_id, cells)
    }

    fn cell_text(tree: &DocumentTree, cell: NodeId) -> Vec<String> {
        tree.children(cell)
            .iter()
            .map(|&para| tree.paragraph_text(para))
            .collect()
    }

    fn map_of(tree: &DocumentTree, table_id: NodeId) -> TableMap {
        TableMap::build(tree, table_id).unwrap()
    }

    #[test]
    fn test_merge_same_column() {
        let (tree, table_id, cells) = create_test_table();
        let selection = EditorSelection::cells(cells[1], cells[3]);

        let result = MergeCells::new().apply(&tree, &selection).unwrap();
        let new_tree = result.tree;
        let map = map_of(&new_tree, table_id);

        assert_eq!(map.cell_count(), 3);
        assert_eq!(map.cell_at(0, 1), Some(cells[1]));
        assert_eq!(map.cell_at(1, 1), Some(cells[1]));
        assert_eq!(cell_text(&new_tree, cells[1]), vec!["B", "D"]);
        assert_eq!(cell_text(&new_tree, cells[0]), vec!["A"]);
        assert_eq!(cell_text(&new_tree, cells[2]), vec!["C"]);
        let merged = new_tree.get_table_cell(cells[1]).unwrap();
        assert_eq!((merged.row_span, merged.col_span), (2, 1));
        assert!(map.is_fully_tiled());
        assert!(new_tree.validate().is_ok());
    }

    #[test]
    fn test_merge_skips_empty_cells() {
        let (mut tree, table_id, cells) = create_test_table();
        // Empty out A; its blank paragraph must not survive the merge
        let para_a = tree.children(cells[0])[0];
        let run_a = tree.children(para_a)[0];
        tree.remove_node(run_a).unwrap();

        let selection = EditorSelection::cells(cells[0], cells[1]);
        let result = MergeCells::new().apply(&tree, &selection).unwrap();
        assert_eq!(cell_text(&result.tree, cells[0]), vec!["B"]);
        assert_eq!(map_of(&result.tree, table_id).cell_count(), 3);
    }

    #[test]
    fn test_merge_of_empty_cells_keeps_a_paragraph() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let table_id = tree.insert_table(Table::new(), root, None, 1, 3).unwrap();
        let cells = map_of(&tree, table_id).cells();

        let result = MergeCells::new()
            .apply(&tree, &EditorSelection::cells(cells[0], cells[2]))
            .unwrap();
        assert_eq!(result.tree.children(cells[0]).len(), 1);
        assert!(result.tree.is_empty_cell(cells[0]));
        assert_eq!(result.tree.get_table_cell(cells[0]).map(|c| c.col_span), Some(3));
    }

    #[test]
    fn test_merge_expands_to_existing_span() {
        // 3x3 where the middle column of rows 0-1 is already merged
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let table_id = tree.insert_table(Table::new(), root, None, 3, 3).unwrap();
        let cells = map_of(&tree, table_id).cells();
        let tree = MergeCells::new()
            .apply(&tree, &EditorSelection::cells(cells[1], cells[4]))
            .unwrap()
            .tree;

        // Selecting row 1, columns 0-1 must pull in the whole merged cell
        let map = map_of(&tree, table_id);
        let left = map.cell_at(1, 0).unwrap();
        let middle = map.cell_at(1, 1).unwrap();
        let result = MergeCells::new()
            .apply(&tree, &EditorSelection::cells(left, middle))
            .unwrap();
        let map = map_of(&result.tree, table_id);
        let target = map.cell_at(0, 0).unwrap();
        assert_eq!(map.rect_of(target), Some(GridRect::new(0, 0, 1, 1)));
        assert!(map.is_fully_tiled());
    }

    #[test]
    fn test_merge_single_cell_is_rejected() {
        let (tree, _, cells) = create_test_table();
        let para = tree.children(cells[0])[0];
        let err = MergeCells::new()
            .apply(&tree, &EditorSelection::caret(para, 0))
            .unwrap_err();
        assert!(matches!(err, EditError::SelectionUnresolved(_)));
    }

    #[test]
    fn test_text_range_across_cells_merges() {
        let (tree, table_id, cells) = create_test_table();
        let run_a = tree.children(tree.children(cells[0])[0])[0];
        let run_b = tree.children(tree.children(cells[1])[0])[0];
        let selection = EditorSelection::range(
            doc_model::Position::new(run_a, 0),
            doc_model::Position::new(run_b, 1),
        );
        let result = MergeCells::new().apply(&tree, &selection).unwrap();
        assert_eq!(map_of(&result.tree, table_id).cell_count(), 3);
        assert_eq!(cell_text(&result.tree, cells[0]), vec!["A", "B"]);
    }

    #[test]
    fn test_unmerge_restores_cells() {
        let (tree, table_id, cells) = create_test_table();
        let merged = MergeCells::new()
            .apply(&tree, &EditorSelection::cells(cells[0], cells[3]))
            .unwrap();
        assert_eq!(map_of(&merged.tree, table_id).cell_count(), 1);

        let result = UnmergeCell::new().apply(&merged.tree, &merged.selection).unwrap();
        let map = map_of(&result.tree, table_id);
        assert_eq!(map.cell_count(), 4);
        assert!(map.is_fully_tiled());
        assert_eq!(map.cell_at(0, 0), Some(cells[0]));
        assert_eq!(cell_text(&result.tree, cells[0]), vec!["A", "B", "C", "D"]);
        assert!(result.tree.is_empty_cell(map.cell_at(1, 1).unwrap()));
    }

    #[test]
    fn test_unmerge_inherits_header_state() {
        let (tree, table_id, cells) = create_test_table();
        let para_a = tree.children(cells[0])[0];
        let tree = ToggleHeader::row()
            .apply(&tree, &EditorSelection::caret(para_a, 0))
            .unwrap()
            .tree;
        let merged = MergeCells::new()
            .apply(&tree, &EditorSelection::cells(cells[1], cells[3]))
            .unwrap();
        let result = UnmergeCell::new().apply(&merged.tree, &merged.selection).unwrap();

        let map = map_of(&result.tree, table_id);
        let restored = map.cell_at(1, 1).unwrap();
        assert!(result.tree.get_table_cell(cells[1]).unwrap().header.row);
        assert!(!result.tree.get_table_cell(restored).unwrap().header.row);
    }

    #[test]
    fn test_unmerge_whole_table_restores_headers() {
        let (tree, table_id, cells) = create_test_table();
        let para_a = tree.children(cells[0])[0];
        let tree = ToggleHeader::row()
            .apply(&tree, &EditorSelection::caret(para_a, 0))
            .unwrap()
            .tree;
        let merged = MergeCells::new()
            .apply(&tree, &EditorSelection::cells(cells[0], cells[3]))
            .unwrap();
        let result = UnmergeCell::new().apply(&merged.tree, &merged.selection).unwrap();

        let map = map_of(&result.tree, table_id);
        let rows: Vec<bool> = [(0, 0), (0, 1), (1, 0), (1, 1)]
            .iter()
            .map(|&(row, col)| result.tree.get_table_cell(map.cell_at(row, col).unwrap()).unwrap().header.row)
            .collect();
        assert_eq!(rows, vec![true, true, false, false]);
        assert!(result.tree.get_table_cell(cells[0]).unwrap().covered_headers.is_empty());
    }

    #[test]
    fn test_toggle_on_merged_cell_updates_recorded_headers() {
        let (tree, table_id, cells) = create_test_table();
        let merged = MergeCells::new()
            .apply(&tree, &EditorSelection::cells(cells[1], cells[3]))
            .unwrap();
        let toggled = ToggleHeader::column().apply(&merged.tree, &merged.selection).unwrap();
        let result = UnmergeCell::new().apply(&toggled.tree, &toggled.selection).unwrap();

        let map = map_of(&result.tree, table_id);
        for row in 0..2 {
            let cell = map.cell_at(row, 1).unwrap();
            assert!(result.tree.get_table_cell(cell).unwrap().header.column);
            let cell = map.cell_at(row, 0).unwrap();
            assert!(!result.tree.get_table_cell(cell).unwrap().header.column);
        }
    }

    #[test]
    fn test_unmerge_plain_cell_is_rejected() {
        let (tree, _, cells) = create_test_table();
        let para = tree.children(cells[0])[0];
        assert!(UnmergeCell::new().apply(&tree, &EditorSelection::caret(para, 0)).is_err());
    }

    #[test]
    fn test_insert_row_below() {
        let (tree, table_id, cells) = create_test_table();
        let para = tree.children(cells[0])[0];
        let result = InsertRow::below().apply(&tree, &EditorSelection::caret(para, 0)).unwrap();

        let map = map_of(&result.tree, table_id);
        assert_eq!(map.row_count(), 3);
        assert_eq!(map.cell_at(0, 0), Some(cells[0]));
        assert_eq!(map.cell_at(2, 0), Some(cells[2]));
        assert!(result.tree.is_empty_cell(map.cell_at(1, 0).unwrap()));
        assert!(map.is_fully_tiled());
    }

    #[test]
    fn test_insert_row_through_vertical_span() {
        let (tree, table_id, cells) = create_test_table();
        let merged = MergeCells::new()
            .apply(&tree, &EditorSelection::cells(cells[1], cells[3]))
            .unwrap()
            .tree;
        let para = merged.children(cells[0])[0];
        let result = InsertRow::below()
            .apply(&merged, &EditorSelection::caret(para, 0))
            .unwrap();

        let map = map_of(&result.tree, table_id);
        assert_eq!(map.row_count(), 3);
        assert_eq!(map.rect_of(cells[1]), Some(GridRect::new(0, 1, 2, 1)));
        assert!(map.is_fully_tiled());
    }

    #[test]
    fn test_insert_column_left() {
        let (tree, table_id, cells) = create_test_table();
        let para = tree.children(cells[1])[0];
        let result = InsertColumn::left()
            .apply(&tree, &EditorSelection::caret(para, 0))
            .unwrap();

        let map = map_of(&result.tree, table_id);
        assert_eq!(map.column_count(), 3);
        assert_eq!(map.cell_at(0, 0), Some(cells[0]));
        assert_eq!(map.cell_at(0, 2), Some(cells[1]));
        assert_eq!(map.cell_at(1, 2), Some(cells[3]));
        assert!(map.is_fully_tiled());
    }

    #[test]
    fn test_insert_column_tracks_widths() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let table = Table::new().with_column_widths(vec![120.0, 80.0]);
        let table_id = tree.insert_table(table, root, None, 1, 2).unwrap();
        let para = tree.nodes_of_type(NodeType::Paragraph)[1];

        let result = InsertColumn::right()
            .apply(&tree, &EditorSelection::caret(para, 0))
            .unwrap();
        assert_eq!(
            result.tree.get_table(table_id).map(|t| t.column_widths.clone()),
            Some(vec![120.0, 80.0, 80.0])
        );
    }

    #[test]
    fn test_insert_column_refused_at_ceiling() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        tree.insert_table(Table::new(), root, None, 2, MAX_TABLE_COLUMNS).unwrap();
        let para = tree.nodes_of_type(NodeType::Paragraph)[0];
        let selection = EditorSelection::caret(para, 0);

        assert!(!can_insert_column(&tree, &selection));
        assert!(InsertColumn::right().apply(&tree, &selection).is_err());
        assert_eq!(column_count_at(&tree, &selection), Some(MAX_TABLE_COLUMNS));
    }

    #[test]
    fn test_delete_row_shrinks_span() {
        let (tree, table_id, cells) = create_test_table();
        let merged = MergeCells::new()
            .apply(&tree, &EditorSelection::cells(cells[1], cells[3]))
            .unwrap()
            .tree;
        let para_c = merged.children(cells[2])[0];
        let result = DeleteRow::new()
            .apply(&merged, &EditorSelection::caret(para_c, 0))
            .unwrap();

        let map = map_of(&result.tree, table_id);
        assert_eq!(map.row_count(), 1);
        assert_eq!(map.rect_of(cells[1]), Some(GridRect::new(0, 1, 0, 1)));
        assert!(map.is_fully_tiled());
    }

    #[test]
    fn test_delete_row_relocates_hanging_cell() {
        // 3 rows; column 1 merged over rows 0-1. Deleting row 0 moves the
        // merged cell into row 1.
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let table_id = tree.insert_table(Table::new(), root, None, 3, 2).unwrap();
        let cells = map_of(&tree, table_id).cells();
        let tree = MergeCells::new()
            .apply(&tree, &EditorSelection::cells(cells[1], cells[3]))
            .unwrap()
            .tree;
        let para = tree.children(cells[0])[0];
        let result = DeleteRow::new()
            .apply(&tree, &EditorSelection::caret(para, 0))
            .unwrap();

        let map = map_of(&result.tree, table_id);
        assert_eq!(map.row_count(), 2);
        assert_eq!(map.rect_of(cells[1]), Some(GridRect::new(0, 1, 0, 1)));
        assert_eq!(map.cell_at(0, 0), Some(cells[2]));
        assert!(map.is_fully_tiled());
    }

    #[test]
    fn test_delete_rows_until_table_removed() {
        let (mut tree, table_id, cells) = create_test_table();
        let para = tree.children(cells[0])[0];
        let mut selection = EditorSelection::caret(para, 0);

        for _ in 0..2 {
            let result = DeleteRow::new().apply(&tree, &selection).unwrap();
            tree = result.tree;
            selection = result.selection;
        }
        assert!(!tree.contains(table_id));
        assert_eq!(tree.text_content(), "Dear Officer,");
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_delete_columns_until_table_removed() {
        let (mut tree, table_id, cells) = create_test_table();
        let para = tree.children(cells[1])[0];
        let mut selection = EditorSelection::caret(para, 0);

        let result = DeleteColumn::new().apply(&tree, &selection).unwrap();
        tree = result.tree;
        selection = result.selection;
        assert_eq!(map_of(&tree, table_id).column_count(), 1);

        let result = DeleteColumn::new().apply(&tree, &selection).unwrap();
        assert!(!result.tree.contains(table_id));
    }

    #[test]
    fn test_delete_column_shrinks_span() {
        let (tree, table_id, cells) = create_test_table();
        let merged = MergeCells::new()
            .apply(&tree, &EditorSelection::cells(cells[0], cells[1]))
            .unwrap()
            .tree;
        let para_d = merged.children(cells[3])[0];
        let result = DeleteColumn::new()
            .apply(&merged, &EditorSelection::caret(para_d, 0))
            .unwrap();

        let map = map_of(&result.tree, table_id);
        assert_eq!(map.column_count(), 1);
        assert_eq!(result.tree.get_table_cell(cells[0]).map(|c| c.col_span), Some(1));
        assert!(map.is_fully_tiled());
    }

    /// Turn the text of `cell` into the next endnote
    fn annotate_cell(tree: &DocumentTree, cell: NodeId) -> DocumentTree {
        let para = tree.children(cell)[0];
        let run = tree.children(para)[0];
        crate::CreateAnnotation::new()
            .apply(tree, &EditorSelection::caret(run, 0))
            .unwrap()
            .tree
    }

    #[test]
    fn test_deleting_lines_drops_their_endnotes() {
        let (tree, _, cells) = create_test_table();
        let tree = annotate_cell(&tree, cells[1]);
        let tree = annotate_cell(&tree, cells[2]);
        assert_eq!(tree.annotations().len(), 2);

        // Column 1 holds endnote 1 ("B")
        let para_b = tree.children(cells[1])[0];
        let after_column = DeleteColumn::new()
            .apply(&tree, &EditorSelection::caret(para_b, 0))
            .unwrap()
            .tree;
        assert!(!after_column.annotations().contains(1));
        assert!(after_column.annotations().contains(2));
        assert!(after_column.find_annotation_marker(2).is_some());

        // Row 1 holds endnote 2 ("C")
        let para_c = tree.children(cells[2])[0];
        let after_row = DeleteRow::new()
            .apply(&tree, &EditorSelection::caret(para_c, 0))
            .unwrap()
            .tree;
        assert_eq!(after_row.annotations().all_entries(), vec![doc_model::EndnoteEntry::new(1, "B", "")]);
    }

    #[test]
    fn test_deleting_table_drops_its_endnotes() {
        let (tree, _, cells) = create_test_table();
        let tree = annotate_cell(&tree, cells[3]);
        let para_a = tree.children(cells[0])[0];

        let result = DeleteTable::new()
            .apply(&tree, &EditorSelection::caret(para_a, 0))
            .unwrap();
        assert!(result.tree.annotations().is_empty());
        assert!(result.tree.nodes_of_type(NodeType::AnnotationMarker).is_empty());
        // Ids are still never reused
        assert_eq!(result.tree.annotations().next_id(), 2);
    }

    #[test]
    fn test_delete_table() {
        let (tree, table_id, cells) = create_test_table();
        let para = tree.children(cells[3])[0];
        let result = DeleteTable::new()
            .apply(&tree, &EditorSelection::caret(para, 0))
            .unwrap();
        assert!(!result.tree.contains(table_id));
        assert!(result.selection.resolves_in(&result.tree));
    }

    #[test]
    fn test_delete_only_table_leaves_paragraph() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        tree.insert_table(Table::new(), root, None, 1, 1).unwrap();
        let para = tree.nodes_of_type(NodeType::Paragraph)[0];
        let result = DeleteTable::new()
            .apply(&tree, &EditorSelection::caret(para, 0))
            .unwrap();
        assert_eq!(result.tree.nodes_of_type(NodeType::Paragraph).len(), 1);
    }

    #[test]
    fn test_commands_outside_table_fail() {
        let tree = DocumentTree::with_empty_paragraph();
        let para = tree.children(tree.root_id())[0];
        let selection = EditorSelection::caret(para, 0);
        assert!(DeleteRow::new().apply(&tree, &selection).is_err());
        assert!(DeleteColumn::new().apply(&tree, &selection).is_err());
        assert!(DeleteTable::new().apply(&tree, &selection).is_err());
        assert!(InsertRow::above().apply(&tree, &selection).is_err());
        assert!(AlignTable::new(TableAlignment::Center).apply(&tree, &selection).is_err());
    }

    #[test]
    fn test_toggle_row_header_equalises_line() {
        let (mut tree, table_id, cells) = create_test_table();
        // Start from a mixed row
        tree.get_table_cell_mut(cells[1]).unwrap().header.row = true;
        let para = tree.children(cells[0])[0];
        let selection = EditorSelection::caret(para, 0);

        let result = ToggleHeader::row().apply(&tree, &selection).unwrap();
        let map = map_of(&result.tree, table_id);
        for col in 0..2 {
            let cell = map.cell_at(0, col).unwrap();
            assert!(result.tree.get_table_cell(cell).unwrap().header.row);
        }
        assert!(!result.tree.get_table_cell(cells[2]).unwrap().header.row);

        let toggled_back = ToggleHeader::row().apply(&result.tree, &selection).unwrap();
        assert!(!toggled_back.tree.get_table_cell(cells[1]).unwrap().header.row);
    }

    #[test]
    fn test_toggle_column_header() {
        let (tree, _, cells) = create_test_table();
        let para = tree.children(cells[2])[0];
        let result = ToggleHeader::column()
            .apply(&tree, &EditorSelection::caret(para, 0))
            .unwrap();
        assert!(result.tree.get_table_cell(cells[0]).unwrap().header.column);
        assert!(result.tree.get_table_cell(cells[2]).unwrap().header.column);
        assert!(!result.tree.get_table_cell(cells[1]).unwrap().header.column);
    }

    #[test]
    fn test_new_row_inherits_column_header() {
        let (tree, table_id, cells) = create_test_table();
        let para = tree.children(cells[0])[0];
        let selection = EditorSelection::caret(para, 0);
        let tree = ToggleHeader::column().apply(&tree, &selection).unwrap().tree;
        let tree = ToggleHeader::row().apply(&tree, &selection).unwrap().tree;

        let result = InsertRow::below().apply(&tree, &selection).unwrap();
        let map = map_of(&result.tree, table_id);
        let new_first = result.tree.get_table_cell(map.cell_at(1, 0).unwrap()).unwrap();
        let new_second = result.tree.get_table_cell(map.cell_at(1, 1).unwrap()).unwrap();
        assert_eq!(new_first.header, HeaderState { row: false, column: true });
        assert_eq!(new_second.header, HeaderState::NONE);
    }

    #[test]
    fn test_align_table_is_idempotent() {
        let (tree, table_id, cells) = create_test_table();
        let para = tree.children(cells[0])[0];
        let selection = EditorSelection::caret(para, 0);

        let once = AlignTable::new(TableAlignment::Center).apply(&tree, &selection).unwrap();
        let twice = AlignTable::new(TableAlignment::Center)
            .apply(&once.tree, &selection)
            .unwrap();
        assert_eq!(twice.tree.get_table(table_id).unwrap().alignment, TableAlignment::Center);
        assert_eq!(once.tree, twice.tree);
    }

    #[test]
    fn test_insert_table_after_paragraph() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let first = tree.append_paragraph(root, "Intro").unwrap();
        tree.append_paragraph(root, "Outro").unwrap();
        let run = tree.children(first)[0];

        let result = InsertTable::new(2, 12)
            .with_header_row()
            .apply(&tree, &EditorSelection::caret(run, 2))
            .unwrap();
        let table_id = result.tree.children(root)[1];
        let map = map_of(&result.tree, table_id);
        assert_eq!((map.row_count(), map.column_count()), (2, MAX_TABLE_COLUMNS));
        assert!(result.tree.get_table_cell(map.cell_at(0, 3).unwrap()).unwrap().header.row);
        assert!(!result.tree.get_table_cell(map.cell_at(1, 3).unwrap()).unwrap().header.row);
        assert!(InsertTable::new(0, 2).apply(&tree, &EditorSelection::caret(run, 0)).is_err());
    }
}
