//! Edit scripts
//!
//! A script is a JSON array of steps. Selection steps move the caret or pick
//! cells; every other step runs one editor command against the current
//! selection, exactly as a toolbar action would.

use anyhow::{anyhow, bail, Result};
use doc_model::{
    DocumentTree, EditorSelection, NodeId, NodeType, Position, TableAlignment, TableMap,
};
use edit_engine::{
    caret_inside, AlignTable, Command, CommandStatus, CreateAnnotation, DeleteColumn, DeleteRow,
    DeleteTable, EditingEngine, InsertColumn, InsertPosition, InsertRow, InsertTable, InsertText,
    MergeCells, RemoveAnnotation, ToggleHeader, UnmergeCell, UpdateAnnotation,
};
use serde::Deserialize;
use store::TableSettings;

/// One script step
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Caret at a char offset of the n-th paragraph (document order, cell
    /// paragraphs included)
    Caret { paragraph: usize, offset: usize },
    /// Text range inside one paragraph
    SelectText { paragraph: usize, start: usize, end: usize },
    /// Caret at the start of the cell covering `(row, column)` of the n-th table
    CaretInCell { table: usize, row: usize, column: usize },
    /// Cell range between two grid positions of the n-th table
    SelectCells {
        table: usize,
        from: (usize, usize),
        to: (usize, usize),
    },
    InsertText { text: String },
    InsertTable {
        rows: Option<usize>,
        columns: Option<usize>,
        header_row: Option<bool>,
    },
    MergeCells,
    UnmergeCell,
    InsertRow { position: InsertPosition },
    InsertColumn { position: InsertPosition },
    DeleteRow,
    DeleteColumn,
    DeleteTable,
    ToggleRowHeader,
    ToggleColumnHeader,
    AlignTable { alignment: TableAlignment },
    CreateAnnotation { value: Option<String> },
    UpdateAnnotation { id: u32, value: String },
    RemoveAnnotation { id: u32 },
    Undo,
    Redo,
}

/// What a step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Selected,
    Applied,
    Skipped,
}

impl From<CommandStatus> for StepOutcome {
    fn from(status: CommandStatus) -> Self {
        match status {
            CommandStatus::Applied => StepOutcome::Applied,
            CommandStatus::Skipped => StepOutcome::Skipped,
        }
    }
}

pub fn parse_script(json: &str) -> Result<Vec<Step>> {
    Ok(serde_json::from_str(json)?)
}

/// Run one step. Selection steps that point nowhere are script errors;
/// commands that cannot run are skipped like in the editor.
pub fn run_step(engine: &mut EditingEngine, step: &Step, tables: &TableSettings) -> Result<StepOutcome> {
    let command: Box<dyn Command> = match step {
        Step::Caret { paragraph, offset } => {
            let position = paragraph_position(engine.tree(), *paragraph, *offset)?;
            engine.set_selection(EditorSelection::caret(position.node_id, position.offset));
            return Ok(StepOutcome::Selected);
        }
        Step::SelectText { paragraph, start, end } => {
            let anchor = paragraph_position(engine.tree(), *paragraph, *start)?;
            let focus = paragraph_position(engine.tree(), *paragraph, *end)?;
            engine.set_selection(EditorSelection::range(anchor, focus));
            return Ok(StepOutcome::Selected);
        }
        Step::CaretInCell { table, row, column } => {
            let cell = cell_at(engine.tree(), *table, *row, *column)?;
            engine.set_selection(caret_inside(engine.tree(), cell));
            return Ok(StepOutcome::Selected);
        }
        Step::SelectCells { table, from, to } => {
            let anchor = cell_at(engine.tree(), *table, from.0, from.1)?;
            let focus = cell_at(engine.tree(), *table, to.0, to.1)?;
            engine.set_selection(EditorSelection::cells(anchor, focus));
            return Ok(StepOutcome::Selected);
        }
        Step::Undo => return Ok(history_step(engine.undo(), "undo")),
        Step::Redo => return Ok(history_step(engine.redo(), "redo")),

        Step::InsertText { text } => Box::new(InsertText::new(text.clone())),
        Step::InsertTable {
            rows,
            columns,
            header_row,
        } => {
            let command = InsertTable::new(
                rows.unwrap_or(tables.default_rows),
                columns.unwrap_or(tables.default_columns),
            );
            if header_row.unwrap_or(tables.header_row) {
                Box::new(command.with_header_row())
            } else {
                Box::new(command)
            }
        }
        Step::MergeCells => Box::new(MergeCells::new()),
        Step::UnmergeCell => Box::new(UnmergeCell::new()),
        Step::InsertRow { position } => Box::new(InsertRow { position: *position }),
        Step::InsertColumn { position } => Box::new(InsertColumn { position: *position }),
        Step::DeleteRow => Box::new(DeleteRow::new()),
        Step::DeleteColumn => Box::new(DeleteColumn::new()),
        Step::DeleteTable => Box::new(DeleteTable::new()),
        Step::ToggleRowHeader => Box::new(ToggleHeader::row()),
        Step::ToggleColumnHeader => Box::new(ToggleHeader::column()),
        Step::AlignTable { alignment } => Box::new(AlignTable::new(*alignment)),
        Step::CreateAnnotation { value } => match value {
            Some(value) => Box::new(CreateAnnotation::with_value(value.clone())),
            None => Box::new(CreateAnnotation::new()),
        },
        Step::UpdateAnnotation { id, value } => Box::new(UpdateAnnotation::new(*id, value.clone())),
        Step::RemoveAnnotation { id } => Box::new(RemoveAnnotation::new(*id)),
    };
    Ok(engine.execute(command).into())
}

fn history_step(result: edit_engine::Result<()>, action: &str) -> StepOutcome {
    match result {
        Ok(()) => StepOutcome::Applied,
        Err(e) => {
            tracing::warn!("Nothing to {}: {}", action, e);
            StepOutcome::Skipped
        }
    }
}

/// Position of a paragraph char offset, inside the inline node holding it
fn paragraph_position(tree: &DocumentTree, paragraph: usize, offset: usize) -> Result<Position> {
    let paragraphs = tree.nodes_of_type(NodeType::Paragraph);
    let paragraph_id = *paragraphs
        .get(paragraph)
        .ok_or_else(|| anyhow!("paragraph {} does not exist ({} in document)", paragraph, paragraphs.len()))?;

    let mut start = 0;
    for &child in tree.children(paragraph_id) {
        let len = tree.node_text(child).map(|text| text.chars().count()).unwrap_or(0);
        if offset <= start + len {
            return Ok(Position::new(child, offset - start));
        }
        start += len;
    }
    if offset == 0 {
        return Ok(Position::new(paragraph_id, 0));
    }
    bail!("offset {} is past the end of paragraph {} ({} chars)", offset, paragraph, start)
}

fn cell_at(tree: &DocumentTree, table: usize, row: usize, column: usize) -> Result<NodeId> {
    let tables = tree.nodes_of_type(NodeType::Table);
    let table_id = *tables
        .get(table)
        .ok_or_else(|| anyhow!("table {} does not exist ({} in document)", table, tables.len()))?;
    let map = TableMap::build(tree, table_id).ok_or_else(|| anyhow!("table {} has no grid", table))?;
    map.cell_at(row, column)
        .ok_or_else(|| anyhow!("table {} has no cell at ({}, {})", table, row, column))
}
