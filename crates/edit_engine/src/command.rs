//! Command system for document editing

use crate::{EditError, Result};
use doc_model::text::char_len;
use doc_model::{
    DocumentTree, EditorSelection, NodeId, NodeType, Position, TableMap,
};

/// Result of applying a command
#[derive(Debug)]
pub struct CommandResult {
    /// The new document tree after the command
    pub tree: DocumentTree,
    /// The new selection after the command
    pub selection: EditorSelection,
}

/// Trait for all editing commands.
///
/// Commands hold no node references captured ahead of time. They resolve
/// what they act on from the selection passed to `apply`, which is the
/// editor's selection at execution time.
pub trait Command: std::fmt::Debug + Send + Sync {
    /// Apply this command to a copy of `tree`
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult>;

    /// Get a display name for this command
    fn display_name(&self) -> &str;

    /// Clone this command into a box
    fn clone_box(&self) -> Box<dyn Command>;
}

impl Clone for Box<dyn Command> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// ============================================================================
// Selection resolution
// ============================================================================

/// A table plus the cell holding the selection focus
#[derive(Debug, Clone)]
pub struct TableTarget {
    pub map: TableMap,
    pub cell_id: NodeId,
}

/// Resolve the table and cell around the selection focus
pub fn resolve_table_target(tree: &DocumentTree, selection: &EditorSelection) -> Result<TableTarget> {
    let focus = selection.focus_node();
    let (map, cell_id) = TableMap::for_node(tree, focus).ok_or_else(|| {
        EditError::SelectionUnresolved(format!("node {} is not inside a table", focus))
    })?;
    Ok(TableTarget { map, cell_id })
}

/// Cells spanned by the selection, expanded to whole footprints
#[derive(Debug, Clone)]
pub struct CellRange {
    pub map: TableMap,
    pub cells: Vec<NodeId>,
}

/// Resolve a selection whose anchor and focus lie in cells of one table
pub fn resolve_cell_range(tree: &DocumentTree, selection: &EditorSelection) -> Result<CellRange> {
    let [anchor, focus] = selection.node_ids();
    let (map, focus_cell) = TableMap::for_node(tree, focus).ok_or_else(|| {
        EditError::SelectionUnresolved(format!("node {} is not inside a table", focus))
    })?;
    let anchor_cell = map
        .cells()
        .into_iter()
        .find(|&cell| cell == anchor || tree.is_descendant_of(anchor, cell))
        .ok_or_else(|| {
            EditError::SelectionUnresolved("selection spans more than one table".into())
        })?;

    let rect = map
        .bounding_rect(&[anchor_cell, focus_cell])
        .ok_or_else(|| EditError::SelectionUnresolved("selected cells are not placed".into()))?;
    let cells = map.cells_in_rect(rect);
    Ok(CellRange { map, cells })
}

/// Caret at the start of the first text run (or paragraph) inside `node_id`
pub fn caret_inside(tree: &DocumentTree, node_id: NodeId) -> EditorSelection {
    let mut candidates = vec![node_id];
    candidates.extend(tree.descendants(node_id));
    let target = candidates
        .iter()
        .copied()
        .find(|&id| tree.node_type(id) == Some(NodeType::TextRun))
        .or_else(|| {
            candidates
                .iter()
                .copied()
                .find(|&id| tree.node_type(id) == Some(NodeType::Paragraph))
        })
        .unwrap_or(node_id);
    EditorSelection::caret(target, 0)
}

/// Caret somewhere sensible after the node that held it was removed
pub fn caret_near_removed(tree: &DocumentTree, parent_id: NodeId, index: usize) -> EditorSelection {
    let siblings = tree.children(parent_id);
    let target = siblings
        .get(index)
        .or_else(|| index.checked_sub(1).and_then(|i| siblings.get(i)))
        .copied();
    match target {
        Some(node) => caret_inside(tree, node),
        None => caret_inside(tree, tree.root_id()),
    }
}

/// Remove a block subtree together with the registry entries of the
/// endnote markers inside it
pub fn remove_block(tree: &mut DocumentTree, node_id: NodeId) -> Result<()> {
    let annotation_ids: Vec<u32> = std::iter::once(node_id)
        .chain(tree.descendants(node_id))
        .filter_map(|id| tree.get_annotation_marker(id))
        .map(|marker| marker.annotation_id)
        .collect();
    tree.remove_node(node_id)?;
    for id in annotation_ids {
        tree.annotations_mut().remove(id);
        tracing::debug!("Dropped endnote {} with its block", id);
    }
    Ok(())
}

// ============================================================================
// Paragraph offsets
// ============================================================================

/// A position expressed as (paragraph, char offset within its inline text)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphPoint {
    pub paragraph_id: NodeId,
    pub offset: usize,
}

/// Map a position in a text-bearing node or a paragraph to a paragraph offset
pub fn resolve_paragraph_point(tree: &DocumentTree, position: &Position) -> Option<ParagraphPoint> {
    match tree.node_type(position.node_id)? {
        NodeType::Paragraph => {
            let children = tree.children(position.node_id);
            let index = position.offset.min(children.len());
            let offset = children[..index]
                .iter()
                .map(|&child| tree.node_text(child).map(char_len).unwrap_or(0))
                .sum();
            Some(ParagraphPoint {
                paragraph_id: position.node_id,
                offset,
            })
        }
        NodeType::TextRun | NodeType::AnnotationMarker | NodeType::OverlayMarker => {
            let paragraph_id = tree.parent(position.node_id)?;
            let mut offset = 0;
            for &child in tree.children(paragraph_id) {
                if child == position.node_id {
                    let len = tree.node_text(child).map(char_len).unwrap_or(0);
                    return Some(ParagraphPoint {
                        paragraph_id,
                        offset: offset + position.offset.min(len),
                    });
                }
                offset += tree.node_text(child).map(char_len).unwrap_or(0);
            }
            None
        }
        NodeType::Document | NodeType::Table | NodeType::TableRow | NodeType::TableCell => None,
    }
}

/// Split runs so that `[start, end)` of the paragraph's text is covered by
/// whole inline nodes, and return those nodes in order. Fails if a boundary
/// falls inside a marker.
pub fn isolate_inline_range(
    tree: &mut DocumentTree,
    paragraph_id: NodeId,
    start: usize,
    end: usize,
) -> Result<Vec<NodeId>> {
    split_paragraph_at(tree, paragraph_id, end)?;
    split_paragraph_at(tree, paragraph_id, start)?;

    let mut covered = Vec::new();
    let mut offset = 0;
    for &child in tree.children(paragraph_id) {
        let len = tree.node_text(child).map(char_len).unwrap_or(0);
        if len > 0 && offset >= start && offset + len <= end {
            covered.push(child);
        }
        offset += len;
    }
    Ok(covered)
}

fn split_paragraph_at(tree: &mut DocumentTree, paragraph_id: NodeId, at: usize) -> Result<()> {
    let mut offset = 0;
    for child in tree.children(paragraph_id).to_vec() {
        let len = tree.node_text(child).map(char_len).unwrap_or(0);
        if at > offset && at < offset + len {
            if tree.node_type(child) != Some(NodeType::TextRun) {
                return Err(EditError::InvalidCommand(
                    "range boundary falls inside a marker".into(),
                ));
            }
            tree.split_text_run(child, at - offset)?;
            return Ok(());
        }
        offset += len;
    }
    Ok(())
}

// ============================================================================
// Typing
// ============================================================================

/// Insert plain text at the caret.
///
/// Typing into a spelling overlay first turns it back into a run, since the
/// flagged word is about to change anyway.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InsertText {
    pub text: String,
}

impl InsertText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Command for InsertText {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let EditorSelection::Text(text_selection) = selection else {
            return Err(EditError::SelectionUnresolved("typing needs a caret".into()));
        };
        let position = text_selection.focus;
        let mut new_tree = tree.clone();

        let run_id = match tree.node_type(position.node_id) {
            Some(NodeType::TextRun) => position.node_id,
            Some(NodeType::OverlayMarker) => {
                let (text, style) = tree
                    .get_overlay_marker(position.node_id)
                    .map(|marker| (marker.text.clone(), marker.style))
                    .unwrap_or_default();
                let parent = tree
                    .parent(position.node_id)
                    .ok_or_else(|| EditError::InvalidCommand("overlay marker is detached".into()))?;
                let index = tree.index_in_parent(position.node_id);
                new_tree.remove_node(position.node_id)?;
                new_tree.insert_node(doc_model::DocNode::styled_text(text, style), parent, index)?
            }
            Some(NodeType::Paragraph) => {
                let index = position.offset.min(tree.children(position.node_id).len());
                let run_id = new_tree.insert_node(
                    doc_model::DocNode::text(""),
                    position.node_id,
                    Some(index),
                )?;
                return finish_insert(new_tree, run_id, 0, &self.text);
            }
            _ => {
                return Err(EditError::SelectionUnresolved(format!(
                    "cannot type into node {}",
                    position.node_id
                )))
            }
        };
        finish_insert(new_tree, run_id, position.offset, &self.text)
    }

    fn display_name(&self) -> &str {
        "Typing"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

fn finish_insert(mut tree: DocumentTree, run_id: NodeId, offset: usize, text: &str) -> Result<CommandResult> {
    let run = tree
        .get_text_run_mut(run_id)
        .ok_or_else(|| EditError::InvalidCommand(format!("node {} is not a text run", run_id)))?;
    let offset = offset.min(char_len(&run.text));
    let byte_offset = doc_model::text::byte_index(&run.text, offset);
    run.text.insert_str(byte_offset, text);
    Ok(CommandResult {
        tree,
        selection: EditorSelection::caret(run_id, offset + char_len(text)),
    })
}
