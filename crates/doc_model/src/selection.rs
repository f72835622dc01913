//! Selection model - caret, text ranges and cell ranges

use crate::{DocumentTree, NodeId, NodeType};
use serde::{Deserialize, Serialize};

/// A position in the document tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// The node containing this position
    pub node_id: NodeId,
    /// Char offset for text-bearing nodes, child index for element nodes
    pub offset: usize,
}

impl Position {
    pub fn new(node_id: NodeId, offset: usize) -> Self {
        Self { node_id, offset }
    }

    /// Create a position at the start of a node
    pub fn start_of(node_id: NodeId) -> Self {
        Self { node_id, offset: 0 }
    }
}

/// A text selection. When anchor == focus the selection is a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Where the selection started
    pub anchor: Position,
    /// Where the selection ends (caret position)
    pub focus: Position,
}

impl Selection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    /// Create a collapsed selection (caret only)
    pub fn collapsed(position: Position) -> Self {
        Self {
            anchor: position,
            focus: position,
        }
    }

    pub fn at_start_of(node_id: NodeId) -> Self {
        Self::collapsed(Position::start_of(node_id))
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Selection within one node, ordered `(start, end)` offsets
    pub fn offsets_in_node(&self) -> Option<(NodeId, usize, usize)> {
        (self.anchor.node_id == self.focus.node_id).then(|| {
            let (a, f) = (self.anchor.offset, self.focus.offset);
            (self.anchor.node_id, a.min(f), a.max(f))
        })
    }
}

/// A rectangular selection of table cells, spanning both cells' footprints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSelection {
    pub anchor_cell: NodeId,
    pub focus_cell: NodeId,
}

impl CellSelection {
    pub fn new(anchor_cell: NodeId, focus_cell: NodeId) -> Self {
        Self { anchor_cell, focus_cell }
    }
}

/// Whatever the user currently has selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorSelection {
    Text(Selection),
    Cells(CellSelection),
}

impl EditorSelection {
    pub fn caret(node_id: NodeId, offset: usize) -> Self {
        EditorSelection::Text(Selection::collapsed(Position::new(node_id, offset)))
    }

    pub fn range(anchor: Position, focus: Position) -> Self {
        EditorSelection::Text(Selection::new(anchor, focus))
    }

    pub fn cells(anchor_cell: NodeId, focus_cell: NodeId) -> Self {
        EditorSelection::Cells(CellSelection::new(anchor_cell, focus_cell))
    }

    /// Node ids the selection points at
    pub fn node_ids(&self) -> [NodeId; 2] {
        match self {
            EditorSelection::Text(sel) => [sel.anchor.node_id, sel.focus.node_id],
            EditorSelection::Cells(cells) => [cells.anchor_cell, cells.focus_cell],
        }
    }

    /// The node the caret (or focus cell) sits in
    pub fn focus_node(&self) -> NodeId {
        self.node_ids()[1]
    }

    /// A caret, or a single cell selected on its own
    pub fn is_collapsed(&self) -> bool {
        match self {
            EditorSelection::Text(sel) => sel.is_collapsed(),
            EditorSelection::Cells(cells) => cells.anchor_cell == cells.focus_cell,
        }
    }

    /// Check that every referenced node still exists and that offsets are
    /// in range. A selection that fails this is stale.
    pub fn resolves_in(&self, tree: &DocumentTree) -> bool {
        match self {
            EditorSelection::Text(sel) => {
                position_is_valid(tree, &sel.anchor) && position_is_valid(tree, &sel.focus)
            }
            EditorSelection::Cells(cells) => {
                tree.node_type(cells.anchor_cell) == Some(NodeType::TableCell)
                    && tree.node_type(cells.focus_cell) == Some(NodeType::TableCell)
            }
        }
    }
}

fn position_is_valid(tree: &DocumentTree, position: &Position) -> bool {
    let Some(node) = tree.get(position.node_id) else {
        return false;
    };
    let limit = match node.text_content() {
        Some(text) => crate::text::char_len(text),
        None => node.children().len(),
    };
    position.offset <= limit
}
