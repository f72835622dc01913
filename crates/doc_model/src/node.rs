//! Node kinds and the record stored for every node in the tree

use crate::{NodeId, Table, TableCell};
use serde::{Deserialize, Serialize};

/// The closed set of node kinds a letter document is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Document,
    Paragraph,
    TextRun,
    Table,
    TableRow,
    TableCell,
    AnnotationMarker,
    OverlayMarker,
}

impl NodeType {
    /// Check if nodes of this kind own children
    pub fn can_have_children(self) -> bool {
        matches!(
            self,
            NodeType::Document
                | NodeType::Paragraph
                | NodeType::Table
                | NodeType::TableRow
                | NodeType::TableCell
        )
    }

    /// Nesting rules of the document schema
    pub fn accepts_child(self, child: NodeType) -> bool {
        match self {
            NodeType::Document | NodeType::TableCell => child.is_block(),
            NodeType::Paragraph => child.is_inline(),
            NodeType::Table => child == NodeType::TableRow,
            NodeType::TableRow => child == NodeType::TableCell,
            NodeType::TextRun | NodeType::AnnotationMarker | NodeType::OverlayMarker => false,
        }
    }

    pub fn is_block(self) -> bool {
        matches!(self, NodeType::Paragraph | NodeType::Table)
    }

    pub fn is_inline(self) -> bool {
        matches!(
            self,
            NodeType::TextRun | NodeType::AnnotationMarker | NodeType::OverlayMarker
        )
    }
}

/// Inline character formatting carried by text runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunStyle {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

impl RunStyle {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn bold() -> Self {
        Self { bold: true, ..Self::default() }
    }

    pub fn italic() -> Self {
        Self { italic: true, ..Self::default() }
    }
}

/// A run of text with uniform formatting. A line break is a run holding `"\n"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default)]
    pub style: RunStyle,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), style: RunStyle::default() }
    }

    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Self { text: text.into(), style }
    }
}

/// Build the in-page anchor used to link to an endnote reference
pub fn anchor_ref_for(annotation_id: u32) -> String {
    format!("endnote-ref-{}", annotation_id)
}

/// Inline reference to an endnote.
///
/// The marker and the document's [`AnnotationRegistry`](crate::AnnotationRegistry)
/// both hold the note value; commands write them in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationMarker {
    pub annotation_id: u32,
    /// The visible marked phrase
    pub reference_text: String,
    /// Explanatory note content, empty until the user fills it in
    pub value: String,
    pub anchor_ref: String,
}

impl AnnotationMarker {
    pub fn new(annotation_id: u32, reference_text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            annotation_id,
            reference_text: reference_text.into(),
            value: value.into(),
            anchor_ref: anchor_ref_for(annotation_id),
        }
    }
}

/// Transient wrapper around text flagged by the spell checker. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayMarker {
    pub text: String,
    pub suggestions: Vec<String>,
    /// Formatting of the run the marker was cut from
    #[serde(default)]
    pub style: RunStyle,
}

impl OverlayMarker {
    pub fn new(text: impl Into<String>, suggestions: Vec<String>, style: RunStyle) -> Self {
        Self { text: text.into(), suggestions, style }
    }
}

/// Kind-specific payload of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeData {
    Document,
    Paragraph,
    TextRun(TextRun),
    Table(Table),
    TableRow,
    TableCell(TableCell),
    AnnotationMarker(AnnotationMarker),
    OverlayMarker(OverlayMarker),
}

impl NodeData {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeData::Document => NodeType::Document,
            NodeData::Paragraph => NodeType::Paragraph,
            NodeData::TextRun(_) => NodeType::TextRun,
            NodeData::Table(_) => NodeType::Table,
            NodeData::TableRow => NodeType::TableRow,
            NodeData::TableCell(_) => NodeType::TableCell,
            NodeData::AnnotationMarker(_) => NodeType::AnnotationMarker,
            NodeData::OverlayMarker(_) => NodeType::OverlayMarker,
        }
    }

    /// Visible text of a text-bearing leaf
    pub fn text(&self) -> Option<&str> {
        match self {
            NodeData::TextRun(run) => Some(&run.text),
            NodeData::AnnotationMarker(marker) => Some(&marker.reference_text),
            NodeData::OverlayMarker(overlay) => Some(&overlay.text),
            NodeData::Document
            | NodeData::Paragraph
            | NodeData::Table(_)
            | NodeData::TableRow
            | NodeData::TableCell(_) => None,
        }
    }
}

/// A node record: identity, links and payload.
///
/// Parent and child links are only changed through [`DocumentTree`](crate::DocumentTree)
/// so the two directions never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocNode {
    id: NodeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

impl DocNode {
    pub fn new(data: NodeData) -> Self {
        Self {
            id: NodeId::new(),
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    pub fn paragraph() -> Self {
        Self::new(NodeData::Paragraph)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeData::TextRun(TextRun::new(text)))
    }

    pub fn styled_text(text: impl Into<String>, style: RunStyle) -> Self {
        Self::new(NodeData::TextRun(TextRun::styled(text, style)))
    }

    pub fn table(table: Table) -> Self {
        Self::new(NodeData::Table(table))
    }

    pub fn table_row() -> Self {
        Self::new(NodeData::TableRow)
    }

    pub fn table_cell(cell: TableCell) -> Self {
        Self::new(NodeData::TableCell(cell))
    }

    pub fn annotation_marker(marker: AnnotationMarker) -> Self {
        Self::new(NodeData::AnnotationMarker(marker))
    }

    pub fn overlay_marker(overlay: OverlayMarker) -> Self {
        Self::new(NodeData::OverlayMarker(overlay))
    }

    pub(crate) fn root() -> Self {
        Self::new(NodeData::Document)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn node_type(&self) -> NodeType {
        self.data.node_type()
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut NodeData {
        &mut self.data
    }

    pub fn text_content(&self) -> Option<&str> {
        self.data.text()
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        assert!(NodeType::Document.accepts_child(NodeType::Table));
        assert!(NodeType::TableCell.accepts_child(NodeType::Paragraph));
        assert!(NodeType::Paragraph.accepts_child(NodeType::AnnotationMarker));
        assert!(!NodeType::Paragraph.accepts_child(NodeType::Paragraph));
        assert!(!NodeType::TableRow.accepts_child(NodeType::Paragraph));
        assert!(!NodeType::TextRun.can_have_children());
    }

    #[test]
    fn test_marker_anchor() {
        let marker = AnnotationMarker::new(7, "receipt", "");
        assert_eq!(marker.anchor_ref, "endnote-ref-7");
        assert_eq!(NodeData::AnnotationMarker(marker).text(), Some("receipt"));
    }
}
