//! Document tree storage and structural operations

use crate::text::{char_len, split_at_char};
use crate::{
    AnnotationMarker, AnnotationRegistry, DocModelError, DocNode, HeaderState, NodeData, NodeId,
    NodeType, OverlayMarker, Result, Table, TableCell, TextRun,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The complete document: every node keyed by id, plus the per-document
/// endnote registry.
///
/// Commands never mutate a committed tree in place. They clone it, mutate
/// the clone and hand it back, so a failed command leaves no partial edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTree {
    root: NodeId,
    nodes: HashMap<NodeId, DocNode>,
    #[serde(default)]
    annotations: AnnotationRegistry,
    #[serde(default)]
    revision: u64,
}

impl DocumentTree {
    /// Create a tree holding only the document root
    pub fn new() -> Self {
        let root = DocNode::root();
        let root_id = root.id();
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            root: root_id,
            nodes,
            annotations: AnnotationRegistry::new(),
            revision: 0,
        }
    }

    /// Create a document tree with a single empty paragraph
    pub fn with_empty_paragraph() -> Self {
        let mut tree = Self::new();
        let root = tree.root;
        // The root always accepts paragraphs
        let _ = tree.insert_node(DocNode::paragraph(), root, None);
        tree
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&DocNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut DocNode> {
        self.nodes.get_mut(&id)
    }

    fn node(&self, id: NodeId) -> Result<&DocNode> {
        self.nodes.get(&id).ok_or(DocModelError::NodeNotFound(id.as_uuid()))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut DocNode> {
        self.nodes.get_mut(&id).ok_or(DocModelError::NodeNotFound(id.as_uuid()))
    }

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.nodes.get(&id).map(DocNode::node_type)
    }

    /// Child ids of a node, empty if the node does not exist
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(DocNode::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(DocNode::parent)
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    pub fn annotations(&self) -> &AnnotationRegistry {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut AnnotationRegistry {
        &mut self.annotations
    }

    /// Counter bumped on every committed edit
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    // =========================================================================
    // Typed access
    // =========================================================================

    pub fn get_text_run(&self, id: NodeId) -> Option<&TextRun> {
        match self.nodes.get(&id)?.data() {
            NodeData::TextRun(run) => Some(run),
            _ => None,
        }
    }

    pub fn get_text_run_mut(&mut self, id: NodeId) -> Option<&mut TextRun> {
        match self.nodes.get_mut(&id)?.data_mut() {
            NodeData::TextRun(run) => Some(run),
            _ => None,
        }
    }

    pub fn get_table(&self, id: NodeId) -> Option<&Table> {
        match self.nodes.get(&id)?.data() {
            NodeData::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn get_table_mut(&mut self, id: NodeId) -> Option<&mut Table> {
        match self.nodes.get_mut(&id)?.data_mut() {
            NodeData::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn get_table_cell(&self, id: NodeId) -> Option<&TableCell> {
        match self.nodes.get(&id)?.data() {
            NodeData::TableCell(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn get_table_cell_mut(&mut self, id: NodeId) -> Option<&mut TableCell> {
        match self.nodes.get_mut(&id)?.data_mut() {
            NodeData::TableCell(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn get_annotation_marker(&self, id: NodeId) -> Option<&AnnotationMarker> {
        match self.nodes.get(&id)?.data() {
            NodeData::AnnotationMarker(marker) => Some(marker),
            _ => None,
        }
    }

    pub fn get_annotation_marker_mut(&mut self, id: NodeId) -> Option<&mut AnnotationMarker> {
        match self.nodes.get_mut(&id)?.data_mut() {
            NodeData::AnnotationMarker(marker) => Some(marker),
            _ => None,
        }
    }

    pub fn get_overlay_marker(&self, id: NodeId) -> Option<&OverlayMarker> {
        match self.nodes.get(&id)?.data() {
            NodeData::OverlayMarker(overlay) => Some(overlay),
            _ => None,
        }
    }

    /// Find the marker node carrying an endnote id
    pub fn find_annotation_marker(&self, annotation_id: u32) -> Option<NodeId> {
        self.nodes_of_type(NodeType::AnnotationMarker)
            .into_iter()
            .find(|&id| {
                self.get_annotation_marker(id)
                    .is_some_and(|marker| marker.annotation_id == annotation_id)
            })
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Insert a childless node under `parent_id`, appending when `index` is None
    pub fn insert_node(&mut self, mut node: DocNode, parent_id: NodeId, index: Option<usize>) -> Result<NodeId> {
        let parent_type = self.node(parent_id)?.node_type();
        let child_type = node.node_type();
        if !parent_type.accepts_child(child_type) {
            return Err(DocModelError::InvalidNesting {
                parent: parent_type,
                child: child_type,
            });
        }
        if !node.children().is_empty() {
            return Err(DocModelError::InvalidOperation(
                "Nodes must be inserted without children".into(),
            ));
        }

        let node_id = node.id();
        if self.nodes.contains_key(&node_id) {
            return Err(DocModelError::TreeStructureError(format!(
                "Node {} is already in the tree",
                node_id
            )));
        }
        node.set_parent(Some(parent_id));

        let parent = self.node_mut(parent_id)?;
        match index {
            Some(idx) if idx > parent.children().len() => {
                return Err(DocModelError::InvalidPosition {
                    node_id: parent_id.as_uuid(),
                    offset: idx,
                });
            }
            Some(idx) => parent.children_mut().insert(idx, node_id),
            None => parent.children_mut().push(node_id),
        }

        self.nodes.insert(node_id, node);
        Ok(node_id)
    }

    /// Append a paragraph holding `text` as a single plain run
    pub fn append_paragraph(&mut self, parent_id: NodeId, text: &str) -> Result<NodeId> {
        let para_id = self.insert_node(DocNode::paragraph(), parent_id, None)?;
        if !text.is_empty() {
            self.insert_node(DocNode::text(text), para_id, None)?;
        }
        Ok(para_id)
    }

    /// Remove a node and its whole subtree
    pub fn remove_node(&mut self, id: NodeId) -> Result<DocNode> {
        if id == self.root {
            return Err(DocModelError::InvalidOperation("Cannot remove the document root".into()));
        }
        self.detach(id)?;

        let mut removed = self
            .nodes
            .remove(&id)
            .ok_or(DocModelError::NodeNotFound(id.as_uuid()))?;
        let mut pending = removed.children().to_vec();
        while let Some(child_id) = pending.pop() {
            if let Some(child) = self.nodes.remove(&child_id) {
                pending.extend_from_slice(child.children());
            }
        }
        removed.children_mut().clear();
        Ok(removed)
    }

    fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent_id = self.node(id)?.parent();
        if let Some(parent_id) = parent_id {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.children_mut().retain(|&child| child != id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.set_parent(None);
        }
        Ok(())
    }

    /// Move a node (with its subtree) under a new parent
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId, index: Option<usize>) -> Result<()> {
        if id == self.root {
            return Err(DocModelError::InvalidOperation("Cannot move the document root".into()));
        }
        let child_type = self.node(id)?.node_type();
        let parent_type = self.node(new_parent)?.node_type();
        if !parent_type.accepts_child(child_type) {
            return Err(DocModelError::InvalidNesting {
                parent: parent_type,
                child: child_type,
            });
        }
        if new_parent == id || self.is_descendant_of(new_parent, id) {
            return Err(DocModelError::TreeStructureError(
                "Cannot move a node into its own subtree".into(),
            ));
        }

        self.detach(id)?;
        let parent = self.node_mut(new_parent)?;
        let len = parent.children().len();
        let idx = index.unwrap_or(len).min(len);
        parent.children_mut().insert(idx, id);
        self.node_mut(id)?.set_parent(Some(new_parent));
        Ok(())
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if result.contains(&ancestor) {
                break;
            }
            result.push(ancestor);
            current = self.parent(ancestor);
        }
        result
    }

    /// Closest node of `node_type` among `id` and its ancestors
    pub fn find_ancestor_of_type(&self, id: NodeId, node_type: NodeType) -> Option<NodeId> {
        if self.node_type(id)? == node_type {
            return Some(id);
        }
        self.ancestors(id)
            .into_iter()
            .find(|&ancestor| self.node_type(ancestor) == Some(node_type))
    }

    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Descendants in document (pre-)order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        result
    }

    /// All nodes of a kind, in document order
    pub fn nodes_of_type(&self, node_type: NodeType) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.node_type(id) == Some(node_type))
            .collect()
    }

    // =========================================================================
    // Text helpers
    // =========================================================================

    /// Split a text run at a char offset. The run keeps the left part; the
    /// right part becomes a new sibling whose id is returned.
    pub fn split_text_run(&mut self, run_id: NodeId, offset: usize) -> Result<NodeId> {
        let node_type = self.node(run_id)?.node_type();
        let run = self.get_text_run(run_id).ok_or(DocModelError::UnexpectedNodeType {
            expected: NodeType::TextRun,
            found: node_type,
        })?;
        if offset == 0 || offset >= char_len(&run.text) {
            return Err(DocModelError::InvalidPosition {
                node_id: run_id.as_uuid(),
                offset,
            });
        }

        let (left, right) = split_at_char(&run.text, offset);
        let (left, right, style) = (left.to_string(), right.to_string(), run.style);
        let parent_id = self.parent(run_id).ok_or_else(|| {
            DocModelError::TreeStructureError(format!("Text run {} has no parent", run_id))
        })?;
        let index = self.index_in_parent(run_id).unwrap_or(0);

        if let Some(run) = self.get_text_run_mut(run_id) {
            run.text = left;
        }
        self.insert_node(DocNode::styled_text(right, style), parent_id, Some(index + 1))
    }

    /// Join neighbouring runs with equal formatting and drop empty runs
    pub fn merge_adjacent_runs(&mut self, paragraph_id: NodeId) -> Result<()> {
        let children = self.node(paragraph_id)?.children().to_vec();
        let mut previous: Option<NodeId> = None;

        for child_id in children {
            let Some(run) = self.get_text_run(child_id) else {
                previous = None;
                continue;
            };
            if run.text.is_empty() {
                self.remove_node(child_id)?;
                continue;
            }
            let (text, style) = (run.text.clone(), run.style);

            let merged = match previous.and_then(|prev| self.get_text_run_mut(prev)) {
                Some(prev_run) if prev_run.style == style => {
                    prev_run.text.push_str(&text);
                    true
                }
                _ => false,
            };
            if merged {
                self.remove_node(child_id)?;
            } else {
                previous = Some(child_id);
            }
        }
        Ok(())
    }

    /// Concatenated inline text of a paragraph
    pub fn paragraph_text(&self, paragraph_id: NodeId) -> String {
        self.children(paragraph_id)
            .iter()
            .filter_map(|&child| self.get(child).and_then(DocNode::text_content))
            .collect()
    }

    /// A paragraph with no visible inline content
    pub fn is_empty_paragraph(&self, id: NodeId) -> bool {
        self.node_type(id) == Some(NodeType::Paragraph)
            && self.children(id).iter().all(|&child| {
                self.get_text_run(child).is_some_and(|run| run.text.is_empty())
            })
    }

    /// A cell whose only content is a single empty paragraph
    pub fn is_empty_cell(&self, cell_id: NodeId) -> bool {
        match self.children(cell_id) {
            [only] => self.is_empty_paragraph(*only),
            _ => false,
        }
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Insert a `rows x columns` table of empty cells
    pub fn insert_table(
        &mut self,
        table: Table,
        parent_id: NodeId,
        index: Option<usize>,
        rows: usize,
        columns: usize,
    ) -> Result<NodeId> {
        let table_id = self.insert_node(DocNode::table(table), parent_id, index)?;
        for _ in 0..rows {
            let row_id = self.insert_node(DocNode::table_row(), table_id, None)?;
            for _ in 0..columns {
                self.insert_empty_cell(row_id, None, HeaderState::NONE)?;
            }
        }
        Ok(table_id)
    }

    /// Insert a plain cell holding one empty paragraph
    pub fn insert_empty_cell(&mut self, row_id: NodeId, index: Option<usize>, header: HeaderState) -> Result<NodeId> {
        let cell_id = self.insert_node(DocNode::table_cell(TableCell::with_header(header)), row_id, index)?;
        self.insert_node(DocNode::paragraph(), cell_id, None)?;
        Ok(cell_id)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check parent links, nesting rules and that every node is reachable
    /// from the root exactly once.
    pub fn validate(&self) -> Result<()> {
        let root = self.node(self.root)?;
        if root.node_type() != NodeType::Document || root.parent().is_some() {
            return Err(DocModelError::TreeStructureError("Malformed document root".into()));
        }

        let mut visited = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(DocModelError::TreeStructureError(format!(
                    "Node {} is reachable more than once",
                    id
                )));
            }
            let node = self.node(id)?;
            for &child_id in node.children() {
                let child = self.node(child_id)?;
                if child.parent() != Some(id) {
                    return Err(DocModelError::TreeStructureError(format!(
                        "Node {} does not point back to parent {}",
                        child_id, id
                    )));
                }
                if !node.node_type().accepts_child(child.node_type()) {
                    return Err(DocModelError::InvalidNesting {
                        parent: node.node_type(),
                        child: child.node_type(),
                    });
                }
                stack.push(child_id);
            }
        }

        if visited.len() != self.nodes.len() {
            return Err(DocModelError::TreeStructureError(format!(
                "{} nodes are detached from the document",
                self.nodes.len() - visited.len()
            )));
        }
        Ok(())
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}
