//! Spelling overlay commands
//!
//! Overlays are transient: applying or dropping them never changes the
//! document's text, so these commands run without history except for
//! [`AcceptSuggestion`], which replaces text.

use crate::command::{caret_inside, resolve_paragraph_point, ParagraphPoint};
use crate::{Command, CommandResult, EditError, Result};
use doc_model::text::{char_len, char_slice};
use doc_model::{
    DocNode, DocumentTree, EditorSelection, NodeId, NodeType, OverlayMarker, Position, RunStyle,
    Selection,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use text_check::CheckMatch;

// =============================================================================
// Tree helpers
// =============================================================================

/// Locate an overlay marker by id, falling back to the first marker showing
/// `original_text` when the id is gone (the marker was recreated by a later
/// check cycle).
pub fn find_overlay(tree: &DocumentTree, marker_id: NodeId, original_text: &str) -> Option<NodeId> {
    if tree.get_overlay_marker(marker_id).is_some() {
        return Some(marker_id);
    }
    tree.nodes_of_type(NodeType::OverlayMarker)
        .into_iter()
        .find(|&id| tree.get_overlay_marker(id).is_some_and(|marker| marker.text == original_text))
}

/// Replace an overlay marker with a plain run carrying `text` and the
/// marker's original style. Returns the paragraph and the new run.
fn replace_overlay(tree: &mut DocumentTree, marker_id: NodeId, text: Option<&str>) -> Result<(NodeId, NodeId)> {
    let marker = tree
        .get_overlay_marker(marker_id)
        .cloned()
        .ok_or_else(|| EditError::InvalidCommand(format!("node {} is not an overlay", marker_id)))?;
    let paragraph_id = tree
        .parent(marker_id)
        .ok_or_else(|| EditError::InvalidCommand("overlay marker is detached".into()))?;
    let index = tree.index_in_parent(marker_id).unwrap_or(0);

    tree.remove_node(marker_id)?;
    let text = text.map(str::to_string).unwrap_or(marker.text);
    let run_id = tree.insert_node(DocNode::styled_text(text, marker.style), paragraph_id, Some(index))?;
    Ok((paragraph_id, run_id))
}

/// Turn every overlay back into plain text. Returns how many were removed.
pub fn revert_all_overlays(tree: &mut DocumentTree) -> Result<usize> {
    let markers = tree.nodes_of_type(NodeType::OverlayMarker);
    let mut paragraphs = BTreeSet::new();
    for &marker_id in &markers {
        let (paragraph_id, _) = replace_overlay(tree, marker_id, None)?;
        paragraphs.insert(paragraph_id);
    }
    for paragraph_id in paragraphs {
        tree.merge_adjacent_runs(paragraph_id)?;
    }
    Ok(markers.len())
}

/// Turn the overlays touching `[start, end)` of a paragraph back into plain
/// text. The paragraph's text is unchanged. Returns how many were removed.
pub fn revert_overlays_in(tree: &mut DocumentTree, paragraph_id: NodeId, start: usize, end: usize) -> Result<usize> {
    let mut touching = Vec::new();
    let mut offset = 0;
    for &child in tree.children(paragraph_id) {
        let len = tree.node_text(child).map(char_len).unwrap_or(0);
        if tree.node_type(child) == Some(NodeType::OverlayMarker) && offset < end && offset + len > start {
            touching.push(child);
        }
        offset += len;
    }
    for &marker_id in &touching {
        replace_overlay(tree, marker_id, None)?;
    }
    if !touching.is_empty() {
        tree.merge_adjacent_runs(paragraph_id)?;
    }
    Ok(touching.len())
}

/// Cut `[start, end)` of a text run out into an overlay marker
fn wrap_in_overlay(
    tree: &mut DocumentTree,
    run_id: NodeId,
    start: usize,
    end: usize,
    suggestions: Vec<String>,
) -> Result<NodeId> {
    let len = tree.get_text_run(run_id).map(|run| char_len(&run.text)).unwrap_or(0);
    if end < len {
        tree.split_text_run(run_id, end)?;
    }
    let target = if start > 0 {
        tree.split_text_run(run_id, start)?
    } else {
        run_id
    };

    let (text, style) = tree
        .get_text_run(target)
        .map(|run| (run.text.clone(), run.style))
        .ok_or_else(|| EditError::InvalidCommand(format!("node {} is not a text run", target)))?;
    let paragraph_id = tree
        .parent(target)
        .ok_or_else(|| EditError::InvalidCommand("text run is detached".into()))?;
    let index = tree.index_in_parent(target).unwrap_or(0);
    tree.remove_node(target)?;
    let overlay = OverlayMarker::new(text, suggestions, style);
    Ok(tree.insert_node(DocNode::overlay_marker(overlay), paragraph_id, Some(index))?)
}

/// Re-express a position against a tree whose paragraph texts are unchanged
/// but whose inline nodes were split or joined
fn remap_position(before: &DocumentTree, after: &DocumentTree, position: &Position) -> Option<Position> {
    let ParagraphPoint { paragraph_id, offset } = resolve_paragraph_point(before, position)?;
    position_at(after, paragraph_id, offset)
}

/// Position at a paragraph char offset, inside the inline node holding it
fn position_at(tree: &DocumentTree, paragraph_id: NodeId, offset: usize) -> Option<Position> {
    if tree.node_type(paragraph_id) != Some(NodeType::Paragraph) {
        return None;
    }
    let mut start = 0;
    let mut last = None;
    for &child in tree.children(paragraph_id) {
        let len = tree.node_text(child).map(char_len).unwrap_or(0);
        if offset <= start + len {
            return Some(Position::new(child, offset - start));
        }
        start += len;
        last = Some((child, len));
    }
    match last {
        Some((child, len)) => Some(Position::new(child, len)),
        None => Some(Position::new(paragraph_id, 0)),
    }
}

fn remap_selection(before: &DocumentTree, after: &DocumentTree, selection: &EditorSelection) -> EditorSelection {
    let remapped = match selection {
        EditorSelection::Text(text) => {
            match (
                remap_position(before, after, &text.anchor),
                remap_position(before, after, &text.focus),
            ) {
                (Some(anchor), Some(focus)) => EditorSelection::Text(Selection::new(anchor, focus)),
                _ => *selection,
            }
        }
        EditorSelection::Cells(_) => *selection,
    };
    if remapped.resolves_in(after) {
        remapped
    } else {
        caret_inside(after, after.root_id())
    }
}

// =============================================================================
// Apply / revert
// =============================================================================

/// Lay a checker response over the document.
///
/// `expected_text` is the flattened text the response was computed for; if
/// the document has changed since, nothing is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyOverlays {
    pub expected_text: String,
    pub matches: Vec<CheckMatch>,
    /// Lowercase words the user chose to ignore for this session
    pub ignored: HashSet<String>,
}

impl ApplyOverlays {
    pub fn new(expected_text: impl Into<String>, matches: Vec<CheckMatch>) -> Self {
        Self {
            expected_text: expected_text.into(),
            matches,
            ignored: HashSet::new(),
        }
    }

    pub fn with_ignored(mut self, ignored: HashSet<String>) -> Self {
        self.ignored = ignored;
        self
    }
}

impl Command for ApplyOverlays {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        if tree.text_content() != self.expected_text {
            return Err(EditError::InvalidCommand("spelling results are stale".into()));
        }

        let mut new_tree = tree.clone();
        revert_all_overlays(&mut new_tree)?;
        let flat = new_tree.flatten();
        let total = flat.char_len();

        let mut ordered: Vec<&CheckMatch> = self.matches.iter().collect();
        ordered.sort_by_key(|m| (m.offset, m.length));

        // Target run and local range for every match that survives filtering
        let mut accepted: Vec<(NodeId, usize, usize, &CheckMatch)> = Vec::new();
        let mut last_end = 0;
        for m in ordered {
            if m.is_empty() || m.end() > total {
                tracing::debug!("Dropping out-of-range match at {}+{}", m.offset, m.length);
                continue;
            }
            if m.offset < last_end {
                continue;
            }
            let word = char_slice(&flat.text, m.offset, m.end());
            if self.ignored.contains(&word.to_lowercase()) {
                continue;
            }
            // Matches straddling two inline nodes are not decorated
            let Some(segment) = flat
                .segment_containing(m.offset, m.end())
                .filter(|segment| segment.node_type == NodeType::TextRun)
            else {
                continue;
            };
            accepted.push((segment.node_id, m.offset - segment.start, m.end() - segment.start, m));
            last_end = m.end();
        }

        // Right to left so earlier offsets in a shared run stay valid
        for &(run_id, start, end, m) in accepted.iter().rev() {
            wrap_in_overlay(&mut new_tree, run_id, start, end, m.suggestions.clone())?;
        }
        tracing::debug!("Applied {} spelling overlays", accepted.len());

        let selection = remap_selection(tree, &new_tree, selection);
        Ok(CommandResult {
            tree: new_tree,
            selection,
        })
    }

    fn display_name(&self) -> &str {
        "Apply Spelling Overlays"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

/// Drop every overlay, leaving the text as it was
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevertOverlays;

impl RevertOverlays {
    pub fn new() -> Self {
        Self
    }
}

impl Command for RevertOverlays {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let mut new_tree = tree.clone();
        revert_all_overlays(&mut new_tree)?;
        let selection = remap_selection(tree, &new_tree, selection);
        Ok(CommandResult {
            tree: new_tree,
            selection,
        })
    }

    fn display_name(&self) -> &str {
        "Clear Spelling Overlays"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

// =============================================================================
// User actions
// =============================================================================

/// Replace a flagged word with one of its suggestions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptSuggestion {
    pub marker_id: NodeId,
    /// Text the marker showed when the user picked the suggestion
    pub original_text: String,
    pub suggestion: String,
}

impl AcceptSuggestion {
    pub fn new(marker_id: NodeId, original_text: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            marker_id,
            original_text: original_text.into(),
            suggestion: suggestion.into(),
        }
    }
}

impl Command for AcceptSuggestion {
    fn apply(&self, tree: &DocumentTree, _selection: &EditorSelection) -> Result<CommandResult> {
        let marker_id = find_overlay(tree, self.marker_id, &self.original_text).ok_or_else(|| {
            EditError::InvalidCommand(format!("no overlay for '{}'", self.original_text))
        })?;

        let mut new_tree = tree.clone();
        let (paragraph_id, run_id) = replace_overlay(&mut new_tree, marker_id, Some(&self.suggestion))?;
        let start = resolve_paragraph_point(&new_tree, &Position::new(run_id, 0))
            .map(|point| point.offset)
            .unwrap_or(0);
        new_tree.merge_adjacent_runs(paragraph_id)?;

        let caret = position_at(&new_tree, paragraph_id, start + char_len(&self.suggestion))
            .map(|position| EditorSelection::Text(Selection::collapsed(position)))
            .unwrap_or_else(|| caret_inside(&new_tree, paragraph_id));
        Ok(CommandResult {
            tree: new_tree,
            selection: caret,
        })
    }

    fn display_name(&self) -> &str {
        "Correct Spelling"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

/// Dismiss one flagged word, keeping its text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreSuggestion {
    pub marker_id: NodeId,
    pub original_text: String,
}

impl IgnoreSuggestion {
    pub fn new(marker_id: NodeId, original_text: impl Into<String>) -> Self {
        Self {
            marker_id,
            original_text: original_text.into(),
        }
    }
}

impl Command for IgnoreSuggestion {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let marker_id = find_overlay(tree, self.marker_id, &self.original_text).ok_or_else(|| {
            EditError::InvalidCommand(format!("no overlay for '{}'", self.original_text))
        })?;

        let mut new_tree = tree.clone();
        let (paragraph_id, _) = replace_overlay(&mut new_tree, marker_id, None)?;
        new_tree.merge_adjacent_runs(paragraph_id)?;
        let selection = remap_selection(tree, &new_tree, selection);
        Ok(CommandResult {
            tree: new_tree,
            selection,
        })
    }

    fn display_name(&self) -> &str {
        "Ignore Spelling"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

/// Dismiss every overlay showing `word` (case-insensitive)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreAll {
    pub word: String,
}

impl IgnoreAll {
    pub fn new(word: impl Into<String>) -> Self {
        Self { word: word.into() }
    }
}

impl Command for IgnoreAll {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let word = self.word.to_lowercase();
        let markers: Vec<NodeId> = tree
            .nodes_of_type(NodeType::OverlayMarker)
            .into_iter()
            .filter(|&id| {
                tree.get_overlay_marker(id)
                    .is_some_and(|marker| marker.text.to_lowercase() == word)
            })
            .collect();

        let mut new_tree = tree.clone();
        let mut paragraphs = BTreeSet::new();
        for marker_id in markers {
            let (paragraph_id, _) = replace_overlay(&mut new_tree, marker_id, None)?;
            paragraphs.insert(paragraph_id);
        }
        for paragraph_id in paragraphs {
            new_tree.merge_adjacent_runs(paragraph_id)?;
        }

        let selection = remap_selection(tree, &new_tree, selection);
        Ok(CommandResult {
            tree: new_tree,
            selection,
        })
    }

    fn display_name(&self) -> &str {
        "Ignore All"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

/// Overlay markers in document order with their text, for menus
pub fn overlays(tree: &DocumentTree) -> Vec<(NodeId, OverlayMarker)> {
    tree.nodes_of_type(NodeType::OverlayMarker)
        .into_iter()
        .filter_map(|id| tree.get_overlay_marker(id).map(|marker| (id, marker.clone())))
        .collect()
}

/// Style carried by an overlay, for callers that re-render it as plain text
pub fn overlay_style(tree: &DocumentTree, marker_id: NodeId) -> Option<RunStyle> {
    tree.get_overlay_marker(marker_id).map(|marker| marker.style)
}
