//! Endnote commands
//!
//! Create, edit and remove inline endnote references. The marker node and
//! the document's registry entry are always written in the same transaction.

use crate::command::{isolate_inline_range, resolve_paragraph_point};
use crate::spellcheck_commands::revert_overlays_in;
use crate::{Command, CommandResult, EditError, Result};
use doc_model::text::{char_slice, word_range_at};
use doc_model::{AnnotationMarker, DocNode, DocumentTree, EditorSelection, NodeType, Position};
use serde::{Deserialize, Serialize};

// =============================================================================
// Create
// =============================================================================

/// Turn the selected text, or the word under a caret, into an endnote
/// reference with a freshly allocated id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAnnotation {
    /// Initial note value; empty when not given
    pub value: Option<String>,
}

impl CreateAnnotation {
    pub fn new() -> Self {
        Self { value: None }
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }
}

impl Command for CreateAnnotation {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let EditorSelection::Text(text_selection) = selection else {
            return Err(EditError::SelectionUnresolved(
                "endnotes need a text selection".into(),
            ));
        };
        let unresolved = || EditError::SelectionUnresolved("selection is not inside a paragraph".into());
        let anchor = resolve_paragraph_point(tree, &text_selection.anchor).ok_or_else(unresolved)?;
        let focus = resolve_paragraph_point(tree, &text_selection.focus).ok_or_else(unresolved)?;
        if anchor.paragraph_id != focus.paragraph_id {
            return Err(EditError::SelectionUnresolved(
                "endnote selection spans more than one paragraph".into(),
            ));
        }
        let paragraph_id = focus.paragraph_id;
        let paragraph_text = tree.paragraph_text(paragraph_id);

        let (start, end) = if anchor.offset == focus.offset {
            word_range_at(&paragraph_text, focus.offset)
                .ok_or_else(|| EditError::SelectionUnresolved("no word under the cursor".into()))?
        } else {
            (anchor.offset.min(focus.offset), anchor.offset.max(focus.offset))
        };
        let reference_text = char_slice(&paragraph_text, start, end).to_string();

        let mut new_tree = tree.clone();
        // Spelling overlays under the phrase give way to the endnote
        revert_overlays_in(&mut new_tree, paragraph_id, start, end)?;
        let covered = isolate_inline_range(&mut new_tree, paragraph_id, start, end)?;
        if covered
            .iter()
            .any(|&id| new_tree.node_type(id) == Some(NodeType::AnnotationMarker))
        {
            return Err(EditError::InvalidCommand(
                "selection already contains a marker".into(),
            ));
        }
        let index = covered
            .first()
            .and_then(|&first| new_tree.index_in_parent(first))
            .ok_or_else(|| EditError::InvalidCommand("nothing to annotate".into()))?;
        for id in covered {
            new_tree.remove_node(id)?;
        }

        let value = self.value.clone().unwrap_or_default();
        let id = new_tree.annotations_mut().allocate_id();
        let marker = AnnotationMarker::new(id, reference_text.clone(), value.clone());
        new_tree.insert_node(DocNode::annotation_marker(marker), paragraph_id, Some(index))?;
        new_tree.annotations_mut().register(id, reference_text, value);
        tracing::debug!("Created endnote {}", id);

        Ok(CommandResult {
            tree: new_tree,
            selection: EditorSelection::Text(doc_model::Selection::collapsed(Position::new(
                paragraph_id,
                index + 1,
            ))),
        })
    }

    fn display_name(&self) -> &str {
        "Insert Endnote"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

// =============================================================================
// Update
// =============================================================================

/// Change the value of an existing endnote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAnnotation {
    pub annotation_id: u32,
    pub value: String,
}

impl UpdateAnnotation {
    pub fn new(annotation_id: u32, value: impl Into<String>) -> Self {
        Self {
            annotation_id,
            value: value.into(),
        }
    }
}

impl Command for UpdateAnnotation {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let marker_id = tree
            .find_annotation_marker(self.annotation_id)
            .ok_or_else(|| EditError::InvalidCommand(format!("endnote {} has no marker", self.annotation_id)))?;
        if !tree.annotations().contains(self.annotation_id) {
            return Err(EditError::InvalidCommand(format!(
                "endnote {} is not registered",
                self.annotation_id
            )));
        }

        let mut new_tree = tree.clone();
        if let Some(marker) = new_tree.get_annotation_marker_mut(marker_id) {
            marker.value = self.value.clone();
        }
        new_tree.annotations_mut().update(self.annotation_id, self.value.clone());

        Ok(CommandResult {
            tree: new_tree,
            selection: *selection,
        })
    }

    fn display_name(&self) -> &str {
        "Edit Endnote"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

// =============================================================================
// Remove
// =============================================================================

/// Replace an endnote reference with its plain text and drop the entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveAnnotation {
    pub annotation_id: u32,
}

impl RemoveAnnotation {
    pub fn new(annotation_id: u32) -> Self {
        Self { annotation_id }
    }
}

impl Command for RemoveAnnotation {
    fn apply(&self, tree: &DocumentTree, selection: &EditorSelection) -> Result<CommandResult> {
        let mut new_tree = tree.clone();

        let Some(marker_id) = tree.find_annotation_marker(self.annotation_id) else {
            // Registry-only entries can still be dropped
            return match new_tree.annotations_mut().remove(self.annotation_id) {
                Some(_) => Ok(CommandResult {
                    tree: new_tree,
                    selection: *selection,
                }),
                None => Err(EditError::InvalidCommand(format!(
                    "endnote {} does not exist",
                    self.annotation_id
                ))),
            };
        };

        let reference_text = tree
            .get_annotation_marker(marker_id)
            .map(|marker| marker.reference_text.clone())
            .unwrap_or_default();
        let paragraph_id = tree
            .parent(marker_id)
            .ok_or_else(|| EditError::InvalidCommand("endnote marker is detached".into()))?;
        let index = tree.index_in_parent(marker_id).unwrap_or(0);

        new_tree.remove_node(marker_id)?;
        let run_id = new_tree.insert_node(DocNode::text(reference_text), paragraph_id, Some(index))?;
        new_tree.annotations_mut().remove(self.annotation_id);

        let selection = if selection.resolves_in(&new_tree) {
            *selection
        } else {
            EditorSelection::caret(run_id, 0)
        };
        new_tree.merge_adjacent_runs(paragraph_id)?;
        let selection = if selection.resolves_in(&new_tree) {
            selection
        } else {
            crate::command::caret_inside(&new_tree, paragraph_id)
        };

        Ok(CommandResult {
            tree: new_tree,
            selection,
        })
    }

    fn display_name(&self) -> &str {
        "Remove Endnote"
    }

    fn clone_box(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}
