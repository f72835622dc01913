//! Snapshot-based undo/redo
//!
//! Every committed command already produces a fresh tree, so history is kept
//! as the committed trees themselves rather than as inverse commands.

use crate::{EditError, Result};
use doc_model::{DocumentTree, EditorSelection};
use std::collections::VecDeque;

/// Document state captured before or after a command
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tree: DocumentTree,
    pub selection: EditorSelection,
    /// Display name of the command that left this state behind
    pub label: String,
}

/// Manages undo and redo stacks
#[derive(Debug)]
pub struct UndoManager {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
    max_entries: usize,
}

impl UndoManager {
    pub fn new() -> Self {
        Self::with_limit(100)
    }

    /// Create with a custom history depth
    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record the state a command is about to replace
    pub fn push(&mut self, snapshot: Snapshot) {
        self.redo_stack.clear();
        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.pop_front();
        }
    }

    /// Swap `current` for the most recent undo snapshot
    pub fn undo(&mut self, current: Snapshot) -> Result<Snapshot> {
        let previous = self.undo_stack.pop_back().ok_or(EditError::UndoStackEmpty)?;
        self.redo_stack.push(Snapshot {
            label: previous.label.clone(),
            ..current
        });
        Ok(previous)
    }

    /// Swap `current` for the most recent redo snapshot
    pub fn redo(&mut self, current: Snapshot) -> Result<Snapshot> {
        let next = self.redo_stack.pop().ok_or(EditError::RedoStackEmpty)?;
        self.undo_stack.push_back(Snapshot {
            label: next.label.clone(),
            ..current
        });
        Ok(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Label of the command the next undo reverts
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.back().map(|snapshot| snapshot.label.as_str())
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(text: &str, label: &str) -> Snapshot {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let para = tree.append_paragraph(root, text).unwrap();
        Snapshot {
            tree,
            selection: EditorSelection::caret(para, 0),
            label: label.into(),
        }
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut manager = UndoManager::new();
        manager.push(snapshot("one", "Typing"));

        let restored = manager.undo(snapshot("two", "")).unwrap();
        assert_eq!(restored.tree.text_content(), "one");
        assert!(manager.can_redo());
        assert!(!manager.can_undo());

        let redone = manager.redo(restored).unwrap();
        assert_eq!(redone.tree.text_content(), "two");
        assert_eq!(manager.undo_label(), Some("Typing"));
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut manager = UndoManager::with_limit(2);
        manager.push(snapshot("a", "1"));
        manager.push(snapshot("b", "2"));
        manager.push(snapshot("c", "3"));

        let last = manager.undo(snapshot("d", "")).unwrap();
        let first = manager.undo(last).unwrap();
        assert_eq!(first.tree.text_content(), "b");
        assert!(matches!(manager.undo(first), Err(EditError::UndoStackEmpty)));
    }

    #[test]
    fn test_push_clears_redo() {
        let mut manager = UndoManager::new();
        manager.push(snapshot("a", "1"));
        let restored = manager.undo(snapshot("b", "")).unwrap();
        manager.push(restored);
        assert!(!manager.can_redo());
        assert!(matches!(manager.redo(snapshot("x", "")), Err(EditError::RedoStackEmpty)));
    }
}
