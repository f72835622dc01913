//! Command execution engine

use crate::command::caret_inside;
use crate::undo::Snapshot;
use crate::{Command, Result, UndoManager};
use doc_model::{DocumentTree, EditorSelection, NodeId};
use std::collections::VecDeque;

/// Outcome of running a command through the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// The command committed a new document state
    Applied,
    /// The command could not run; the document is unchanged
    Skipped,
}

impl CommandStatus {
    pub fn is_applied(self) -> bool {
        self == CommandStatus::Applied
    }
}

/// A command scheduled to run on a later tick, with the selection that was
/// current when it was scheduled
#[derive(Debug)]
struct DeferredCommand {
    command: Box<dyn Command>,
    captured: EditorSelection,
}

/// Owns one open document: its tree (with the endnote registry inside),
/// the selection and the history.
///
/// All mutation goes through [`execute`](Self::execute): the command works on
/// a copy and the copy replaces the committed tree only if the command
/// succeeds. Failures are logged and leave the document untouched.
pub struct EditingEngine {
    /// Current document tree
    tree: DocumentTree,
    /// Current selection
    selection: EditorSelection,
    undo_manager: UndoManager,
    deferred: VecDeque<DeferredCommand>,
}

impl EditingEngine {
    /// Create a new editing engine with an empty document
    pub fn new() -> Self {
        Self::with_tree(DocumentTree::with_empty_paragraph())
    }

    /// Create an editing engine with a specific document tree
    pub fn with_tree(tree: DocumentTree) -> Self {
        let selection = caret_inside(&tree, tree.root_id());
        Self {
            tree,
            selection,
            undo_manager: UndoManager::new(),
            deferred: VecDeque::new(),
        }
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn selection(&self) -> EditorSelection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: EditorSelection) {
        self.selection = selection;
    }

    /// Place a caret at the start of a node's first text
    pub fn select_node(&mut self, node_id: NodeId) {
        self.selection = caret_inside(&self.tree, node_id);
    }

    /// Run a command against the current selection and record it for undo.
    pub fn execute(&mut self, command: Box<dyn Command>) -> CommandStatus {
        self.run(command.as_ref(), true)
    }

    /// Run a command without recording history. Used for transient
    /// decorations such as spelling overlays.
    pub fn execute_transient(&mut self, command: &dyn Command) -> CommandStatus {
        self.run(command, false)
    }

    /// Like [`execute`](Self::execute) but hands the failure back instead of
    /// logging it
    pub fn try_execute(&mut self, command: &dyn Command) -> Result<()> {
        let result = command.apply(&self.tree, &self.selection)?;
        self.commit(result.tree, result.selection, Some(command.display_name()));
        Ok(())
    }

    fn run(&mut self, command: &dyn Command, record: bool) -> CommandStatus {
        match command.apply(&self.tree, &self.selection) {
            Ok(result) => {
                let label = record.then(|| command.display_name());
                self.commit(result.tree, result.selection, label);
                CommandStatus::Applied
            }
            Err(e) => {
                tracing::warn!("{} skipped: {}", command.display_name(), e);
                CommandStatus::Skipped
            }
        }
    }

    fn commit(&mut self, mut tree: DocumentTree, selection: EditorSelection, label: Option<&str>) {
        if let Some(label) = label {
            self.undo_manager.push(Snapshot {
                tree: self.tree.clone(),
                selection: self.selection,
                label: label.to_string(),
            });
        }
        tree.bump_revision();
        self.tree = tree;
        self.selection = selection;
    }

    /// Replace the whole document, e.g. after opening a file
    pub fn replace_tree(&mut self, tree: DocumentTree) {
        self.selection = caret_inside(&tree, tree.root_id());
        self.tree = tree;
        self.undo_manager.clear();
        self.deferred.clear();
    }

    // =========================================================================
    // Deferred commands
    // =========================================================================

    /// Schedule a command for [`run_deferred`](Self::run_deferred), e.g. once
    /// a menu has finished closing.
    pub fn defer(&mut self, command: Box<dyn Command>) {
        self.deferred.push_back(DeferredCommand {
            command,
            captured: self.selection,
        });
    }

    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    /// Run scheduled commands against the selection current now. A command
    /// whose captured selection no longer resolves is abandoned.
    pub fn run_deferred(&mut self) -> Vec<CommandStatus> {
        let mut statuses = Vec::with_capacity(self.deferred.len());
        while let Some(deferred) = self.deferred.pop_front() {
            if !deferred.captured.resolves_in(&self.tree) {
                tracing::warn!(
                    "{} abandoned: the selection it was scheduled with is stale",
                    deferred.command.display_name()
                );
                statuses.push(CommandStatus::Skipped);
                continue;
            }
            statuses.push(self.execute(deferred.command));
        }
        statuses
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Undo the last command
    pub fn undo(&mut self) -> Result<()> {
        let current = self.snapshot();
        let previous = self.undo_manager.undo(current)?;
        self.restore(previous);
        Ok(())
    }

    /// Redo the last undone command
    pub fn redo(&mut self) -> Result<()> {
        let current = self.snapshot();
        let next = self.undo_manager.redo(current)?;
        self.restore(next);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.undo_manager.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_manager.can_redo()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            tree: self.tree.clone(),
            selection: self.selection,
            label: String::new(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.tree = snapshot.tree;
        self.tree.bump_revision();
        self.selection = if snapshot.selection.resolves_in(&self.tree) {
            snapshot.selection
        } else {
            caret_inside(&self.tree, self.tree.root_id())
        };
    }
}

impl Default for EditingEngine {
    fn default() -> Self {
        Self::new()
    }
}
