//! End-to-end editing flows through the engine

use doc_model::{DocNode, DocumentTree, EditorSelection, NodeId, Table, TableMap};
use edit_engine::spellcheck_commands::overlays;
use edit_engine::{
    AcceptSuggestion, ApplyOverlays, CreateAnnotation, DeleteColumn, DeleteTable, EditingEngine,
    IgnoreSuggestion, InsertRow, InsertText, MergeCells, RemoveAnnotation, UpdateAnnotation,
};
use text_check::CheckMatch;

fn letter(paragraphs: &[&str]) -> EditingEngine {
    let mut tree = DocumentTree::new();
    let root = tree.root_id();
    for text in paragraphs {
        tree.append_paragraph(root, text).unwrap();
    }
    EditingEngine::with_tree(tree)
}

fn first_run(engine: &EditingEngine, paragraph: usize) -> NodeId {
    let tree = engine.tree();
    let paragraph = tree.children(tree.root_id())[paragraph];
    tree.children(paragraph)[0]
}

#[test]
fn skipped_command_leaves_document_untouched() {
    let mut engine = letter(&["Dear Officer,"]);
    let before = engine.tree().clone();
    let revision = engine.tree().revision();

    // No table around the caret
    let status = engine.execute(Box::new(InsertRow::below()));
    assert!(!status.is_applied());
    assert_eq!(engine.tree(), &before);
    assert_eq!(engine.tree().revision(), revision);
    assert!(!engine.can_undo());
}

#[test]
fn undo_and_redo_walk_history() {
    let mut engine = letter(&["the beneficiary"]);
    let run = first_run(&engine, 0);
    engine.set_selection(EditorSelection::caret(run, 0));

    assert!(engine.execute(Box::new(InsertText::new("For "))).is_applied());
    assert_eq!(engine.tree().text_content(), "For the beneficiary");

    engine.undo().unwrap();
    assert_eq!(engine.tree().text_content(), "the beneficiary");
    assert!(engine.can_redo());

    engine.redo().unwrap();
    assert_eq!(engine.tree().text_content(), "For the beneficiary");
    assert!(engine.undo().is_ok());
    assert!(engine.undo().is_err());
}

#[test]
fn stale_deferred_command_is_abandoned() {
    let mut engine = letter(&["Sincerely,"]);
    let tree = engine.tree();
    let root = tree.root_id();
    let mut tree = tree.clone();
    let table_id = tree
        .insert_table(doc_model::Table::new(), root, None, 2, 3)
        .unwrap();
    engine.replace_tree(tree);

    let map = TableMap::build(engine.tree(), table_id).unwrap();
    let (left, right) = (map.cell_at(0, 0).unwrap(), map.cell_at(0, 2).unwrap());
    engine.set_selection(EditorSelection::cells(left, right));

    // The menu schedules the merge, but a column delete lands first
    engine.defer(Box::new(MergeCells::new()));
    engine.set_selection(EditorSelection::caret(engine.tree().children(right)[0], 0));
    assert!(engine.execute(Box::new(DeleteColumn::new())).is_applied());

    let statuses = engine.run_deferred();
    assert_eq!(statuses.len(), 1);
    assert!(!statuses[0].is_applied());
    assert_eq!(engine.pending_deferred(), 0);
    assert_eq!(TableMap::build(engine.tree(), table_id).unwrap().cell_count(), 4);
}

#[test]
fn annotation_lifecycle_keeps_marker_and_registry_in_step() {
    let mut engine = letter(&["We received the receipt today."]);
    let run = first_run(&engine, 0);
    engine.set_selection(EditorSelection::caret(run, 17));

    engine
        .try_execute(&CreateAnnotation::with_value("Form I-797C"))
        .unwrap();
    let registry = engine.tree().annotations();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get(1).unwrap().reference_text, "receipt");
    assert_eq!(engine.tree().text_content(), "We received the receipt today.");

    engine
        .try_execute(&UpdateAnnotation::new(1, "Receipt notice, Form I-797C"))
        .unwrap();
    let marker_id = engine.tree().find_annotation_marker(1).unwrap();
    let marker = engine.tree().get_annotation_marker(marker_id).unwrap();
    assert_eq!(marker.value, "Receipt notice, Form I-797C");
    assert_eq!(engine.tree().annotations().get(1).unwrap().value, marker.value);

    engine.try_execute(&RemoveAnnotation::new(1)).unwrap();
    assert!(engine.tree().annotations().is_empty());
    assert!(engine.tree().find_annotation_marker(1).is_none());
    assert_eq!(engine.tree().text_content(), "We received the receipt today.");

    // Undo brings the note back in both places
    engine.undo().unwrap();
    assert!(engine.tree().find_annotation_marker(1).is_some());
    assert!(engine.tree().annotations().contains(1));
}

#[test]
fn ignoring_every_overlay_restores_the_text() {
    let text = "The petitoner and the benificiary";
    let mut engine = letter(&[text]);
    let matches = vec![CheckMatch::new(4, 9), CheckMatch::new(22, 11)];
    assert!(engine
        .execute_transient(&ApplyOverlays::new(text, matches))
        .is_applied());
    assert_eq!(overlays(engine.tree()).len(), 2);
    assert_eq!(engine.tree().text_content(), text);

    for (marker_id, marker) in overlays(engine.tree()) {
        engine
            .try_execute(&IgnoreSuggestion::new(marker_id, marker.text))
            .unwrap();
    }
    assert!(overlays(engine.tree()).is_empty());
    assert_eq!(engine.tree().text_content(), text);

    let paragraph = engine.tree().children(engine.tree().root_id())[0];
    assert_eq!(engine.tree().children(paragraph).len(), 1);
}

#[test]
fn accepting_a_suggestion_moves_caret_after_it() {
    let text = "Dear Offcer,";
    let mut engine = letter(&[text]);
    let matches = vec![CheckMatch::with_suggestions(5, 6, vec!["Officer".into()])];
    engine.execute_transient(&ApplyOverlays::new(text, matches));

    let (marker_id, marker) = overlays(engine.tree()).remove(0);
    engine
        .try_execute(&AcceptSuggestion::new(marker_id, marker.text, "Officer"))
        .unwrap();
    assert_eq!(engine.tree().text_content(), "Dear Officer,");

    engine.try_execute(&InsertText::new("!")).unwrap();
    assert_eq!(engine.tree().text_content(), "Dear Officer!,");
}

#[test]
fn deleting_a_table_takes_its_endnotes_along() {
    let mut tree = DocumentTree::new();
    let root = tree.root_id();
    tree.append_paragraph(root, "Exhibits:").unwrap();
    let table_id = tree.insert_table(Table::new(), root, None, 1, 2).unwrap();
    let cell = TableMap::build(&tree, table_id).unwrap().cell_at(0, 0).unwrap();
    let cell_paragraph = tree.children(cell)[0];
    let run = tree.insert_node(DocNode::text("Passport"), cell_paragraph, None).unwrap();

    let mut engine = EditingEngine::with_tree(tree);
    engine.set_selection(EditorSelection::caret(run, 2));
    assert!(engine.execute(Box::new(CreateAnnotation::with_value("Biographic page"))).is_applied());
    assert!(engine.tree().annotations().contains(1));

    assert!(engine.execute(Box::new(DeleteTable::new())).is_applied());
    assert!(engine.tree().annotations().is_empty());
    assert_eq!(engine.tree().text_content(), "Exhibits:");

    engine.undo().unwrap();
    assert!(engine.tree().find_annotation_marker(1).is_some());
    assert_eq!(engine.tree().annotations().get(1).unwrap().value, "Biographic page");
}
