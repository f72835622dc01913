//! Subcommand implementations

use crate::script::{parse_script, run_step, StepOutcome};
use anyhow::{Context, Result};
use doc_model::DocumentTree;
use edit_engine::spellcheck_commands::overlays;
use edit_engine::{AcceptSuggestion, CheckOutcome, EditingEngine, SpellcheckConfig, SpellcheckService};
use std::path::Path;
use std::sync::Arc;
use store::{open_letter, save_letter, EditorSettings, SpellcheckSettings};
use text_check::DictionaryChecker;
use tokio::sync::RwLock;

/// Pipeline configuration from the stored settings
pub fn spellcheck_config(settings: &SpellcheckSettings) -> SpellcheckConfig {
    SpellcheckConfig {
        enabled: settings.enabled,
        debounce_ms: settings.debounce_ms,
        cache_capacity: settings.cache_capacity,
    }
}

async fn build_checker(settings: &SpellcheckSettings) -> Result<DictionaryChecker> {
    let mut checker = DictionaryChecker::for_language_code(&settings.language)
        .with_context(|| format!("cannot check {}", settings.language))?;
    if let Some(path) = &settings.word_list {
        let added = checker
            .load_word_list(path)
            .await
            .with_context(|| format!("failed to load word list {}", path.display()))?;
        tracing::info!("Loaded {} words from {}", added, path.display());
    }
    Ok(checker)
}

/// Write an empty letter
pub async fn new_letter(path: &Path) -> Result<()> {
    save_letter(&DocumentTree::with_empty_paragraph(), path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

/// Print every endnote of a letter
pub async fn list_endnotes(path: &Path) -> Result<()> {
    let tree = open_letter(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let entries = tree.annotations().all_entries();
    if entries.is_empty() {
        println!("No endnotes");
    }
    for entry in entries {
        if entry.value.is_empty() {
            println!("[{}] {}", entry.id, entry.text);
        } else {
            println!("[{}] {}: {}", entry.id, entry.text, entry.value);
        }
    }
    Ok(())
}

/// Spell-check a letter and report the flagged words. With `fix`, every
/// flagged word that has a suggestion is replaced by the first one and the
/// letter is saved.
pub async fn check_letter(path: &Path, settings: &EditorSettings, fix: bool) -> Result<()> {
    let tree = open_letter(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let checker = build_checker(&settings.spellcheck).await?;

    let engine = Arc::new(RwLock::new(EditingEngine::with_tree(tree)));
    let service = SpellcheckService::new(
        engine.clone(),
        Arc::new(checker),
        spellcheck_config(&settings.spellcheck),
    );

    match service.check_now().await {
        Some(CheckOutcome::Applied(0)) => {
            println!("No spelling issues");
            return Ok(());
        }
        Some(CheckOutcome::Applied(count)) => println!("{} spelling issue(s):", count),
        Some(other) => anyhow::bail!("spell check did not complete: {:?}", other),
        None => {
            println!("Spell checking is disabled");
            return Ok(());
        }
    }

    let mut engine = engine.write().await;
    let mut fixed = 0;
    for (marker_id, marker) in overlays(engine.tree()) {
        if marker.suggestions.is_empty() {
            println!("  {} (no suggestions)", marker.text);
        } else {
            println!("  {} -> {}", marker.text, marker.suggestions.join(", "));
        }
        if fix {
            if let Some(suggestion) = marker.suggestions.first() {
                let command = AcceptSuggestion::new(marker_id, marker.text.clone(), suggestion.clone());
                if engine.execute(Box::new(command)).is_applied() {
                    fixed += 1;
                }
            }
        }
    }

    if fix && fixed > 0 {
        save_letter(engine.tree(), path)
            .await
            .with_context(|| format!("failed to save {}", path.display()))?;
        println!("Corrected {} word(s) in {}", fixed, path.display());
    }
    Ok(())
}

/// Apply an edit script to a letter and save the result
pub async fn edit_letter(
    path: &Path,
    script_path: &Path,
    output: Option<&Path>,
    settings: &EditorSettings,
) -> Result<()> {
    let tree = open_letter(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let script = tokio::fs::read_to_string(script_path)
        .await
        .with_context(|| format!("failed to read {}", script_path.display()))?;
    let steps = parse_script(&script).with_context(|| format!("invalid script {}", script_path.display()))?;

    let mut engine = EditingEngine::with_tree(tree);
    let (mut applied, mut skipped) = (0, 0);
    for (index, step) in steps.iter().enumerate() {
        let outcome = run_step(&mut engine, step, &settings.tables)
            .with_context(|| format!("step {} ({:?})", index + 1, step))?;
        match outcome {
            StepOutcome::Applied => applied += 1,
            StepOutcome::Skipped => skipped += 1,
            StepOutcome::Selected => {}
        }
    }

    let destination = output.unwrap_or(path);
    save_letter(engine.tree(), destination)
        .await
        .with_context(|| format!("failed to save {}", destination.display()))?;
    println!(
        "{} command(s) applied, {} skipped; saved {}",
        applied,
        skipped,
        destination.display()
    );
    Ok(())
}
