//! Letter metadata and letter files
//!
//! A letter is stored as its HTML body plus a JSON sidecar holding the
//! endnote list. The sidecar seeds the endnote registry on open so values
//! missing from the markup can be recovered, and it is rewritten from the
//! registry on save.

use crate::html::{export_html, import_html};
use crate::{Result, StoreError};
use chrono::{DateTime, Utc};
use doc_model::{AnnotationRegistry, DocumentTree, EndnoteEntry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata format version
pub const METADATA_VERSION: u32 = 1;

fn current_version() -> u32 {
    METADATA_VERSION
}

/// Out-of-band data saved next to a letter's HTML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterMetadata {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub endnotes: Vec<EndnoteEntry>,
}

impl Default for LetterMetadata {
    fn default() -> Self {
        Self {
            version: METADATA_VERSION,
            saved_at: None,
            endnotes: Vec::new(),
        }
    }
}

impl LetterMetadata {
    /// Snapshot a document's endnote registry
    pub fn from_tree(tree: &DocumentTree) -> Self {
        Self {
            version: METADATA_VERSION,
            saved_at: Some(Utc::now()),
            endnotes: tree.annotations().all_entries(),
        }
    }

    /// Registry seeded with the saved endnotes
    pub fn registry(&self) -> AnnotationRegistry {
        let mut registry = AnnotationRegistry::new();
        registry.initialize_from_document(&self.endnotes);
        registry
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let metadata: LetterMetadata = serde_json::from_str(json)?;
        if metadata.version > METADATA_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported metadata version: {}",
                metadata.version
            )));
        }
        Ok(metadata)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Sidecar path for a letter: `letter.html` -> `letter.json`
pub fn metadata_path_for(path: impl AsRef<Path>) -> PathBuf {
    path.as_ref().with_extension("json")
}

/// Read a letter's metadata. A missing or unreadable sidecar yields empty
/// metadata.
pub async fn load_metadata(path: impl AsRef<Path>) -> Result<LetterMetadata> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(LetterMetadata::default());
    }
    let json = tokio::fs::read_to_string(path).await?;
    match LetterMetadata::from_json(&json) {
        Ok(metadata) => Ok(metadata),
        Err(e) => {
            tracing::warn!("Failed to parse letter metadata, ignoring it: {}", e);
            Ok(LetterMetadata::default())
        }
    }
}

/// Open a letter: read its metadata, then its HTML body
pub async fn open_letter(path: impl AsRef<Path>) -> Result<DocumentTree> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.display().to_string()));
    }

    let metadata = load_metadata(metadata_path_for(path)).await?;
    let html = tokio::fs::read_to_string(path).await?;
    let tree = import_html(&html, &metadata.registry())?;
    tracing::info!(
        "Opened {} ({} endnotes)",
        path.display(),
        tree.annotations().len()
    );
    Ok(tree)
}

/// Save a letter's HTML body and its metadata sidecar
pub async fn save_letter(tree: &DocumentTree, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::write(path, export_html(tree)).await?;
    let metadata = LetterMetadata::from_tree(tree);
    tokio::fs::write(metadata_path_for(path), metadata.to_json()?).await?;
    tracing::info!(
        "Saved {} ({} endnotes)",
        path.display(),
        metadata.endnotes.len()
    );
    Ok(())
}
