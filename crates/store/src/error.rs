//! Error types for storage operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Document model error: {0}")]
    DocModel(#[from] doc_model::DocModelError),

    #[error("HTML error: {0}")]
    Html(#[from] HtmlError),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures while reading HTML
#[derive(Debug, Error)]
pub enum HtmlError {
    #[error("Malformed markup: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Document model error: {0}")]
    DocModel(#[from] doc_model::DocModelError),
}

pub type HtmlResult<T> = std::result::Result<T, HtmlError>;
