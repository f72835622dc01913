//! Error types for text checking

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Checker unavailable: {0}")]
    Unavailable(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid word list: {0}")]
    InvalidWordList(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CheckError>;
