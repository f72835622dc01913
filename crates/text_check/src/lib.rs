//! Text Check - spelling service contract and offline backend
//!
//! The editor talks to any checker through [`TextChecker`]: plain text in,
//! flagged char ranges with suggestions out. [`DictionaryChecker`] is a
//! local word-list backend so the pipeline runs without a network service.

mod checker;
mod error;
mod words;
pub mod dictionary;

pub use checker::*;
pub use error::*;
pub use dictionary::{DictionaryChecker, IgnoreRules, Language};
