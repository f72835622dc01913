//! Store - Letter persistence and settings
//!
//! This crate handles HTML import/export of the letter body, the endnote
//! metadata sidecar that travels with it, and editor settings.

mod error;
mod metadata;
mod settings;
pub mod html;

pub use error::*;
pub use metadata::*;
pub use settings::*;
pub use html::{export_html, import_html};
