//! HTML import and export
//!
//! HTML is the letter body's storage format. Endnote values travel both
//! inline (as `data-endnote-value`) and in the letter's metadata, so either
//! source can restore them.

mod reader;
mod writer;

pub use reader::import_html;
pub use writer::{export_html, HtmlWriter};
