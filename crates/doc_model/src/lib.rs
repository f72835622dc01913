//! Document Model - the letter document tree
//!
//! This crate provides the in-memory document of the letter editor: a tree
//! of paragraphs, text runs, tables and inline markers keyed by stable node
//! ids, the table grid resolver, and the per-document endnote registry.

mod node;
mod node_id;
mod selection;
mod tree;
mod error;
mod flatten;
mod annotation;
pub mod table;
pub mod table_map;
pub mod text;

pub use node::*;
pub use node_id::*;
pub use selection::*;
pub use tree::*;
pub use error::*;
pub use flatten::*;
pub use annotation::*;
pub use table::*;
pub use table_map::*;
