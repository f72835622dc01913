//! Edit Engine - commands, transactions and undo/redo
//!
//! Every edit is a [`Command`] that reads the committed tree and returns a
//! modified copy; [`EditingEngine`] commits the copy only when the command
//! succeeds. Table, endnote and spelling commands live here, along with the
//! background spell-check pipeline.

mod command;
mod executor;
mod undo;
mod error;
mod table_commands;
mod annotation_commands;
pub mod spellcheck_commands;
pub mod spellcheck_overlay;

pub use command::*;
pub use executor::*;
pub use undo::*;
pub use error::*;
pub use table_commands::*;
pub use annotation_commands::*;
pub use spellcheck_commands::{
    AcceptSuggestion, ApplyOverlays, IgnoreAll, IgnoreSuggestion, RevertOverlays,
};
pub use spellcheck_overlay::{
    CheckOutcome, OverlayState, SpellcheckConfig, SpellcheckPipeline, SpellcheckService,
};
