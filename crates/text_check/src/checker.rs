//! The checking contract shared by every backend

use crate::Result;
use serde::{Deserialize, Serialize};

/// One flagged span of the checked text. Offsets count chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckMatch {
    pub offset: usize,
    pub length: usize,
    /// Replacement candidates, best first. May be empty.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl CheckMatch {
    pub fn new(offset: usize, length: usize) -> Self {
        Self {
            offset,
            length,
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestions(offset: usize, length: usize, suggestions: Vec<String>) -> Self {
        Self {
            offset,
            length,
            suggestions,
        }
    }

    /// Char offset one past the flagged span
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// True if the two spans share at least one char
    pub fn overlaps(&self, other: &CheckMatch) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// A spelling/grammar service.
///
/// Implementations may be remote; callers must not hold locks across the
/// returned future.
#[trait_variant::make(Send)]
pub trait TextChecker: Send + Sync {
    /// Check plain text and return the flagged spans
    async fn check(&self, text: &str) -> Result<Vec<CheckMatch>>;
}
