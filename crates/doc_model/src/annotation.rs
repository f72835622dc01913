//! Endnote registry
//!
//! Each open document owns one [`AnnotationRegistry`]. It allocates endnote
//! ids and holds the out-of-band note values that inline
//! [`AnnotationMarker`](crate::AnnotationMarker)s refer to by id.

use crate::anchor_ref_for;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `{id, text, value}` triple exchanged with document metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndnoteEntry {
    pub id: u32,
    pub text: String,
    #[serde(default)]
    pub value: String,
}

impl EndnoteEntry {
    pub fn new(id: u32, text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            value: value.into(),
        }
    }
}

/// Registry record for one endnote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    pub reference_text: String,
    pub value: String,
    pub anchor_ref: String,
}

/// Id allocator and value store for a document's endnotes.
///
/// `next_id` is always greater than every id present. Ids are not handed out
/// twice, even after [`remove`](Self::remove); only [`reset`](Self::reset)
/// starts over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRegistry {
    next_id: u32,
    entries: BTreeMap<u32, AnnotationEntry>,
}

impl Default for AnnotationRegistry {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }
}

impl AnnotationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset and seed from a saved document's endnote list
    pub fn initialize_from_document<'a>(&mut self, entries: impl IntoIterator<Item = &'a EndnoteEntry>) {
        self.reset();
        for entry in entries {
            self.register(entry.id, entry.text.clone(), entry.value.clone());
        }
    }

    /// Hand out the next free id
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Insert or overwrite an entry, raising `next_id` past `id`
    pub fn register(&mut self, id: u32, reference_text: impl Into<String>, value: impl Into<String>) {
        if id == 0 {
            tracing::warn!("Ignoring endnote registration with id 0");
            return;
        }
        self.entries.insert(
            id,
            AnnotationEntry {
                reference_text: reference_text.into(),
                value: value.into(),
                anchor_ref: anchor_ref_for(id),
            },
        );
        if id >= self.next_id {
            self.next_id = id.saturating_add(1);
        }
    }

    /// Change the value of an existing entry. Returns false if absent.
    pub fn update(&mut self, id: u32, value: impl Into<String>) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.value = value.into();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: u32) -> Option<AnnotationEntry> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: u32) -> Option<&AnnotationEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    /// All entries, ascending by id
    pub fn all_entries(&self) -> Vec<EndnoteEntry> {
        self.entries
            .iter()
            .map(|(&id, entry)| EndnoteEntry::new(id, entry.reference_text.clone(), entry.value.clone()))
            .collect()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.next_id = 1;
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_allocate_starts_at_one() {
        let mut registry = AnnotationRegistry::new();
        assert_eq!(registry.allocate_id(), 1);
        assert_eq!(registry.allocate_id(), 2);
        assert_eq!(registry.next_id(), 3);
    }

    #[test]
    fn test_register_raises_next_id() {
        let mut registry = AnnotationRegistry::new();
        registry.register(10, "receipt", "Form I-797");
        assert_eq!(registry.next_id(), 11);

        // Lower ids do not move the counter back
        registry.register(4, "petition", "");
        assert_eq!(registry.next_id(), 11);
        assert_eq!(registry.allocate_id(), 11);
        assert_eq!(registry.get(10).map(|e| e.anchor_ref.as_str()), Some("endnote-ref-10"));
    }

    #[test]
    fn test_update_and_remove() {
        let mut registry = AnnotationRegistry::new();
        let id = registry.allocate_id();
        registry.register(id, "receipt", "");

        assert!(registry.update(id, "Receipt notice dated 2024-01-05"));
        assert_eq!(registry.get(id).map(|e| e.value.as_str()), Some("Receipt notice dated 2024-01-05"));
        assert!(!registry.update(99, "missing"));
        assert!(!registry.contains(99));

        assert!(registry.remove(id).is_some());
        assert!(registry.is_empty());
        // Removed ids are not reused
        assert_eq!(registry.allocate_id(), id + 1);
    }

    #[test]
    fn test_initialize_from_document() {
        let mut registry = AnnotationRegistry::new();
        registry.allocate_id();
        registry.allocate_id();
        registry.allocate_id();

        let saved = vec![
            EndnoteEntry::new(5, "visa", "B-2"),
            EndnoteEntry::new(2, "passport", "Expires 2030"),
        ];
        registry.initialize_from_document(&saved);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.next_id(), 6);
        let ids: Vec<u32> = registry.all_entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 5]);
    }

    #[test]
    fn test_reset() {
        let mut registry = AnnotationRegistry::new();
        registry.register(3, "a", "b");
        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(registry.allocate_id(), 1);
    }

    #[test]
    fn test_register_zero_is_ignored() {
        let mut registry = AnnotationRegistry::new();
        registry.register(0, "x", "");
        assert!(registry.is_empty());
        assert_eq!(registry.next_id(), 1);
    }

    proptest! {
        #[test]
        fn prop_allocated_ids_strictly_increase(seed in prop::collection::vec(1u32..500, 0..10), n in 1usize..60) {
            let mut registry = AnnotationRegistry::new();
            for id in &seed {
                registry.register(*id, "seed", "");
            }
            let ids: Vec<u32> = (0..n).map(|_| registry.allocate_id()).collect();
            for pair in ids.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            for id in &seed {
                prop_assert!(!ids.contains(id));
            }
        }

        #[test]
        fn prop_register_advances_past_id(start in 0u32..50, id in 1u32..10_000) {
            let mut registry = AnnotationRegistry::new();
            for _ in 0..start {
                registry.allocate_id();
            }
            let before = registry.next_id();
            registry.register(id, "text", "value");
            if id >= before {
                prop_assert_eq!(registry.next_id(), id + 1);
            } else {
                prop_assert_eq!(registry.next_id(), before);
            }
        }
    }
}
