//! Name-keyed cross-reference from entities to their descriptor handles.
//!
//! Populated by the creation and enumeration probes; consulted by the
//! processing exit handler to resolve an entity's primary value field.
//! Entries are overwritten on duplicate creation (last writer wins) and
//! never explicitly deleted: the table lives for the monitored process's
//! duration.

use std::collections::HashMap;

use crate::layout::EntrySnapshot;
use crate::name::EntityName;

#[derive(Debug, Default)]
pub(crate) struct EntityRegistry {
    entries: HashMap<EntityName, EntrySnapshot>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: EntityName, entry: EntrySnapshot) {
        if name.is_empty() {
            return;
        }
        self.entries.insert(name, entry);
    }

    pub fn lookup(&self, name: &EntityName) -> Option<EntrySnapshot> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
