//! Session records: one actor's binary interaction vector.

use serde::{Deserialize, Serialize};

/// Binary visit flags, one per entity column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisitVector {
    flags: Vec<bool>,
}

impl VisitVector {
    /// All-zero vector over `len` entities.
    pub fn empty(len: usize) -> Self {
        Self {
            flags: vec![false; len],
        }
    }

    pub fn from_flags(flags: Vec<bool>) -> Self {
        Self { flags }
    }

    pub(crate) fn mark(&mut self, idx: usize) {
        if let Some(flag) = self.flags.get_mut(idx) {
            *flag = true;
        }
    }

    /// Number of entity columns.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn is_visited(&self, idx: usize) -> bool {
        self.flags.get(idx).copied().unwrap_or(false)
    }

    /// Number of visited entities.
    pub fn count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    /// Indices of visited entities in column order.
    pub fn visited_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter_map(|(idx, &f)| f.then_some(idx))
    }

    /// Flags as 0/1 values.
    pub fn as_binary(&self) -> Vec<u8> {
        self.flags.iter().map(|&f| u8::from(f)).collect()
    }
}

/// One actor's realized session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub actor_id: String,
    pub segment_id: String,
    pub visits: VisitVector,
}

/// Sessions sharing one ordered set of entity columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionTable {
    pub entity_ids: Vec<String>,
    pub sessions: Vec<Session>,
}

impl SessionTable {
    pub fn new(entity_ids: Vec<String>, sessions: Vec<Session>) -> Self {
        Self {
            entity_ids,
            sessions,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Column position of an entity id.
    pub fn entity_index(&self, id: &str) -> Option<usize> {
        self.entity_ids.iter().position(|e| e == id)
    }
}
