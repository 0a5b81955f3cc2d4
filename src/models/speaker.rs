use std::collections::HashMap;

/// Key for one locally-tagged speaker: the part's sequence number plus the
/// local tag literal. Identity is never assumed across parts, so two parts
/// using the same local tag stay distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpeakerKey {
    pub sequence: u32,
    pub local_id: String,
}

impl SpeakerKey {
    pub fn new(sequence: u32, local_id: impl Into<String>) -> Self {
        Self {
            sequence,
            local_id: local_id.into(),
        }
    }
}

/// Mapping from per-part local speaker tags to dense global numbers,
/// assigned in first-seen order starting at 1. Built once per combine and
/// discarded after use; threaded through the unification fold as a value.
#[derive(Debug, Clone, Default)]
pub struct SpeakerMap {
    assignments: HashMap<SpeakerKey, u32>,
    next_id: u32,
}

impl SpeakerMap {
    pub fn new() -> Self {
        Self {
            assignments: HashMap::new(),
            next_id: 1,
        }
    }

    /// Global id for the key, assigning the next free number on first sight
    pub fn assign(&mut self, key: SpeakerKey) -> u32 {
        if let Some(&id) = self.assignments.get(&key) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.assignments.insert(key, id);
        id
    }

    pub fn get(&self, key: &SpeakerKey) -> Option<u32> {
        self.assignments.get(key).copied()
    }

    /// Number of distinct speakers assigned so far
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
