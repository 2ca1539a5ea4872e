use crate::model::{Stream, StreamPatch};
use crate::store::{keys, Slot, Store};

/// The persisted list of stream entries. Every change rewrites the whole list.
#[derive(Debug)]
pub struct StreamCollection {
    slot: Slot<Vec<Stream>>,
}

impl StreamCollection {
    pub fn open(store: &Store) -> Self {
        Self {
            slot: store.slot(keys::STREAMS, Vec::new()),
        }
    }

    pub fn all(&self) -> &[Stream] {
        self.slot.get()
    }

    pub fn get(&self, id: &str) -> Option<&Stream> {
        self.all().iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.all().is_empty()
    }

    /// Append. IDs are not checked for duplicates.
    pub fn add(&mut self, stream: Stream) {
        self.slot.update(|prev| {
            let mut next = prev.clone();
            next.push(stream);
            next
        });
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.slot.update(|prev| prev.iter().filter(|s| s.id != id).cloned().collect());
        true
    }

    /// Merge `patch` into the entry with `id`. Returns whether it existed.
    pub fn update(&mut self, id: &str, patch: StreamPatch) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.slot.update(|prev| {
            prev.iter()
                .cloned()
                .map(|mut s| {
                    if s.id == id {
                        s.apply(patch.clone());
                    }
                    s
                })
                .collect()
        });
        true
    }

    /// Insert by identity: an existing entry with the same ID is replaced in
    /// place (last write wins), otherwise the stream is appended.
    pub fn upsert(&mut self, stream: Stream) {
        self.slot.update(|prev| {
            let mut next = Vec::with_capacity(prev.len() + 1);
            let mut placed = false;
            for existing in prev {
                if existing.id != stream.id {
                    next.push(existing.clone());
                } else if !placed {
                    next.push(stream.clone());
                    placed = true;
                }
            }
            if !placed {
                next.push(stream);
            }
            next
        });
    }
}
