//! Connection registry
//!
//! The single source of truth for fan-out membership. The registry itself
//! is a plain owned structure; exclusive access comes from living inside
//! the `ChatServer` actor, which applies one operation at a time.

use std::collections::HashMap;

use crate::peer::PeerEntry;
use crate::types::ClientId;

#[derive(Debug)]
struct Slot {
    /// Registration order, used to keep snapshots stable
    seq: u64,
    entry: PeerEntry,
}

/// Live connections keyed by `ClientId`
#[derive(Debug, Default)]
pub struct Registry {
    peers: HashMap<ClientId, Slot>,
    next_seq: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer. Re-registering an existing id replaces the entry but
    /// keeps its original position.
    pub fn register(&mut self, entry: PeerEntry) {
        if let Some(slot) = self.peers.get_mut(&entry.id) {
            slot.entry = entry;
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.peers.insert(entry.id, Slot { seq, entry });
    }

    /// Change a peer's display name, returning the previous one
    pub fn rename(&mut self, id: ClientId, name: impl Into<String>) -> Option<String> {
        let slot = self.peers.get_mut(&id)?;
        Some(std::mem::replace(&mut slot.entry.name, name.into()))
    }

    /// Remove a peer. Removing an absent id is a no-op.
    pub fn unregister(&mut self, id: ClientId) -> Option<PeerEntry> {
        self.peers.remove(&id).map(|slot| slot.entry)
    }

    pub fn lookup(&self, id: ClientId) -> Option<&PeerEntry> {
        self.peers.get(&id).map(|slot| &slot.entry)
    }

    /// Point-in-time copy of all entries, in registration order
    pub fn snapshot(&self) -> Vec<(ClientId, PeerEntry)> {
        let mut slots: Vec<&Slot> = self.peers.values().collect();
        slots.sort_by_key(|slot| slot.seq);
        slots
            .into_iter()
            .map(|slot| (slot.entry.id, slot.entry.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
