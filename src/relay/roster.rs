//! Relay-owned roster of announced players

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::ws::protocol::{ConnectionId, PlayerDescriptor};

/// Connection id -> descriptor as first announced in `newPlayer`.
///
/// Position events never touch the roster, so replayed entries carry the
/// spawn transform rather than the player's current one.
#[derive(Debug, Default)]
pub struct Roster {
    players: RwLock<HashMap<ConnectionId, PlayerDescriptor>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry keyed by `descriptor.id`
    pub fn insert(&self, descriptor: PlayerDescriptor) -> Option<PlayerDescriptor> {
        self.players.write().insert(descriptor.id, descriptor)
    }

    pub fn remove(&self, id: &ConnectionId) -> Option<PlayerDescriptor> {
        self.players.write().remove(id)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<PlayerDescriptor> {
        self.players.read().get(id).cloned()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.players.read().contains_key(id)
    }

    /// Visit every entry except the requester's own while holding the read
    /// lock; inserts and removals wait until `f` has seen every entry.
    /// Returns the number of entries visited.
    pub fn for_each_other<F>(&self, requester: &ConnectionId, mut f: F) -> usize
    where
        F: FnMut(&PlayerDescriptor),
    {
        let players = self.players.read();
        let mut count = 0;
        for descriptor in players.values().filter(|p| p.id != *requester) {
            f(descriptor);
            count += 1;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.players.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.read().is_empty()
    }
}
