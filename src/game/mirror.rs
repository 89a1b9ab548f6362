//! Mirrors of other participants, driven only by relayed events

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ws::protocol::{ConnectionId, PlayerDescriptor, PositionUpdate};

use super::physics::PhysicsWorld;
use super::player::Player;

/// Non-authoritative bodies keyed by connection id.
///
/// Transforms are overwritten by each update; the local solver may still
/// move them between updates.
#[derive(Debug, Default)]
pub struct RemotePlayers {
    players: HashMap<ConnectionId, Player>,
}

impl RemotePlayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// `playerConnected`: create a mirror unless one exists or the id is ours.
    /// Returns whether a mirror was created.
    pub fn on_connected(
        &mut self,
        world: &mut PhysicsWorld,
        descriptor: &PlayerDescriptor,
        local_id: Option<ConnectionId>,
        canvas_width: f32,
    ) -> bool {
        if Some(descriptor.id) == local_id || self.players.contains_key(&descriptor.id) {
            trace!(id = %descriptor.id, "Ignoring known player");
            return false;
        }

        let player = Player::spawn(world, descriptor, canvas_width);
        self.players.insert(descriptor.id, player);
        debug!(id = %descriptor.id, mirrors = self.players.len(), "Mirror created");
        true
    }

    /// `playerMove` / `playerPosition` / `playerJump`: teleport the matching
    /// mirror. Returns whether a mirror was updated.
    pub fn on_transform(
        &mut self,
        world: &mut PhysicsWorld,
        update: &PositionUpdate,
        local_id: Option<ConnectionId>,
    ) -> bool {
        if Some(update.id) == local_id {
            return false;
        }

        match self.players.get(&update.id) {
            Some(player) => {
                player.set_transform(world, update.x, update.y, update.angle);
                true
            }
            None => false,
        }
    }

    /// `playerDisconnected`: remove the mirror and its collider
    pub fn on_disconnected(&mut self, world: &mut PhysicsWorld, id: &ConnectionId) -> bool {
        match self.players.remove(id) {
            Some(player) => {
                player.despawn(world);
                debug!(id = %id, mirrors = self.players.len(), "Mirror removed");
                true
            }
            None => false,
        }
    }

    /// Remove every mirror (used when the connection is re-established)
    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        for (_, player) in self.players.drain() {
            player.despawn(world);
        }
    }

    pub fn set_canvas_width(&mut self, canvas_width: f32) {
        for player in self.players.values_mut() {
            player.canvas_width = canvas_width;
        }
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
