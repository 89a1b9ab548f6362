//! Relay hub - connection table, roster and event fanout

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::util::time::unix_millis;
use crate::ws::protocol::{
    ClientMsg, ConnectionId, PlayerSpawn, PositionUpdate, ServerMsg, Welcome,
};

use super::roster::Roster;

/// Lifecycle of a single connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Open, no `newPlayer` seen yet
    Connected,
    /// Announced a player and sits in the roster
    Active,
    /// Closed (terminal)
    Disconnected,
}

/// Per-connection outbound side
struct Peer {
    tx: mpsc::Sender<ServerMsg>,
    phase: ConnectionPhase,
}

/// Handle returned to the transport when a connection opens
pub struct RelayConnection {
    pub id: ConnectionId,
    /// Messages queued for this connection, in send order
    pub outbound: mpsc::Receiver<ServerMsg>,
}

/// Counters for the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub connections: usize,
    pub roster_size: usize,
}

/// Fanout hub shared by every connection handler.
///
/// Broadcast scopes: `playerConnected` goes to everyone except the announcing
/// connection, position events go to everyone including the sender,
/// `playerDisconnected` goes to every remaining connection.
pub struct RelayHub {
    roster: Roster,
    peers: DashMap<ConnectionId, Peer>,
    strict_ids: bool,
    outbound_buffer: usize,
}

impl RelayHub {
    pub fn new(strict_ids: bool, outbound_buffer: usize) -> Self {
        Self {
            roster: Roster::new(),
            peers: DashMap::new(),
            strict_ids,
            outbound_buffer: outbound_buffer.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.strict_ids, config.outbound_buffer)
    }

    /// Register a new connection and queue its welcome frame
    pub fn connect(&self) -> RelayConnection {
        let id = Uuid::new_v4();
        let (tx, outbound) = mpsc::channel(self.outbound_buffer);

        // Welcome must be queued before the peer is visible to broadcasts
        deliver(
            id,
            &tx,
            ServerMsg::Welcome(Welcome {
                id,
                server_time: unix_millis(),
            }),
        );

        self.peers.insert(
            id,
            Peer {
                tx,
                phase: ConnectionPhase::Connected,
            },
        );

        info!(connection_id = %id, connections = self.peers.len(), "Connection registered");
        RelayConnection { id, outbound }
    }

    /// Dispatch one validated inbound message from `from`
    pub fn handle(&self, from: ConnectionId, msg: ClientMsg) {
        if !self.peers.contains_key(&from) {
            debug!(connection_id = %from, event = msg.event_name(), "Message from closed connection, ignoring");
            return;
        }

        match msg {
            ClientMsg::NewPlayer(spawn) => self.handle_new_player(from, spawn),
            ClientMsg::ShowPlayers => self.handle_show_players(from),
            ClientMsg::PlayerMove(update) => {
                let update = self.stamp(from, update);
                self.broadcast(ServerMsg::PlayerMove(update), None);
            }
            ClientMsg::PlayerPosition(update) => {
                let update = self.stamp(from, update);
                self.broadcast(ServerMsg::PlayerPosition(update), None);
            }
            ClientMsg::PlayerJump(update) => {
                let update = self.stamp(from, update);
                self.broadcast(ServerMsg::PlayerJump(update), None);
            }
        }
    }

    /// Drop the connection, clear its roster entry and tell everyone else
    pub fn disconnect(&self, id: ConnectionId) {
        // Dropping the peer closes its outbound queue
        if self.peers.remove(&id).is_none() {
            debug!(connection_id = %id, "Disconnect for unknown connection");
            return;
        }

        // Roster entry goes first: replays running after this point no longer
        // see it, replays that saw it have already enqueued it
        let was_announced = self.roster.remove(&id).is_some();
        self.broadcast(ServerMsg::PlayerDisconnected(id), None);

        info!(
            connection_id = %id,
            was_announced,
            connections = self.peers.len(),
            "Connection closed"
        );
    }

    /// Current phase; connections no longer registered report `Disconnected`
    pub fn phase(&self, id: &ConnectionId) -> ConnectionPhase {
        self.peers
            .get(id)
            .map(|p| p.phase)
            .unwrap_or(ConnectionPhase::Disconnected)
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            connections: self.peers.len(),
            roster_size: self.roster.len(),
        }
    }

    fn handle_new_player(&self, from: ConnectionId, spawn: PlayerSpawn) {
        let descriptor = spawn.into_descriptor(from);
        if self.roster.insert(descriptor.clone()).is_some() {
            warn!(connection_id = %from, "Player announced twice, replacing roster entry");
        }

        if let Some(mut peer) = self.peers.get_mut(&from) {
            peer.phase = ConnectionPhase::Active;
        }

        info!(
            connection_id = %from,
            x = descriptor.x,
            y = descriptor.y,
            color = %descriptor.color,
            "Player joined"
        );

        self.broadcast(ServerMsg::PlayerConnected(descriptor), Some(from));
    }

    fn handle_show_players(&self, from: ConnectionId) {
        let Some(tx) = self.peers.get(&from).map(|peer| peer.tx.clone()) else {
            return;
        };

        // Enqueued under the roster lock so a concurrent disconnect's
        // playerDisconnected always lands after the replayed entry
        let count = self.roster.for_each_other(&from, |descriptor| {
            deliver(from, &tx, ServerMsg::PlayerConnected(descriptor.clone()));
        });

        debug!(connection_id = %from, count, "Replayed roster");
    }

    fn stamp(&self, from: ConnectionId, mut update: PositionUpdate) -> PositionUpdate {
        if self.strict_ids && update.id != from {
            debug!(connection_id = %from, claimed = %update.id, "Overwriting foreign id");
            update.id = from;
        }
        update
    }

    fn broadcast(&self, msg: ServerMsg, exclude: Option<ConnectionId>) {
        trace!(event = msg.event_name(), peers = self.peers.len(), "Broadcast");
        for entry in self.peers.iter() {
            if Some(*entry.key()) == exclude {
                continue;
            }
            deliver(*entry.key(), &entry.value().tx, msg.clone());
        }
    }
}

/// Best-effort enqueue; a full or closed queue drops the message
fn deliver(to: ConnectionId, tx: &mpsc::Sender<ServerMsg>, msg: ServerMsg) {
    match tx.try_send(msg) {
        Ok(()) => {}
        Err(TrySendError::Full(msg)) => {
            warn!(connection_id = %to, event = msg.event_name(), "Outbound queue full, dropping message");
        }
        Err(TrySendError::Closed(_)) => {
            debug!(connection_id = %to, "Outbound queue closed");
        }
    }
}
