//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier the relay assigns to a connection when it opens
pub type ConnectionId = Uuid;

/// Longest accepted color string, in bytes
pub const MAX_COLOR_LEN: usize = 32;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Announce the local player; the relay stamps the connection id
    NewPlayer(PlayerSpawn),

    /// Ask for every other player currently in the roster
    ShowPlayers,

    /// Full transform of the sender's player
    PlayerMove(PositionUpdate),

    /// Position-only update
    PlayerPosition(PositionUpdate),

    /// Transform at the moment of a jump
    PlayerJump(PositionUpdate),
}

impl ClientMsg {
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMsg::NewPlayer(_) => "newPlayer",
            ClientMsg::ShowPlayers => "showPlayers",
            ClientMsg::PlayerMove(_) => "playerMove",
            ClientMsg::PlayerPosition(_) => "playerPosition",
            ClientMsg::PlayerJump(_) => "playerJump",
        }
    }

    /// Shape checks applied at the transport boundary before dispatch
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            ClientMsg::NewPlayer(spawn) => spawn.validate(),
            ClientMsg::ShowPlayers => Ok(()),
            ClientMsg::PlayerMove(update)
            | ClientMsg::PlayerPosition(update)
            | ClientMsg::PlayerJump(update) => update.validate(),
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMsg {
    /// First frame on every connection: tells the client its own id
    Welcome(Welcome),

    /// A player joined (or roster replay for `showPlayers`)
    PlayerConnected(PlayerDescriptor),

    PlayerMove(PositionUpdate),
    PlayerPosition(PositionUpdate),
    PlayerJump(PositionUpdate),

    /// Connection id of the player that left
    PlayerDisconnected(ConnectionId),
}

impl ServerMsg {
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMsg::Welcome(_) => "welcome",
            ServerMsg::PlayerConnected(_) => "playerConnected",
            ServerMsg::PlayerMove(_) => "playerMove",
            ServerMsg::PlayerPosition(_) => "playerPosition",
            ServerMsg::PlayerJump(_) => "playerJump",
            ServerMsg::PlayerDisconnected(_) => "playerDisconnected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
    pub id: ConnectionId,
    /// Server clock in Unix milliseconds
    pub server_time: u64,
}

/// Player entry as stored in the roster and sent in `playerConnected`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDescriptor {
    pub id: ConnectionId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Rotation in radians
    pub angle: f32,
    /// CSS color, e.g. `#a1b2c3`
    pub color: String,
}

/// Body of `newPlayer`. Any `id` the client sends is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSpawn {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub angle: f32,
    pub color: String,
}

impl PlayerSpawn {
    /// Attach the relay-assigned id
    pub fn into_descriptor(self, id: ConnectionId) -> PlayerDescriptor {
        PlayerDescriptor {
            id,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            angle: self.angle,
            color: self.color,
        }
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        check_finite("x", self.x)?;
        check_finite("y", self.y)?;
        check_finite("width", self.width)?;
        check_finite("height", self.height)?;
        check_finite("angle", self.angle)?;

        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(ProtocolError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        if self.color.is_empty() || self.color.len() > MAX_COLOR_LEN {
            return Err(ProtocolError::InvalidColor(self.color.len()));
        }

        Ok(())
    }
}

impl From<&PlayerDescriptor> for PlayerSpawn {
    fn from(d: &PlayerDescriptor) -> Self {
        Self {
            x: d.x,
            y: d.y,
            width: d.width,
            height: d.height,
            angle: d.angle,
            color: d.color.clone(),
        }
    }
}

/// Ephemeral transform update, relayed but never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub id: ConnectionId,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
}

impl PositionUpdate {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        check_finite("x", self.x)?;
        check_finite("y", self.y)?;
        if let Some(angle) = self.angle {
            check_finite("angle", angle)?;
        }
        Ok(())
    }
}

fn check_finite(field: &'static str, value: f32) -> Result<(), ProtocolError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ProtocolError::NonFinite(field))
    }
}

/// Parse and validate one inbound text frame
pub fn decode_client_msg(text: &str) -> Result<ClientMsg, ProtocolError> {
    let msg: ClientMsg = serde_json::from_str(text)?;
    msg.validate()?;
    Ok(msg)
}

/// Frame rejected at the transport boundary
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Field {0} is not a finite number")]
    NonFinite(&'static str),

    #[error("Invalid player dimensions {width}x{height}")]
    InvalidDimensions { width: f32, height: f32 },

    #[error("Invalid color string ({0} bytes)")]
    InvalidColor(usize),
}
