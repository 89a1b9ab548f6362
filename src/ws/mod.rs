//! WebSocket transport: wire types and connection handler

pub mod handler;
pub mod protocol;

pub use handler::ws_handler;
pub use protocol::{ClientMsg, ConnectionId, PlayerDescriptor, PositionUpdate, ServerMsg};
