//! Relay server state: roster and event fanout

pub mod hub;
pub mod roster;

pub use hub::{ConnectionPhase, RelayConnection, RelayHub, RelayStats};
pub use roster::Roster;
