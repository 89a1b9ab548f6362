//! Client-side game simulation
//!
//! Everything a client needs to take part without a browser: the physics
//! world, the floor, player bodies, remote mirrors and the frame loop that
//! turns input into outbound messages.

pub mod ground;
pub mod mirror;
pub mod physics;
pub mod player;
pub mod render;
pub mod session;

pub use ground::Ground;
pub use mirror::RemotePlayers;
pub use physics::PhysicsWorld;
pub use player::Player;
pub use session::{ClientSession, InputState, SessionConfig};
