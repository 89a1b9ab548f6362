//! Platformer relay
//!
//! Real-time multiplayer platformer plumbing:
//! - `relay`: the WebSocket fanout hub. Assigns connection ids, keeps a roster
//!   of announced players and rebroadcasts client-asserted state.
//! - `ws`: wire types and the per-connection read/write loop
//! - `http`: router with health check, static assets and CORS
//! - `game`: client-side simulation (physics world, ground, players, remote
//!   mirrors, frame loop) used by the headless bot client and the tests

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod relay;
pub mod util;
pub mod ws;
