//! Time utilities for the relay and client frame loop

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Display refresh rate the client loop targets
pub const CLIENT_FPS: u32 = 60;

/// Physics step for one client frame (in seconds)
pub fn frame_delta(fps: u32) -> f32 {
    1.0 / fps.max(1) as f32
}

/// Wall-clock interval between client frames
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_micros(1_000_000 / fps.max(1) as u64)
}
