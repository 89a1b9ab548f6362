//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-connection inbound limiter; a limit of 0 lets everything through
pub struct ConnectionRateLimiter {
    limiter: Option<Limiter>,
}

impl ConnectionRateLimiter {
    pub fn new(frames_per_second: u32) -> Self {
        Self {
            limiter: NonZeroU32::new(frames_per_second)
                .map(|n| RateLimiter::direct(Quota::per_second(n))),
        }
    }

    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    /// Check if an inbound frame is allowed (returns true if allowed)
    pub fn check(&self) -> bool {
        self.limiter
            .as_ref()
            .map_or(true, |limiter| limiter.check().is_ok())
    }
}

impl Default for ConnectionRateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}
