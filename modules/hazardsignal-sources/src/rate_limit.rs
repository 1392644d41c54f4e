use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use tracing::warn;

/// Per-adapter request limiter: at most `max_requests` per `window`,
/// replenished evenly across the window. Each adapter owns one.
pub struct RateLimiter {
    max_requests: NonZeroU32,
    inner: governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl RateLimiter {
    pub const DEFAULT_MAX_REQUESTS: u32 = 30;
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

    /// A zero `max_requests` is treated as one.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let max_requests = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window / max_requests.get())
            .unwrap_or_else(|| Quota::per_second(max_requests))
            .allow_burst(max_requests);
        Self {
            max_requests,
            inner: governor::RateLimiter::direct(quota),
        }
    }

    /// Take one request slot. Returns false when the limit is hit.
    pub fn try_acquire(&self) -> bool {
        let allowed = self.inner.check().is_ok();
        if !allowed {
            warn!(limit = self.max_requests.get(), "Rate limit reached");
        }
        allowed
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_REQUESTS, Self::DEFAULT_WINDOW)
    }
}
