//! Per-provider request throttling.
//!
//! Every external provider owns its own [`Throttle`], so a saturated
//! provider queues its own callers without starving the others. Calls past
//! the budget wait in arrival order; nothing is dropped or reordered.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::sync::Mutex;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct Throttle {
    limiter: DirectLimiter,
    // governor alone does not order concurrent waiters; a fair mutex
    // hands the budget wait to callers in arrival order.
    queue: Mutex<()>,
}

impl Throttle {
    /// Budget of `max_per_second` calls per second (minimum 1).
    pub fn per_second(max_per_second: u32) -> Self {
        let rate = NonZeroU32::new(max_per_second).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(Quota::per_second(rate).allow_burst(rate))
    }

    /// Budget of one call per `period`. Falls back to 1/second when the
    /// period is zero.
    pub fn with_period(period: Duration) -> Self {
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));
        Self::with_quota(quota)
    }

    fn with_quota(quota: Quota) -> Self {
        Self {
            limiter: RateLimiter::direct(quota),
            queue: Mutex::new(()),
        }
    }

    /// Suspend until the budget allows another call. Callers proceed in
    /// the order they arrived.
    pub async fn acquire(&self) {
        let _slot = self.queue.lock().await;
        self.limiter.until_ready().await;
    }
}
