//! Per-plugin QPS limiting.
//!
//! The original server wrapped each registered plugin's execute closure
//! with a `go.uber.org/ratelimit` limiter when `QPS > 0`. `governor` is this
//! pack's equivalent token-bucket crate (seen in `other_examples/manifests`
//! for the same purpose).

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// A plugin's rate limiter, or the absence of one (`qps == 0` disables
/// limiting entirely, matching the Go source's `if qps > 0` guard).
pub type PluginLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Builds a limiter for the given QPS, or `None` if QPS limiting is
/// disabled for this plugin.
pub fn build_limiter(qps: u32) -> Option<Arc<PluginLimiter>> {
	let qps = NonZeroU32::new(qps)?;
	Some(Arc::new(RateLimiter::direct(Quota::per_second(qps))))
}
