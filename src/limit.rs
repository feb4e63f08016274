//! Rolling-window rate limiting for outbound API calls.
//!
//! [`RateLimiter`] grants at most `permits` calls inside any window of the configured
//! length. Grant timestamps live in a deque: [`RateLimiter::acquire`] prunes entries
//! that have left the window, grants immediately while the budget allows, and
//! otherwise sleeps until the oldest grant ages out. Waiters wake in best-effort
//! order rather than strict FIFO.

// std
use std::{collections::VecDeque, time::Duration};
// crates.io
use tokio::time::Instant;
use tracing::trace;
// self
use crate::_prelude::*;

/// Shared rolling-window rate limiter.
///
/// One instance gates every task that dials the same upstream host; share it behind
/// [`Arc`]. Acquisition never fails and never drops a caller, it suspends until a
/// permit frees up.
#[derive(Debug)]
pub struct RateLimiter {
	permits: usize,
	window: Duration,
	grants: Mutex<VecDeque<Instant>>,
}
impl RateLimiter {
	/// Creates a limiter allowing `permits` grants per rolling `window`.
	///
	/// A zero permit budget would suspend every caller forever, so it is clamped to
	/// one.
	pub fn new(permits: usize, window: Duration) -> Self {
		let permits = permits.max(1);

		Self { permits, window, grants: Mutex::new(VecDeque::with_capacity(permits)) }
	}

	/// Returns the permit budget per window.
	pub fn permits(&self) -> usize {
		self.permits
	}

	/// Returns the rolling window length.
	pub fn window(&self) -> Duration {
		self.window
	}

	/// Obtains a permit, suspending until one is available.
	pub async fn acquire(&self) {
		loop {
			let wait = {
				let now = Instant::now();
				let mut grants = self.grants.lock();

				while grants.front().is_some_and(|&oldest| now - oldest >= self.window) {
					grants.pop_front();
				}

				if grants.len() < self.permits {
					grants.push_back(now);

					return;
				}

				// The deque is full, so the front entry is the next to age out.
				self.window - (now - grants[0])
			};

			trace!(wait_ms = wait.as_millis() as u64, "Waiting for window rollover");

			tokio::time::sleep(wait).await;
		}
	}
}
