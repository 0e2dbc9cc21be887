// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixed-window rate limiting keyed by (scope, client key).
//!
//! Each scope (`auth`, `gate:unlock`, `gate:change`, ...) tracks its own
//! buckets, so quotas are independent. The first request in a window
//! creates the bucket with `count = 1`; requests within the window
//! increment; once the count passes the limit the request is rejected
//! with the seconds remaining until the window resets. The counter stops
//! at `limit + 1` - rejected requests are not counted further.
//!
//! # Thread Safety
//!
//! The whole check-and-increment runs as one step under a mutex, so two
//! concurrent callers can never both take the last slot of a window.
//!
//! # Memory Management
//!
//! Expired buckets are swept every `sweep_interval` checks, and
//! `max_tracked_keys` caps the map outright. When the cap is hit and
//! sweeping frees nothing, requests for new keys are rejected - the
//! limiter fails closed rather than growing without bound.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Configuration for the rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
	/// How often to sweep expired buckets (every N checks).
	pub sweep_interval: u64,

	/// Hard cap on tracked (scope, client key) pairs.
	pub max_tracked_keys: usize,
}

impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			sweep_interval: 100,
			max_tracked_keys: 10_000,
		}
	}
}

/// The outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
	pub allowed: bool,
	/// Seconds until the window resets; zero when allowed, positive when
	/// rejected.
	pub retry_after_secs: u64,
}

impl Decision {
	fn allowed() -> Self {
		Self {
			allowed: true,
			retry_after_secs: 0,
		}
	}

	fn rejected(retry_after: Duration) -> Self {
		// Round up so callers never retry inside the same window.
		let mut secs = retry_after.as_secs();
		if retry_after.subsec_nanos() > 0 || secs == 0 {
			secs += 1;
		}
		Self {
			allowed: false,
			retry_after_secs: secs,
		}
	}
}

struct Bucket {
	window_start: Instant,
	count: u32,
	limit: u32,
	window: Duration,
}

impl Bucket {
	fn expired(&self, now: Instant) -> bool {
		now.duration_since(self.window_start) >= self.window
	}
}

/// In-memory fixed-window rate limiter.
///
/// Explicitly constructed and handed to request handlers; tests build
/// isolated instances.
pub struct RateLimiter {
	config: RateLimitConfig,
	buckets: Mutex<HashMap<(String, String), Bucket>>,
	check_count: AtomicU64,
}

impl RateLimiter {
	/// Creates a new rate limiter with the given configuration.
	pub fn new(config: RateLimitConfig) -> Self {
		Self {
			config,
			buckets: Mutex::new(HashMap::new()),
			check_count: AtomicU64::new(0),
		}
	}

	/// Check and record a request for (scope, client key).
	///
	/// `limit` requests are allowed per `window_secs`-second fixed window;
	/// the decision and the counter update happen atomically.
	pub fn check(&self, scope: &str, client_key: &str, limit: u32, window_secs: u64) -> Decision {
		let now = Instant::now();
		let window = Duration::from_secs(window_secs);

		let checks = self.check_count.fetch_add(1, Ordering::Relaxed);

		let mut buckets = self
			.buckets
			.lock()
			.unwrap_or_else(PoisonError::into_inner);

		if checks > 0 && checks % self.config.sweep_interval == 0 {
			sweep(&mut buckets, now);
		}

		let key = (scope.to_string(), client_key.to_string());

		if let Some(bucket) = buckets.get_mut(&key) {
			// The quota is the caller's per-call contract; refresh it so a
			// config change takes effect without waiting out the window.
			bucket.limit = limit;
			bucket.window = window;

			if bucket.expired(now) {
				bucket.window_start = now;
				bucket.count = 1;
			} else if bucket.count <= bucket.limit {
				// The counter saturates at limit + 1; rejected requests are
				// observed, not accumulated.
				bucket.count += 1;
			}

			if bucket.count > bucket.limit {
				let elapsed = now.duration_since(bucket.window_start);
				let retry_after = bucket.window.saturating_sub(elapsed);
				tracing::warn!(scope, count = bucket.count, limit, "rate limit exceeded");
				return Decision::rejected(retry_after);
			}

			return Decision::allowed();
		}

		if buckets.len() >= self.config.max_tracked_keys {
			sweep(&mut buckets, now);

			if buckets.len() >= self.config.max_tracked_keys {
				tracing::warn!(
					scope,
					tracked = buckets.len(),
					"rejecting new client: tracked key limit reached"
				);
				return Decision::rejected(window);
			}
		}

		let bucket = Bucket {
			window_start: now,
			count: 1,
			limit,
			window,
		};
		let over_quota = bucket.count > bucket.limit;
		buckets.insert(key, bucket);

		if over_quota {
			// A zero limit closes the scope entirely.
			return Decision::rejected(window);
		}

		Decision::allowed()
	}

	/// Drop every expired bucket now.
	pub fn sweep_expired(&self) {
		let mut buckets = self
			.buckets
			.lock()
			.unwrap_or_else(PoisonError::into_inner);
		sweep(&mut buckets, Instant::now());
	}

	/// Number of live buckets, for monitoring.
	pub fn tracked_keys(&self) -> usize {
		self
			.buckets
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.len()
	}
}

impl Default for RateLimiter {
	fn default() -> Self {
		Self::new(RateLimitConfig::default())
	}
}

fn sweep(buckets: &mut HashMap<(String, String), Bucket>, now: Instant) {
	buckets.retain(|_, bucket| !bucket.expired(now));
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{Arc, Barrier};
	use std::thread;

	fn limiter() -> RateLimiter {
		RateLimiter::default()
	}

	#[test]
	fn allows_up_to_limit() {
		let limiter = limiter();

		for _ in 0..5 {
			assert!(limiter.check("auth", "10.0.0.1", 5, 60).allowed);
		}
	}

	#[test]
	fn rejects_above_limit_with_retry_after() {
		let limiter = limiter();

		for _ in 0..3 {
			assert!(limiter.check("auth", "10.0.0.1", 3, 60).allowed);
		}

		let decision = limiter.check("auth", "10.0.0.1", 3, 60);
		assert!(!decision.allowed);
		assert!(decision.retry_after_secs > 0);
		assert!(decision.retry_after_secs <= 60);
	}

	#[test]
	fn zero_limit_closes_the_scope() {
		let limiter = limiter();

		let decision = limiter.check("auth", "10.0.0.1", 0, 60);
		assert!(!decision.allowed);
		assert!(decision.retry_after_secs > 0);

		assert!(!limiter.check("auth", "10.0.0.1", 0, 60).allowed);
	}

	#[test]
	fn rejections_do_not_accumulate() {
		let limiter = limiter();

		for _ in 0..2 {
			limiter.check("auth", "10.0.0.1", 2, 1);
		}
		// Hammer well past the limit; the bucket must still reset on time.
		for _ in 0..50 {
			assert!(!limiter.check("auth", "10.0.0.1", 2, 1).allowed);
		}

		thread::sleep(Duration::from_millis(1100));
		assert!(limiter.check("auth", "10.0.0.1", 2, 1).allowed);
	}

	#[test]
	fn window_elapse_resets_count() {
		let limiter = limiter();

		assert!(limiter.check("auth", "10.0.0.1", 1, 1).allowed);
		assert!(!limiter.check("auth", "10.0.0.1", 1, 1).allowed);

		thread::sleep(Duration::from_millis(1100));

		assert!(limiter.check("auth", "10.0.0.1", 1, 1).allowed);
	}

	#[test]
	fn scopes_have_independent_quotas() {
		let limiter = limiter();

		assert!(limiter.check("auth", "10.0.0.1", 1, 60).allowed);
		assert!(!limiter.check("auth", "10.0.0.1", 1, 60).allowed);

		// Same client, different scope: fresh quota.
		assert!(limiter.check("gate:change", "10.0.0.1", 1, 60).allowed);
	}

	#[test]
	fn clients_have_independent_quotas() {
		let limiter = limiter();

		assert!(limiter.check("auth", "10.0.0.1", 1, 60).allowed);
		assert!(!limiter.check("auth", "10.0.0.1", 1, 60).allowed);

		assert!(limiter.check("auth", "10.0.0.2", 1, 60).allowed);
	}

	#[test]
	fn concurrent_requests_never_exceed_limit() {
		let limit = 10u32;
		let extra = 5;
		let limiter = Arc::new(limiter());
		let barrier = Arc::new(Barrier::new((limit + extra) as usize));

		let handles: Vec<_> = (0..limit + extra)
			.map(|_| {
				let limiter = Arc::clone(&limiter);
				let barrier = Arc::clone(&barrier);
				thread::spawn(move || {
					barrier.wait();
					limiter.check("auth", "10.0.0.1", limit, 60).allowed
				})
			})
			.collect();

		let allowed = handles
			.into_iter()
			.map(|h| h.join().unwrap())
			.filter(|allowed| *allowed)
			.count();

		assert_eq!(allowed as u32, limit);
	}

	#[test]
	fn sweep_removes_expired_buckets() {
		let limiter = limiter();

		for i in 0..5 {
			limiter.check("auth", &format!("10.0.0.{i}"), 10, 1);
		}
		assert_eq!(limiter.tracked_keys(), 5);

		thread::sleep(Duration::from_millis(1100));
		limiter.sweep_expired();

		assert_eq!(limiter.tracked_keys(), 0);
	}

	#[test]
	fn tracked_key_cap_rejects_new_clients() {
		let limiter = RateLimiter::new(RateLimitConfig {
			sweep_interval: 1_000,
			max_tracked_keys: 3,
		});

		for i in 0..3 {
			assert!(limiter.check("auth", &format!("10.0.0.{i}"), 10, 60).allowed);
		}

		let decision = limiter.check("auth", "10.0.0.99", 10, 60);
		assert!(!decision.allowed);
		assert!(decision.retry_after_secs > 0);

		// Known clients keep their quota even at the cap.
		assert!(limiter.check("auth", "10.0.0.0", 10, 60).allowed);
		assert!(limiter.tracked_keys() <= 3);
	}

	#[test]
	fn cap_reclaims_expired_buckets_before_rejecting() {
		let limiter = RateLimiter::new(RateLimitConfig {
			sweep_interval: 1_000,
			max_tracked_keys: 3,
		});

		for i in 0..3 {
			limiter.check("auth", &format!("10.0.0.{i}"), 10, 1);
		}

		thread::sleep(Duration::from_millis(1100));

		assert!(limiter.check("auth", "10.0.0.99", 10, 60).allowed);
		assert!(limiter.tracked_keys() <= 3);
	}

	#[test]
	fn default_config() {
		let config = RateLimitConfig::default();
		assert_eq!(config.sweep_interval, 100);
		assert_eq!(config.max_tracked_keys, 10_000);
	}
}
