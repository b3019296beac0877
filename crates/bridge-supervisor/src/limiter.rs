//! Per-kind concurrency semaphores plus a global rolling-window rate limiter.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

use bridge_registry::CostTier;

use crate::config::{RateLimitConfig, SemaphoreLimits};

/// A held permit from both the per-kind semaphore and the rolling window.
/// Dropping it releases the semaphore permit; the rolling window has no
/// release step (admission timestamps simply age out).
pub struct Admission {
	_permit: tokio::sync::OwnedSemaphorePermit,
}

/// Composes the two layered concurrency controls of the admission path.
pub struct ConcurrencyLimiter {
	cheap: Arc<Semaphore>,
	medium: Arc<Semaphore>,
	expensive: Arc<Semaphore>,
	window: Mutex<VecDeque<Instant>>,
	rate_limit: RateLimitConfig,
}

impl ConcurrencyLimiter {
	pub fn new(limits: SemaphoreLimits, rate_limit: RateLimitConfig) -> Self {
		Self {
			cheap: Arc::new(Semaphore::new(limits.cheap)),
			medium: Arc::new(Semaphore::new(limits.medium)),
			expensive: Arc::new(Semaphore::new(limits.expensive)),
			window: Mutex::new(VecDeque::new()),
			rate_limit,
		}
	}

	fn semaphore_for(&self, tier: CostTier) -> &Arc<Semaphore> {
		match tier {
			CostTier::Cheap => &self.cheap,
			CostTier::Medium => &self.medium,
			CostTier::Expensive => &self.expensive,
		}
	}

	/// Acquire both controls, blocking until the kind's semaphore has a free
	/// slot and the rolling window has room. Callers race this against their
	/// own cancellation signal.
	pub async fn acquire(&self, tier: CostTier) -> Admission {
		let permit = self
			.semaphore_for(tier)
			.clone()
			.acquire_owned()
			.await
			.expect("semaphore is never closed");
		self.await_rolling_window().await;
		Admission { _permit: permit }
	}

	async fn await_rolling_window(&self) {
		let window_len = Duration::from_secs(self.rate_limit.window_secs);
		loop {
			let wait_until = {
				let mut admissions = self.window.lock().await;
				let now = Instant::now();
				while let Some(&oldest) = admissions.front() {
					if now.duration_since(oldest) >= window_len {
						admissions.pop_front();
					} else {
						break;
					}
				}
				if admissions.len() < self.rate_limit.max_per_window {
					admissions.push_back(now);
					return;
				}
				*admissions.front().expect("non-empty: len >= max > 0") + window_len
			};
			tokio::time::sleep_until(wait_until).await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn per_kind_semaphore_caps_concurrency() {
		let limiter = ConcurrencyLimiter::new(
			SemaphoreLimits {
				cheap: 1,
				medium: 1,
				expensive: 1,
			},
			RateLimitConfig {
				max_per_window: 100,
				window_secs: 60,
			},
		);
		let first = limiter.acquire(CostTier::Cheap).await;
		let second = tokio::time::timeout(Duration::from_millis(10), limiter.acquire(CostTier::Cheap)).await;
		assert!(second.is_err(), "second cheap acquire should block while one permit is held");
		drop(first);
		let _third = limiter.acquire(CostTier::Cheap).await;
	}

	#[tokio::test(start_paused = true)]
	async fn rolling_window_admits_up_to_n_then_blocks() {
		let limiter = ConcurrencyLimiter::new(
			SemaphoreLimits {
				cheap: 10,
				medium: 10,
				expensive: 10,
			},
			RateLimitConfig {
				max_per_window: 2,
				window_secs: 1,
			},
		);
		let _a = limiter.acquire(CostTier::Cheap).await;
		let _b = limiter.acquire(CostTier::Cheap).await;
		let blocked = tokio::time::timeout(Duration::from_millis(10), limiter.acquire(CostTier::Cheap)).await;
		assert!(blocked.is_err());
	}
}
