//! Tunables for the supervisor and its concurrency limiter.

/// Per-kind semaphore capacities, keyed by the registry's cost tier.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SemaphoreLimits {
	pub cheap: usize,
	pub medium: usize,
	pub expensive: usize,
}

impl Default for SemaphoreLimits {
	fn default() -> Self {
		Self {
			cheap: 10,
			medium: 5,
			expensive: 3,
		}
	}
}

/// The global rolling-window rate limiter's tunables.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
	/// Maximum admissions per window.
	pub max_per_window: usize,
	/// Window length in seconds.
	pub window_secs: u64,
}

impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			max_per_window: 30,
			window_secs: 60,
		}
	}
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
	pub semaphore_limits: SemaphoreLimits,
	pub rate_limit: RateLimitConfig,
	/// Grace period before escalating a `cancel` from graceful to forceful.
	pub cancel_grace_ms: u64,
	/// Cap, in bytes, on the tail returned by a non-blocking `progress` read.
	pub progress_tail_cap: usize,
}

impl Default for SupervisorConfig {
	fn default() -> Self {
		Self {
			semaphore_limits: SemaphoreLimits::default(),
			rate_limit: RateLimitConfig::default(),
			cancel_grace_ms: 2_000,
			progress_tail_cap: 4_096,
		}
	}
}
