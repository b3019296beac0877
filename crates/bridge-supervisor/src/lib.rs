//! Non-blocking child-agent process supervision, concurrency limiting, and
//! cancellation.
//!
//! # Purpose
//!
//! Spawns, monitors, and tears down child-agent subprocesses on behalf of
//! the router. Enforces per-kind concurrency caps and a global rolling-window
//! rate limit, and consults the process-wide delegation enforcer slot when a
//! spawn is tied to a task graph node.
//!
//! # Key types
//!
//! | Type                  | Role                                              |
//! |-------------------------|---------------------------------------------------|
//! | [`AgentSupervisor`]      | Owns the handle table and drives spawn/monitor/cancel |
//! | [`ChildStatus`]          | `Running` / `Completed` / `Failed` / `Cancelled`  |
//! | [`SpawnOptions`]         | Per-spawn knobs (blocking, task graph linkage)    |
//! | [`ConcurrencyLimiter`]   | Per-kind semaphore plus rolling-window limiter    |
//! | [`EnforcerSlot`]         | The process-wide mutable enforcer indirection     |
//! | [`ChildLauncher`]        | Production (`ProcessLauncher`) vs. test launchers |
//! | [`SupervisorError`]      | Spawn, hierarchy, and handle-lookup failures      |
//!
//! # Invariants
//!
//! 1. The supervisor is the sole reader of a child's stdout/stderr for the
//!    handle's entire lifetime.
//! 2. `mark_completed`/`mark_failed` is reported to the installed enforcer
//!    at most once per handle, on the handle's terminal transition.
//! 3. `cancel` is idempotent; a second cancel on an already-terminal or
//!    already-cancelling handle is a no-op.
//! 4. The per-kind semaphore permit is held for the handle's entire
//!    lifetime and released exactly once, on teardown.

mod config;
mod enforcer_slot;
mod error;
mod launcher;
mod limiter;
mod sink;
mod supervisor;

pub use config::{RateLimitConfig, SemaphoreLimits, SupervisorConfig};
pub use enforcer_slot::{EnforcerSlot, InstalledEnforcer};
pub use error::SupervisorError;
pub use launcher::{ChildLauncher, ChildProcess, ExitOutcome, ProcessLauncher};
pub use limiter::{Admission, ConcurrencyLimiter};
pub use sink::Sink;
pub use supervisor::{AgentSupervisor, ChildStatus, SpawnOptions};

#[doc(hidden)]
pub mod test_helpers {
	pub use crate::launcher::test_helpers::*;
}
