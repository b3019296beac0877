#![warn(missing_docs)]
//! Task dependency graph, wave partitioning, and spawn-time delegation
//! enforcement.
//!
//! # Purpose
//!
//! A request's plan decomposes into a DAG of child-agent tasks. This crate
//! partitions that DAG into independence "waves" (topological levels) and
//! enforces that every task within a wave is actually spawned in parallel,
//! within a bounded timing window, rather than silently falling back to
//! sequential execution.
//!
//! # Key types
//!
//! | Type                 | Role                                             |
//! |-----------------------|--------------------------------------------------|
//! | [`Task`]               | A single node: id, dependencies, lifecycle status |
//! | [`TaskStatus`]         | `Pending -> Spawned -> Running -> Completed/Failed`, plus `Unreachable` |
//! | [`TaskGraph`]          | The DAG; computes and memoizes the wave partition |
//! | [`DelegationEnforcer`] | Wraps a graph; validates spawn order and wave timing |
//! | [`GraphError`]         | Cycle, ordering, and timing-window violations    |
//!
//! # Invariants
//!
//! 1. A task may only be added once its dependencies already exist in the
//!    graph, making most cycles structurally unreachable through the public
//!    API; [`TaskGraph::waves`] still defends against cycles introduced any
//!    other way.
//! 2. Waves are computed once and memoized; the partition does not change
//!    after any task's status changes.
//! 3. A task may only be spawned once every task in its own wave is ready
//!    to spawn alongside it — the enforcer does not allow a wave's tasks to
//!    trickle out across multiple rounds.
//! 4. All spawns of one wave must land within `window_ms` of each other, or
//!    [`DelegationEnforcer::check_compliance`] raises (in strict mode) a
//!    [`GraphError::ParallelExecution`].

mod enforcer;
mod error;
mod graph;
mod task;

pub use enforcer::{DelegationEnforcer, EnforcerConfig};
pub use error::GraphError;
pub use graph::TaskGraph;
pub use task::{Task, TaskStatus};
