//! Errors raised by the task graph and delegation enforcer.

use thiserror::Error;

/// Failures from [`crate::graph::TaskGraph`] and [`crate::enforcer::DelegationEnforcer`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
	#[error("duplicate task id: {0}")]
	DuplicateTaskId(String),

	#[error("task {task} depends on unknown task {dependency}")]
	UnknownDependency { task: String, dependency: String },

	#[error("task graph contains a cycle among: {remaining:?}")]
	CycleError { remaining: Vec<String> },

	#[error("illegal task transition for {id}: cannot {action} from {from:?}")]
	IllegalTaskTransition {
		id: String,
		from: crate::task::TaskStatus,
		action: &'static str,
	},

	#[error("unknown task id: {0}")]
	UnknownTask(String),

	#[error("spawn rejected for {task}: {reason}")]
	SpawnRejected { task: String, reason: String },

	#[error("parallel execution error in wave {wave}: spread {spread_ms}ms > window {window_ms}ms")]
	ParallelExecution {
		wave: usize,
		spread_ms: u64,
		window_ms: u64,
	},
}

impl GraphError {
	/// Whether this error is fatal regardless of the enforcer's `strict` flag.
	///
	/// `ParallelExecution` is the one category whose fatality depends on
	/// the enforcer's configuration: fatal iff strict, otherwise logged and
	/// allowed.
	pub fn is_conditionally_fatal(&self) -> bool {
		matches!(self, GraphError::ParallelExecution { .. })
	}
}
