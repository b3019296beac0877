//! Errors raised by the supervisor and its concurrency limiter.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
	#[error("unknown agent kind: {0}")]
	UnknownKind(String),

	#[error("hierarchy violation: {parent_kind} may not spawn children")]
	HierarchyViolation { parent_kind: String },

	#[error("unknown child handle: {0}")]
	UnknownHandle(u64),

	#[error("failed to spawn child process: {0}")]
	SpawnFailed(String),

	#[error("child process exited with a non-zero status: {0}")]
	ChildFailed(String),

	#[error("spawn cancelled before the child process started")]
	Cancelled,

	#[error("timed out waiting for the child process")]
	Timeout,
}

impl SupervisorError {
	/// Whether a caller may retry the operation that produced this error.
	pub fn is_recoverable(&self) -> bool {
		matches!(
			self,
			SupervisorError::ChildFailed(_) | SupervisorError::Timeout
		)
	}
}
