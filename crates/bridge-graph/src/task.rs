//! A single node of the task graph and its lifecycle.

/// Lifecycle status of a [`Task`].
///
/// Transitions are strictly `Pending -> Spawned -> (Running ->) Completed/Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
	Pending,
	Spawned,
	Running,
	Completed,
	Failed,
	/// A descendant of a `Failed` task that was never retried.
	Unreachable,
}

/// A node of the delegation task graph.
#[derive(Debug, Clone)]
pub struct Task {
	pub id: String,
	pub description: String,
	pub kind: String,
	pub dependencies: Vec<String>,
	pub status: TaskStatus,
	/// Monotonic timestamp of `mark_spawned`, in milliseconds since graph creation.
	pub spawned_at_ms: Option<u64>,
	/// Supervisor-assigned child handle id, set by `mark_spawned`.
	pub handle_id: Option<u64>,
	pub result: Option<Result<Vec<u8>, String>>,
}

impl Task {
	pub(crate) fn new(
		id: impl Into<String>,
		description: impl Into<String>,
		kind: impl Into<String>,
		dependencies: Vec<String>,
	) -> Self {
		Self {
			id: id.into(),
			description: description.into(),
			kind: kind.into(),
			dependencies,
			status: TaskStatus::Pending,
			spawned_at_ms: None,
			handle_id: None,
			result: None,
		}
	}
}
