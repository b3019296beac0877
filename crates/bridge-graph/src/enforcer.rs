//! The delegation enforcer: spawn-time validation of the wave timing window.

use std::time::Instant;

use crate::error::GraphError;
use crate::graph::TaskGraph;
use crate::task::TaskStatus;

/// Tunables for [`DelegationEnforcer`], with sensible defaults.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EnforcerConfig {
	/// Maximum permitted spread, in milliseconds, between the first and last
	/// spawn of a wave.
	pub window_ms: u64,
	/// Whether a compliance violation raises [`GraphError::ParallelExecution`]
	/// or is merely logged and allowed.
	pub strict: bool,
}

impl Default for EnforcerConfig {
	fn default() -> Self {
		Self {
			window_ms: 500,
			strict: true,
		}
	}
}

/// Wraps a [`TaskGraph`] with a spawn-time validator enforcing the
/// parallel-window invariant and dependency ordering.
///
/// The router installs exactly one enforcer per request; the enforcer type
/// itself is plain and makes no assumption about how it is shared.
pub struct DelegationEnforcer {
	graph: TaskGraph,
	config: EnforcerConfig,
	wave_index: usize,
	epoch: Instant,
	batch: Vec<(String, Instant)>,
}

impl DelegationEnforcer {
	/// Wrap `graph`, eagerly computing its wave partition so a cyclic graph
	/// is rejected before any spawn is attempted.
	pub fn new(graph: TaskGraph, config: EnforcerConfig) -> Result<Self, GraphError> {
		graph.waves()?;
		Ok(Self {
			graph,
			config,
			wave_index: 0,
			epoch: Instant::now(),
			batch: Vec::new(),
		})
	}

	pub fn graph(&self) -> &TaskGraph {
		&self.graph
	}

	/// The task ids in the wave currently open for spawning.
	pub fn current_wave(&self) -> &[String] {
		self.graph
			.waves()
			.expect("cycle would have been rejected in `new`")
			.get(self.wave_index)
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}

	/// Whether `task_id` may be spawned right now.
	pub fn validate_spawn(&self, task_id: &str) -> Result<(), GraphError> {
		let Some(task) = self.graph.get(task_id) else {
			return Err(GraphError::SpawnRejected {
				task: task_id.to_string(),
				reason: "unknown task".to_string(),
			});
		};

		if self.current_wave().iter().any(|id| id == task_id) {
			if task.status == TaskStatus::Pending {
				return Ok(());
			}
			return Err(GraphError::SpawnRejected {
				task: task_id.to_string(),
				reason: "already processed".to_string(),
			});
		}

		if matches!(task.status, TaskStatus::Completed | TaskStatus::Failed) {
			return Err(GraphError::SpawnRejected {
				task: task_id.to_string(),
				reason: "already processed".to_string(),
			});
		}

		Err(GraphError::SpawnRejected {
			task: task_id.to_string(),
			reason: format!(
				"unmet dependencies, current wave is {:?}",
				self.current_wave()
			),
		})
	}

	/// Record a spawn and advance the underlying task to `Spawned`.
	///
	/// Does not evaluate compliance; that happens at wave close via
	/// [`DelegationEnforcer::check_compliance`].
	pub fn record_spawn(&mut self, task_id: &str, handle_id: u64) -> Result<(), GraphError> {
		let now = Instant::now();
		let spawned_at_ms = now.duration_since(self.epoch).as_millis() as u64;
		self.graph.mark_spawned(task_id, handle_id, spawned_at_ms)?;
		self.batch.push((task_id.to_string(), now));
		Ok(())
	}

	/// Evaluate the timing-window invariant for the current wave.
	///
	/// Returns `Ok` iff the batch equals the current wave set and the spread
	/// between the earliest and latest spawn does not exceed `window_ms`.
	/// A single-task wave trivially passes regardless of `window_ms`.
	pub fn check_compliance(&self) -> Result<(), GraphError> {
		let wave = self.current_wave();
		if wave.len() != self.batch.len()
			|| !wave.iter().all(|id| self.batch.iter().any(|(b, _)| b == id))
		{
			return Ok(());
		}

		if self.batch.len() <= 1 {
			return Ok(());
		}

		let min_ts = self.batch.iter().map(|(_, t)| *t).min().expect("non-empty");
		let max_ts = self.batch.iter().map(|(_, t)| *t).max().expect("non-empty");
		let spread_ms = max_ts.duration_since(min_ts).as_millis() as u64;

		if spread_ms <= self.config.window_ms {
			return Ok(());
		}

		let err = GraphError::ParallelExecution {
			wave: self.wave_index,
			spread_ms,
			window_ms: self.config.window_ms,
		};

		if self.config.strict {
			Err(err)
		} else {
			tracing::warn!(wave = self.wave_index, spread_ms, window_ms = self.config.window_ms, "parallel execution window exceeded, continuing (non-strict)");
			Ok(())
		}
	}

	/// Proxy to the graph; auto-advances the wave and clears the batch once
	/// every task of the current wave has reached a terminal status.
	pub fn mark_completed(&mut self, task_id: &str, result: Vec<u8>) -> Result<bool, GraphError> {
		self.graph.mark_completed(task_id, result)?;
		Ok(self.maybe_advance())
	}

	/// Proxy to the graph; a failed task may also close out the wave if every
	/// sibling has already reached a terminal status.
	pub fn mark_failed(&mut self, task_id: &str, error: impl Into<String>) -> Result<bool, GraphError> {
		self.graph.mark_failed(task_id, error)?;
		Ok(self.maybe_advance())
	}

	fn wave_is_settled(&self) -> bool {
		let wave = self.current_wave();
		!wave.is_empty()
			&& wave.iter().all(|id| {
				self.graph
					.get(id)
					.is_some_and(|t| matches!(t.status, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Unreachable))
			})
	}

	fn maybe_advance(&mut self) -> bool {
		if self.wave_is_settled() {
			self.advance_wave()
		} else {
			false
		}
	}

	/// Idempotent forward step. Returns `true` iff a next wave existed.
	pub fn advance_wave(&mut self) -> bool {
		let wave_count = self
			.graph
			.waves()
			.expect("cycle would have been rejected in `new`")
			.len();
		if self.wave_index + 1 >= wave_count {
			return false;
		}
		self.wave_index += 1;
		self.batch.clear();
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn diamond() -> TaskGraph {
		let mut graph = TaskGraph::new();
		graph.add_task("a", "", "cheap", vec![]).unwrap();
		graph.add_task("b", "", "cheap", vec![]).unwrap();
		graph
			.add_task("c", "", "medium", vec!["a".into(), "b".into()])
			.unwrap();
		graph
	}

	#[test]
	fn happy_path_advances_through_two_waves() {
		let mut enforcer = DelegationEnforcer::new(diamond(), EnforcerConfig::default()).unwrap();
		enforcer.record_spawn("a", 1).unwrap();
		enforcer.record_spawn("b", 2).unwrap();
		enforcer.check_compliance().unwrap();
		let advanced_a = enforcer.mark_completed("a", vec![]).unwrap();
		let advanced_b = enforcer.mark_completed("b", vec![]).unwrap();
		assert!(!advanced_a);
		assert!(advanced_b);
		assert_eq!(enforcer.current_wave(), &["c".to_string()]);

		enforcer.record_spawn("c", 3).unwrap();
		enforcer.check_compliance().unwrap();
		enforcer.mark_completed("c", vec![]).unwrap();
	}

	#[test]
	fn spread_beyond_window_is_rejected() {
		let mut enforcer = DelegationEnforcer::new(
			diamond(),
			EnforcerConfig {
				window_ms: 50,
				strict: true,
			},
		)
		.unwrap();
		enforcer.record_spawn("a", 1).unwrap();
		std::thread::sleep(std::time::Duration::from_millis(80));
		enforcer.record_spawn("b", 2).unwrap();

		let err = enforcer.check_compliance().unwrap_err();
		match err {
			GraphError::ParallelExecution { wave, spread_ms, window_ms } => {
				assert_eq!(wave, 0);
				assert!(spread_ms > window_ms, "spread {spread_ms} should exceed window {window_ms}");
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn non_strict_spread_violation_is_logged_not_rejected() {
		let mut enforcer = DelegationEnforcer::new(
			diamond(),
			EnforcerConfig {
				window_ms: 50,
				strict: false,
			},
		)
		.unwrap();
		enforcer.record_spawn("a", 1).unwrap();
		std::thread::sleep(std::time::Duration::from_millis(80));
		enforcer.record_spawn("b", 2).unwrap();
		assert!(enforcer.check_compliance().is_ok());
	}

	#[test]
	fn spawn_with_unmet_dependency_is_rejected() {
		let enforcer = DelegationEnforcer::new(diamond(), EnforcerConfig::default()).unwrap();
		let err = enforcer.validate_spawn("c").unwrap_err();
		match err {
			GraphError::SpawnRejected { reason, .. } => {
				assert!(reason.contains("unmet dependencies"));
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn single_task_wave_trivially_complies_at_zero_window() {
		let mut graph = TaskGraph::new();
		graph.add_task("solo", "", "cheap", vec![]).unwrap();
		let mut enforcer = DelegationEnforcer::new(
			graph,
			EnforcerConfig {
				window_ms: 0,
				strict: true,
			},
		)
		.unwrap();
		enforcer.record_spawn("solo", 1).unwrap();
		assert!(enforcer.check_compliance().is_ok());
	}

	#[test]
	fn advance_wave_is_a_no_op_past_the_last_wave() {
		let mut graph = TaskGraph::new();
		graph.add_task("solo", "", "cheap", vec![]).unwrap();
		let mut enforcer = DelegationEnforcer::new(graph, EnforcerConfig::default()).unwrap();
		assert!(!enforcer.advance_wave());
		assert!(!enforcer.advance_wave());
	}

	#[test]
	fn unknown_task_is_rejected() {
		let enforcer = DelegationEnforcer::new(diamond(), EnforcerConfig::default()).unwrap();
		let err = enforcer.validate_spawn("ghost").unwrap_err();
		match err {
			GraphError::SpawnRejected { reason, .. } => assert_eq!(reason, "unknown task"),
			other => panic!("unexpected error: {other:?}"),
		}
	}
}
