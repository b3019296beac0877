//! The task DAG and its topological wave partition.

use std::collections::{HashSet, VecDeque};
use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::error::GraphError;
use crate::task::{Task, TaskStatus};

/// A DAG of child-agent tasks, plus its derived wave partition.
///
/// Insertion order of [`TaskGraph::add_task`] is preserved (`IndexMap`) so
/// that tie-breaking within a wave is deterministic across runs.
#[derive(Debug, Default)]
pub struct TaskGraph {
	tasks: IndexMap<String, Task>,
	waves: OnceLock<Result<Vec<Vec<String>>, GraphError>>,
}

impl TaskGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a task. Rejects a duplicate id or a dependency on an unknown id.
	///
	/// Cycle detection is deferred to [`TaskGraph::waves`].
	pub fn add_task(
		&mut self,
		id: impl Into<String>,
		description: impl Into<String>,
		kind: impl Into<String>,
		dependencies: Vec<String>,
	) -> Result<(), GraphError> {
		let id = id.into();
		if self.tasks.contains_key(&id) {
			return Err(GraphError::DuplicateTaskId(id));
		}
		for dep in &dependencies {
			if !self.tasks.contains_key(dep) {
				return Err(GraphError::UnknownDependency {
					task: id,
					dependency: dep.clone(),
				});
			}
		}
		self.tasks
			.insert(id.clone(), Task::new(id, description, kind, dependencies));
		Ok(())
	}

	pub fn get(&self, id: &str) -> Option<&Task> {
		self.tasks.get(id)
	}

	pub fn len(&self) -> usize {
		self.tasks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tasks.is_empty()
	}

	/// Topological wave partition, computed once and memoized.
	///
	/// Uses Kahn's algorithm: wave 0 is every task with no dependencies;
	/// wave *k* is every remaining task whose dependencies all lie in
	/// waves `< k`. A non-empty remainder after the frontier is exhausted
	/// means the graph contains a cycle.
	pub fn waves(&self) -> Result<&[Vec<String>], GraphError> {
		let result = self.waves.get_or_init(|| self.compute_waves());
		result.as_ref().map(Vec::as_slice).map_err(Clone::clone)
	}

	fn compute_waves(&self) -> Result<Vec<Vec<String>>, GraphError> {
		if self.tasks.is_empty() {
			return Ok(Vec::new());
		}

		let mut indegree: IndexMap<&str, usize> = IndexMap::new();
		let mut dependents: IndexMap<&str, Vec<&str>> = IndexMap::new();
		for (id, task) in &self.tasks {
			indegree.insert(id.as_str(), task.dependencies.len());
			dependents.entry(id.as_str()).or_default();
		}
		for (id, task) in &self.tasks {
			for dep in &task.dependencies {
				dependents.entry(dep.as_str()).or_default().push(id.as_str());
			}
		}

		let mut levels = Vec::new();
		let mut frontier: VecDeque<&str> = self
			.tasks
			.keys()
			.map(String::as_str)
			.filter(|id| indegree[id] == 0)
			.collect();
		let mut processed: HashSet<&str> = frontier.iter().copied().collect();

		while !frontier.is_empty() {
			let level: Vec<String> = frontier.iter().map(|s| s.to_string()).collect();
			let mut next = Vec::new();
			for id in frontier.drain(..) {
				for &dependent in dependents.get(id).into_iter().flatten() {
					if processed.contains(dependent) {
						continue;
					}
					let slot = indegree.get_mut(dependent).expect("known node");
					*slot -= 1;
					if *slot == 0 {
						processed.insert(dependent);
						next.push(dependent);
					}
				}
			}
			levels.push(level);
			frontier.extend(next);
		}

		if processed.len() != self.tasks.len() {
			let remaining = self
				.tasks
				.keys()
				.filter(|id| !processed.contains(id.as_str()))
				.cloned()
				.collect();
			return Err(GraphError::CycleError { remaining });
		}

		Ok(levels)
	}

	/// Tasks that are `Pending` and whose dependencies are all `Completed`.
	pub fn ready_tasks(&self) -> Vec<&str> {
		self.tasks
			.values()
			.filter(|t| {
				t.status == TaskStatus::Pending
					&& t.dependencies.iter().all(|dep| {
						self.tasks
							.get(dep)
							.is_some_and(|d| d.status == TaskStatus::Completed)
					})
			})
			.map(|t| t.id.as_str())
			.collect()
	}

	pub fn mark_spawned(
		&mut self,
		id: &str,
		handle_id: u64,
		spawned_at_ms: u64,
	) -> Result<(), GraphError> {
		let task = self.task_mut(id)?;
		if task.status != TaskStatus::Pending {
			return Err(GraphError::IllegalTaskTransition {
				id: id.to_string(),
				from: task.status,
				action: "mark_spawned",
			});
		}
		task.status = TaskStatus::Spawned;
		task.handle_id = Some(handle_id);
		task.spawned_at_ms = Some(spawned_at_ms);
		Ok(())
	}

	pub fn mark_running(&mut self, id: &str) -> Result<(), GraphError> {
		let task = self.task_mut(id)?;
		if task.status != TaskStatus::Spawned {
			return Err(GraphError::IllegalTaskTransition {
				id: id.to_string(),
				from: task.status,
				action: "mark_running",
			});
		}
		task.status = TaskStatus::Running;
		Ok(())
	}

	pub fn mark_completed(&mut self, id: &str, result: Vec<u8>) -> Result<(), GraphError> {
		let task = self.task_mut(id)?;
		if !matches!(task.status, TaskStatus::Spawned | TaskStatus::Running) {
			return Err(GraphError::IllegalTaskTransition {
				id: id.to_string(),
				from: task.status,
				action: "mark_completed",
			});
		}
		task.status = TaskStatus::Completed;
		task.result = Some(Ok(result));
		Ok(())
	}

	pub fn mark_failed(&mut self, id: &str, error: impl Into<String>) -> Result<(), GraphError> {
		let task = self.task_mut(id)?;
		if !matches!(task.status, TaskStatus::Spawned | TaskStatus::Running) {
			return Err(GraphError::IllegalTaskTransition {
				id: id.to_string(),
				from: task.status,
				action: "mark_failed",
			});
		}
		task.status = TaskStatus::Failed;
		task.result = Some(Err(error.into()));
		self.propagate_unreachable(id);
		Ok(())
	}

	/// Mark every transitive, still-`Pending` dependent of `failed_id` as
	/// `Unreachable`: a failed task blocks its descendants unless the router
	/// explicitly retries it.
	fn propagate_unreachable(&mut self, failed_id: &str) {
		let mut queue: VecDeque<String> = VecDeque::from([failed_id.to_string()]);
		let mut visited: HashSet<String> = HashSet::new();

		while let Some(id) = queue.pop_front() {
			if !visited.insert(id.clone()) {
				continue;
			}
			let dependents: Vec<String> = self
				.tasks
				.values()
				.filter(|t| t.dependencies.iter().any(|d| d == &id))
				.map(|t| t.id.clone())
				.collect();

			for dependent_id in dependents {
				if let Some(task) = self.tasks.get_mut(&dependent_id)
					&& task.status == TaskStatus::Pending
				{
					task.status = TaskStatus::Unreachable;
					queue.push_back(dependent_id);
				}
			}
		}
	}

	fn task_mut(&mut self, id: &str) -> Result<&mut Task, GraphError> {
		self.tasks
			.get_mut(id)
			.ok_or_else(|| GraphError::UnknownTask(id.to_string()))
	}
}
