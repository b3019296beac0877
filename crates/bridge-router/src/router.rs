//! Drives the phase state machine end-to-end for a single request.

use std::sync::Arc;

use bridge_graph::{DelegationEnforcer, TaskGraph, TaskStatus};
use bridge_orchestrator::{OrchestratorState, Phase};
use bridge_registry::AgentRegistry;
use bridge_supervisor::{AgentSupervisor, SpawnOptions};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::sidecar::SidecarAppender;

/// One node of the delegation plan the router turns into a task graph.
pub struct TaskSpec {
	pub id: String,
	pub description: String,
	pub kind: String,
	pub dependencies: Vec<String>,
	pub parent_kind: String,
	pub prompt: String,
}

/// Caller-supplied behaviour for the parts of the cycle this crate treats as
/// external collaborators (classification, context gathering, planning,
/// validation, and final synthesis).
pub struct RequestHooks {
	pub classify: Box<dyn FnOnce() -> Vec<u8> + Send>,
	pub gather_context: Box<dyn FnOnce() -> Vec<u8> + Send>,
	pub wisdom: Option<Box<dyn FnOnce() -> Vec<u8> + Send>>,
	/// Called once per Plan entry with the critique iteration number.
	pub plan: Box<dyn Fn(u32) -> Vec<u8> + Send + Sync>,
	/// Returns whether the plan, as produced, is acceptable.
	pub validate: Box<dyn Fn(&[u8]) -> bool + Send + Sync>,
	/// Decomposes an accepted plan into the delegation task graph.
	pub build_delegation: Box<dyn FnOnce(&[u8]) -> Vec<TaskSpec> + Send>,
	/// Synthesizes the final response from each task's collected output.
	pub synthesize: Box<dyn FnOnce(&[(String, Vec<u8>)]) -> Vec<u8> + Send>,
}

/// Drives one request through the full Classify -> ... -> Verify cycle.
pub struct RequestRouter {
	config: Arc<BridgeConfig>,
	registry: AgentRegistry,
	supervisor: Arc<AgentSupervisor>,
	sidecar: SidecarAppender,
}

impl RequestRouter {
	pub fn new(config: Arc<BridgeConfig>, supervisor: Arc<AgentSupervisor>) -> Self {
		let sidecar = SidecarAppender::new(config.sidecar_dir.as_ref().map(|d| d.join("bridge.jsonl")));
		Self {
			config,
			registry: AgentRegistry::new(),
			supervisor,
			sidecar,
		}
	}

	#[tracing::instrument(skip(self, hooks))]
	pub async fn drive(&self, request_id: &str, hooks: RequestHooks) -> Result<Vec<u8>, BridgeError> {
		let mut state = OrchestratorState::new(self.config.orchestrator.clone());

		state.register_artifact("classification", (hooks.classify)());
		self.transition(&mut state, Phase::Context).await?;

		state.register_artifact("context", (hooks.gather_context)());
		let next = if hooks.wisdom.is_some() {
			Phase::Wisdom
		} else {
			Phase::Plan
		};
		self.transition(&mut state, next).await?;

		if let Some(wisdom) = hooks.wisdom {
			state.register_artifact("wisdom", wisdom());
			self.transition(&mut state, Phase::Plan).await?;
		}

		let plan_bytes = loop {
			let critique_iter = state.critique_counter();
			let plan_bytes = (hooks.plan)(critique_iter);
			state.register_artifact("plan", plan_bytes.clone());
			self.transition(&mut state, Phase::Validate).await?;

			if (hooks.validate)(&plan_bytes) {
				break plan_bytes;
			}
			self.transition(&mut state, Phase::Plan).await?;
		};

		let tasks = (hooks.build_delegation)(&plan_bytes);
		let mut graph = TaskGraph::new();
		for task in &tasks {
			self.registry.lookup(&task.kind)?;
			graph.add_task(task.id.clone(), task.description.clone(), task.kind.clone(), task.dependencies.clone())?;
		}
		let enforcer = DelegationEnforcer::new(graph, self.config.enforcer.clone())?;
		let _guard = self.supervisor.enforcer_slot().install_scoped(enforcer);

		state.register_artifact("validation", Vec::new());
		self.transition(&mut state, Phase::Delegate).await?;

		state.register_artifact("delegation-targets", serde_json::to_vec(&tasks.iter().map(|t| &t.id).collect::<Vec<_>>()).unwrap_or_default());
		state.register_artifact("task-graph", Vec::new());
		self.transition(&mut state, Phase::Execute).await?;

		let results = self.execute_waves(&tasks).await?;

		state.register_artifact(
			"execution-result",
			serde_json::to_vec(&results.iter().map(|(id, _)| id).collect::<Vec<_>>()).unwrap_or_default(),
		);
		self.transition(&mut state, Phase::Verify).await?;

		drop(_guard);
		Ok((hooks.synthesize)(&results))
	}

	async fn transition(&self, state: &mut OrchestratorState, to: Phase) -> Result<(), BridgeError> {
		let from = state.current();
		state.transition(to)?;
		tracing::info!(?from, ?to, "phase transition");
		self.sidecar
			.append("transition", serde_json::json!({"from": format!("{from:?}"), "to": format!("{to:?}")}))
			.await;
		Ok(())
	}

	async fn execute_waves(&self, tasks: &[TaskSpec]) -> Result<Vec<(String, Vec<u8>)>, BridgeError> {
		let wave_count = self
			.supervisor
			.enforcer_slot()
			.with_current(|e| e.graph().waves().map(|w| w.len()).unwrap_or(0))
			.unwrap_or(0);

		let mut results = Vec::new();
		for wave_index in 0..wave_count {
			let wave_ids: Vec<String> = self
				.supervisor
				.enforcer_slot()
				.with_current(|e| e.current_wave().to_vec())
				.unwrap_or_default();

			// An earlier wave's failure can mark later-wave siblings `Unreachable`
			// via BFS propagation; those ids stay in the frozen wave partition but
			// are never spawned, so they get a synthetic empty result instead.
			let mut handle_ids = Vec::new();
			for task_id in &wave_ids {
				let status = self
					.supervisor
					.enforcer_slot()
					.with_current(|e| e.graph().get(task_id).map(|t| t.status))
					.flatten();
				if status != Some(TaskStatus::Pending) {
					results.push((task_id.clone(), Vec::new()));
					continue;
				}

				let task = tasks
					.iter()
					.find(|t| &t.id == task_id)
					.expect("every wave task id comes from the graph built from `tasks`");
				let (handle_id, _) = self
					.supervisor
					.spawn(
						&task.kind,
						&task.parent_kind,
						&task.prompt,
						SpawnOptions {
							blocking: false,
							task_graph_id: Some(task.id.clone()),
							model_override: None,
							thinking_budget: None,
						},
					)
					.await?;
				handle_ids.push((task.id.clone(), handle_id));
			}

			let compliance = self.supervisor.enforcer_slot().with_current(|e| e.check_compliance());
			if let Some(Err(e)) = compliance {
				tracing::warn!(wave_index, error = %e, "wave exceeded parallel spawn window");
				return Err(e.into());
			}

			for (task_id, handle_id) in handle_ids {
				let output = self.supervisor.output(handle_id, true).await?;
				results.push((task_id, output));
			}

			self.sidecar
				.append("wave-close", serde_json::json!({"wave_index": wave_index, "task_count": wave_ids.len()}))
				.await;
		}
		Ok(results)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use bridge_supervisor::{test_helpers::TestLauncher, EnforcerSlot, ExitOutcome};

	use super::*;

	fn router_with_scripts(scripts: Vec<(Vec<u8>, ExitOutcome)>) -> RequestRouter {
		let supervisor = Arc::new(AgentSupervisor::new(
			AgentRegistry::new(),
			Arc::new(TestLauncher::new(scripts)),
			EnforcerSlot::new(),
			Default::default(),
		));
		RequestRouter::new(Arc::new(BridgeConfig::default()), supervisor)
	}

	fn two_independent_reader_tasks() -> Vec<TaskSpec> {
		vec![
			TaskSpec {
				id: "t1".to_string(),
				description: "read a".to_string(),
				kind: "reader".to_string(),
				dependencies: vec![],
				parent_kind: "orchestrator".to_string(),
				prompt: "read a".to_string(),
			},
			TaskSpec {
				id: "t2".to_string(),
				description: "read b".to_string(),
				kind: "reader".to_string(),
				dependencies: vec![],
				parent_kind: "orchestrator".to_string(),
				prompt: "read b".to_string(),
			},
		]
	}

	#[tokio::test]
	async fn drive_runs_one_request_end_to_end() {
		let router = router_with_scripts(vec![
			(b"a-out".to_vec(), ExitOutcome::Success),
			(b"b-out".to_vec(), ExitOutcome::Success),
		]);

		let hooks = RequestHooks {
			classify: Box::new(|| b"classified".to_vec()),
			gather_context: Box::new(|| b"context".to_vec()),
			wisdom: None,
			plan: Box::new(|_critique_iter| b"plan".to_vec()),
			validate: Box::new(|_plan| true),
			build_delegation: Box::new(|_plan| two_independent_reader_tasks()),
			synthesize: Box::new(|results| {
				let mut out = Vec::new();
				for (id, bytes) in results {
					out.extend_from_slice(id.as_bytes());
					out.extend_from_slice(b":");
					out.extend_from_slice(bytes);
					out.extend_from_slice(b";");
				}
				out
			}),
		};

		let output = router.drive("req-1", hooks).await.unwrap();
		let output = String::from_utf8(output).unwrap();
		assert!(output.contains("t1:a-out;"));
		assert!(output.contains("t2:b-out;"));
	}

	#[tokio::test]
	async fn drive_reruns_plan_until_validate_accepts() {
		let router = router_with_scripts(vec![(b"out".to_vec(), ExitOutcome::Success)]);
		let attempts = Mutex::new(0u32);

		let hooks = RequestHooks {
			classify: Box::new(|| b"classified".to_vec()),
			gather_context: Box::new(|| b"context".to_vec()),
			wisdom: None,
			plan: Box::new(move |critique_iter| format!("plan-{critique_iter}").into_bytes()),
			validate: Box::new(move |plan| {
				let mut count = attempts.lock().unwrap();
				*count += 1;
				plan == b"plan-2"
			}),
			build_delegation: Box::new(|_plan| {
				vec![TaskSpec {
					id: "t1".to_string(),
					description: "solo".to_string(),
					kind: "reader".to_string(),
					dependencies: vec![],
					parent_kind: "orchestrator".to_string(),
					prompt: "solo".to_string(),
				}]
			}),
			synthesize: Box::new(|results| results[0].1.clone()),
		};

		let output = router.drive("req-2", hooks).await.unwrap();
		assert_eq!(output, b"out");
	}

	#[tokio::test]
	async fn drive_rejects_unknown_delegation_kind_before_spawning() {
		let router = router_with_scripts(vec![]);

		let hooks = RequestHooks {
			classify: Box::new(|| b"classified".to_vec()),
			gather_context: Box::new(|| b"context".to_vec()),
			wisdom: None,
			plan: Box::new(|_| b"plan".to_vec()),
			validate: Box::new(|_| true),
			build_delegation: Box::new(|_plan| {
				vec![TaskSpec {
					id: "t1".to_string(),
					description: "ghost task".to_string(),
					kind: "ghost".to_string(),
					dependencies: vec![],
					parent_kind: "orchestrator".to_string(),
					prompt: "x".to_string(),
				}]
			}),
			synthesize: Box::new(|_results| Vec::new()),
		};

		let err = router.drive("req-3", hooks).await.unwrap_err();
		assert!(matches!(err, BridgeError::Registry(_)));
	}

	#[tokio::test]
	async fn drive_marks_unreachable_descendants_without_aborting_siblings() {
		let router = router_with_scripts(vec![
			(b"a-fail".to_vec(), ExitOutcome::Failure { code: Some(1) }),
			(b"b-out".to_vec(), ExitOutcome::Success),
		]);

		let hooks = RequestHooks {
			classify: Box::new(|| b"classified".to_vec()),
			gather_context: Box::new(|| b"context".to_vec()),
			wisdom: None,
			plan: Box::new(|_| b"plan".to_vec()),
			validate: Box::new(|_| true),
			build_delegation: Box::new(|_plan| {
				vec![
					TaskSpec {
						id: "a".to_string(),
						description: "read a".to_string(),
						kind: "reader".to_string(),
						dependencies: vec![],
						parent_kind: "orchestrator".to_string(),
						prompt: "read a".to_string(),
					},
					TaskSpec {
						id: "b".to_string(),
						description: "read b".to_string(),
						kind: "reader".to_string(),
						dependencies: vec![],
						parent_kind: "orchestrator".to_string(),
						prompt: "read b".to_string(),
					},
					TaskSpec {
						id: "c".to_string(),
						description: "read c".to_string(),
						kind: "reader".to_string(),
						dependencies: vec!["a".to_string()],
						parent_kind: "orchestrator".to_string(),
						prompt: "read c".to_string(),
					},
				]
			}),
			synthesize: Box::new(|results| {
				let mut out = Vec::new();
				for (id, bytes) in results {
					out.extend_from_slice(id.as_bytes());
					out.extend_from_slice(b":");
					out.extend_from_slice(bytes);
					out.extend_from_slice(b";");
				}
				out
			}),
		};

		let output = router.drive("req-5", hooks).await.unwrap();
		let output = String::from_utf8(output).unwrap();
		assert!(output.contains("a:a-fail;"));
		assert!(output.contains("b:b-out;"));
		assert!(output.contains("c:;"));
	}

	#[tokio::test]
	async fn drive_writes_sidecar_transitions_and_wave_closes() {
		let dir = tempfile::tempdir().unwrap();
		let supervisor = Arc::new(AgentSupervisor::new(
			AgentRegistry::new(),
			Arc::new(TestLauncher::new(vec![(b"out".to_vec(), ExitOutcome::Success)])),
			EnforcerSlot::new(),
			Default::default(),
		));
		let config = Arc::new(BridgeConfig {
			sidecar_dir: Some(dir.path().to_path_buf()),
			..Default::default()
		});
		let router = RequestRouter::new(config, supervisor);

		let hooks = RequestHooks {
			classify: Box::new(|| b"classified".to_vec()),
			gather_context: Box::new(|| b"context".to_vec()),
			wisdom: None,
			plan: Box::new(|_| b"plan".to_vec()),
			validate: Box::new(|_| true),
			build_delegation: Box::new(|_plan| {
				vec![TaskSpec {
					id: "t1".to_string(),
					description: "solo".to_string(),
					kind: "reader".to_string(),
					dependencies: vec![],
					parent_kind: "orchestrator".to_string(),
					prompt: "solo".to_string(),
				}]
			}),
			synthesize: Box::new(|results| results[0].1.clone()),
		};

		router.drive("req-4", hooks).await.unwrap();

		let contents = tokio::fs::read_to_string(dir.path().join("bridge.jsonl"))
			.await
			.unwrap();
		let lines: Vec<&str> = contents.lines().collect();
		assert!(lines.iter().any(|l| l.contains("\"wave-close\"")));
		assert!(lines.iter().any(|l| l.contains("\"transition\"")));
	}
}
