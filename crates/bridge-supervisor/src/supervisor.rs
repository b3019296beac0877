//! Non-blocking child-agent process supervision.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::sync::oneshot;
use tokio::time::Instant;

use bridge_registry::AgentRegistry;

use crate::config::SupervisorConfig;
use crate::enforcer_slot::EnforcerSlot;
use crate::error::SupervisorError;
use crate::launcher::{ChildLauncher, ExitOutcome};
use crate::limiter::ConcurrencyLimiter;
use crate::sink::Sink;

/// Lifecycle status of one supervised child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
	/// Handle exists and admission (semaphore + rate window) has not yet
	/// been granted; the child process has not been launched.
	Queued,
	Running,
	Completed,
	Failed,
	Cancelled,
}

/// Per-spawn options.
#[derive(Debug, Default)]
pub struct SpawnOptions {
	pub blocking: bool,
	/// Opaque reference linking this spawn to a task in the active enforcer.
	pub task_graph_id: Option<String>,
	pub model_override: Option<String>,
	pub thinking_budget: Option<u32>,
}

struct RetryParams {
	kind: String,
	prompt: String,
	parent_kind: String,
	options: SpawnOptionsSnapshot,
}

#[derive(Clone)]
struct SpawnOptionsSnapshot {
	blocking: bool,
	task_graph_id: Option<String>,
	model_override: Option<String>,
	thinking_budget: Option<u32>,
}

struct ChildRecord {
	kind: String,
	status: ChildStatus,
	stdout: Sink,
	stderr: Sink,
	term_tx: Option<oneshot::Sender<()>>,
	finished_at: Option<Instant>,
	retry_params: RetryParams,
}

/// Owns the live child handle table, the concurrency limiter, and a
/// reference to the process-wide enforcer slot.
pub struct AgentSupervisor {
	registry: AgentRegistry,
	launcher: Arc<dyn ChildLauncher>,
	limiter: Arc<ConcurrencyLimiter>,
	enforcer: EnforcerSlot,
	config: SupervisorConfig,
	handles: Arc<Mutex<HashMap<u64, ChildRecord>>>,
	next_handle: AtomicU64,
}

impl AgentSupervisor {
	pub fn new(
		registry: AgentRegistry,
		launcher: Arc<dyn ChildLauncher>,
		enforcer: EnforcerSlot,
		config: SupervisorConfig,
	) -> Self {
		let limiter = Arc::new(ConcurrencyLimiter::new(
			config.semaphore_limits.clone(),
			config.rate_limit.clone(),
		));
		Self {
			registry,
			launcher,
			limiter,
			enforcer,
			config,
			handles: Arc::new(Mutex::new(HashMap::new())),
			next_handle: AtomicU64::new(1),
		}
	}

	pub fn enforcer_slot(&self) -> &EnforcerSlot {
		&self.enforcer
	}

	fn base_command(kind: &str) -> Vec<String> {
		vec![format!("bridge-agent-{kind}")]
	}

	/// Spawn a child of `kind` on behalf of `parent_kind`.
	///
	/// If `options.blocking`, waits for the child to exit and returns its
	/// final captured stdout; otherwise returns the handle id immediately
	/// and the child continues running under an internal monitor.
	pub async fn spawn(
		&self,
		kind: &str,
		parent_kind: &str,
		prompt: &str,
		options: SpawnOptions,
	) -> Result<(u64, Option<Vec<u8>>), SupervisorError> {
		let parent_descriptor = self
			.registry
			.lookup(parent_kind)
			.map_err(|e| SupervisorError::UnknownKind(e.to_string()))?;
		if !parent_descriptor.may_spawn() {
			return Err(SupervisorError::HierarchyViolation {
				parent_kind: parent_kind.to_string(),
			});
		}

		let descriptor = self
			.registry
			.lookup(kind)
			.map_err(|e| SupervisorError::UnknownKind(e.to_string()))?;

		if let Some(task_id) = &options.task_graph_id {
			let rejected = self
				.enforcer
				.with_current(|e| e.validate_spawn(task_id).err())
				.flatten();
			if let Some(err) = rejected {
				return Err(SupervisorError::SpawnFailed(err.to_string()));
			}
		}

		let argv = Self::base_command(kind);
		let stdin_line = serde_json::json!({
			"preamble": descriptor.preamble,
			"prompt": prompt,
			"model_override": options.model_override,
			"thinking_budget": options.thinking_budget,
		})
		.to_string();

		let tier = descriptor.cost_tier;

		// The handle is created before admission is granted so a queued
		// (semaphore- or rate-limited) task is visible to `list`/`cancel`
		// before its child process ever starts.
		let handle_id = self.next_handle.fetch_add(1, Ordering::Relaxed);
		let (term_tx, mut term_rx) = oneshot::channel();
		{
			let mut handles = self.handles.lock().unwrap();
			handles.insert(
				handle_id,
				ChildRecord {
					kind: kind.to_string(),
					status: ChildStatus::Queued,
					stdout: Sink::new(),
					stderr: Sink::new(),
					term_tx: Some(term_tx),
					finished_at: None,
					retry_params: RetryParams {
						kind: kind.to_string(),
						prompt: prompt.to_string(),
						parent_kind: parent_kind.to_string(),
						options: SpawnOptionsSnapshot {
							blocking: options.blocking,
							task_graph_id: options.task_graph_id.clone(),
							model_override: options.model_override.clone(),
							thinking_budget: options.thinking_budget,
						},
					},
				},
			);
		}

		let _admission = tokio::select! {
			admission = self.limiter.acquire(tier) => admission,
			_ = &mut term_rx => {
				let mut handles = self.handles.lock().unwrap();
				if let Some(record) = handles.get_mut(&handle_id) {
					record.status = ChildStatus::Cancelled;
					record.finished_at = Some(Instant::now());
				}
				return Err(SupervisorError::Cancelled);
			}
		};

		let mut child = match self.launcher.launch(&argv, &stdin_line).await {
			Ok(child) => child,
			Err(e) => {
				let mut handles = self.handles.lock().unwrap();
				if let Some(record) = handles.get_mut(&handle_id) {
					record.status = ChildStatus::Failed;
					record.finished_at = Some(Instant::now());
				}
				return Err(SupervisorError::SpawnFailed(e.to_string()));
			}
		};

		let stdout_sink = Sink::new();
		let stderr_sink = Sink::new();
		if let Some(stdout) = child.take_stdout() {
			spawn_drain(stdout, stdout_sink.clone());
		}
		if let Some(stderr) = child.take_stderr() {
			spawn_drain(stderr, stderr_sink.clone());
		}

		if let Some(task_id) = &options.task_graph_id {
			self.enforcer
				.with_current(|e| e.record_spawn(task_id, handle_id));
		}

		{
			let mut handles = self.handles.lock().unwrap();
			if let Some(record) = handles.get_mut(&handle_id) {
				record.status = ChildStatus::Running;
				record.stdout = stdout_sink.clone();
				record.stderr = stderr_sink;
			}
		}

		let task_graph_id = options.task_graph_id.clone();
		let grace = Duration::from_millis(self.config.cancel_grace_ms);
		let handles = self.handles.clone();
		let enforcer = self.enforcer.clone();

		let monitor = monitor_child(
			handle_id,
			child,
			term_rx,
			grace,
			handles,
			enforcer,
			task_graph_id,
			_admission,
		);

		if options.blocking {
			monitor.await;
			let output = {
				let handles = self.handles.lock().unwrap();
				handles.get(&handle_id).map(|r| r.stdout.snapshot())
			};
			Ok((handle_id, output))
		} else {
			tokio::spawn(monitor);
			Ok((handle_id, None))
		}
	}

	/// Current contents of the output sink. If `block`, waits for exit first.
	pub async fn output(&self, handle_id: u64, block: bool) -> Result<Vec<u8>, SupervisorError> {
		if block {
			loop {
				let done = {
					let handles = self.handles.lock().unwrap();
					let record = handles
						.get(&handle_id)
						.ok_or(SupervisorError::UnknownHandle(handle_id))?;
					record.status != ChildStatus::Running
				};
				if done {
					break;
				}
				tokio::time::sleep(Duration::from_millis(10)).await;
			}
		}
		let handles = self.handles.lock().unwrap();
		let record = handles
			.get(&handle_id)
			.ok_or(SupervisorError::UnknownHandle(handle_id))?;
		Ok(record.stdout.snapshot())
	}

	/// Non-blocking tail of recently appended bytes, bounded by the
	/// configured cap.
	pub fn progress(&self, handle_id: u64) -> Result<Vec<u8>, SupervisorError> {
		let handles = self.handles.lock().unwrap();
		let record = handles
			.get(&handle_id)
			.ok_or(SupervisorError::UnknownHandle(handle_id))?;
		Ok(record.stdout.tail(self.config.progress_tail_cap))
	}

	/// Request termination: graceful first, forceful after the grace period.
	/// Idempotent: cancelling an already-terminal handle is a no-op.
	pub fn cancel(&self, handle_id: u64) -> Result<(), SupervisorError> {
		let mut handles = self.handles.lock().unwrap();
		let record = handles
			.get_mut(&handle_id)
			.ok_or(SupervisorError::UnknownHandle(handle_id))?;
		if let Some(term_tx) = record.term_tx.take() {
			let _ = term_tx.send(());
		}
		Ok(())
	}

	pub fn list(&self) -> Vec<(u64, String, ChildStatus)> {
		let handles = self.handles.lock().unwrap();
		handles
			.iter()
			.map(|(id, r)| (*id, r.kind.clone(), r.status))
			.collect()
	}

	/// Respawn a terminated handle's child with identical parameters under a
	/// new handle id.
	pub async fn retry(&self, handle_id: u64) -> Result<(u64, Option<Vec<u8>>), SupervisorError> {
		let params = {
			let handles = self.handles.lock().unwrap();
			let record = handles
				.get(&handle_id)
				.ok_or(SupervisorError::UnknownHandle(handle_id))?;
			if record.status == ChildStatus::Running {
				return Err(SupervisorError::SpawnFailed(
					"cannot retry a still-running handle".to_string(),
				));
			}
			RetryParams {
				kind: record.retry_params.kind.clone(),
				prompt: record.retry_params.prompt.clone(),
				parent_kind: record.retry_params.parent_kind.clone(),
				options: record.retry_params.options.clone(),
			}
		};
		self.spawn(
			&params.kind,
			&params.parent_kind,
			&params.prompt,
			SpawnOptions {
				blocking: params.options.blocking,
				task_graph_id: params.options.task_graph_id,
				model_override: params.options.model_override,
				thinking_budget: params.options.thinking_budget,
			},
		)
		.await
	}

	/// Reap terminated handles whose last activity predates `older_than`.
	pub fn cleanup(&self, older_than: Duration) {
		let now = Instant::now();
		let mut handles = self.handles.lock().unwrap();
		handles.retain(|_, record| match record.finished_at {
			Some(finished_at) => now.duration_since(finished_at) < older_than,
			None => true,
		});
	}
}

fn spawn_drain(mut reader: Box<dyn tokio::io::AsyncRead + Unpin + Send>, sink: Sink) {
	tokio::spawn(async move {
		let mut buf = [0u8; 4096];
		loop {
			match reader.read(&mut buf).await {
				Ok(0) | Err(_) => break,
				Ok(n) => sink.append(&buf[..n]),
			}
		}
	});
}

#[allow(clippy::too_many_arguments)]
async fn monitor_child(
	handle_id: u64,
	mut child: Box<dyn crate::launcher::ChildProcess>,
	mut term_rx: oneshot::Receiver<()>,
	grace: Duration,
	handles: Arc<Mutex<HashMap<u64, ChildRecord>>>,
	enforcer: EnforcerSlot,
	task_graph_id: Option<String>,
	_admission: crate::limiter::Admission,
) {
	let (outcome, cancelled) = tokio::select! {
		result = child.wait() => (result.map_err(|e| e.to_string()), false),
		_ = &mut term_rx => {
			let _ = child.start_kill();
			let result = match tokio::time::timeout(grace, child.wait()).await {
				Ok(result) => result.map_err(|e| e.to_string()),
				Err(_) => {
					let _ = child.start_kill();
					Err("killed after grace period".to_string())
				}
			};
			(result, true)
		}
	};

	let status = if cancelled {
		ChildStatus::Cancelled
	} else {
		match outcome {
			Ok(ExitOutcome::Success) => ChildStatus::Completed,
			_ => ChildStatus::Failed,
		}
	};

	{
		let mut handles = handles.lock().unwrap();
		if let Some(record) = handles.get_mut(&handle_id) {
			record.status = status;
			record.finished_at = Some(Instant::now());
		}
	}

	if let Some(task_id) = task_graph_id {
		let failure_reason = match &outcome {
			Ok(_) => "cancelled".to_string(),
			Err(e) => e.clone(),
		};
		enforcer.with_current(|e| match status {
			ChildStatus::Completed => {
				let _ = e.mark_completed(&task_id, Vec::new());
			}
			_ => {
				let _ = e.mark_failed(&task_id, failure_reason);
			}
		});
	}
}
