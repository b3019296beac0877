//! Per-request orchestrator state: the mutable half of the phase machine.

use std::collections::HashMap;
use std::time::{Instant, SystemTime};

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::phase::Phase;

/// An opaque, named blob produced by one phase and consumed by another.
///
/// Content is transparent to the core; only the name is meaningful.
#[derive(Debug, Clone)]
pub struct Artifact {
	pub name: String,
	pub content: Vec<u8>,
}

/// One entry of the append-only transition log.
#[derive(Debug, Clone)]
pub struct TransitionRecord {
	pub from: Phase,
	pub to: Phase,
	pub wall_clock: SystemTime,
	pub monotonic: Instant,
}

/// A callback consulted before every transition when `gate_enabled` is set.
///
/// Returning `false` denies the transition with [`OrchestratorError::GateDenied`].
pub type GateCallback = Box<dyn Fn(Phase, Phase) -> bool + Send + Sync>;

/// Observability snapshot returned by [`OrchestratorState::summary`].
#[derive(Debug, Clone)]
pub struct StateSummary {
	pub current: Phase,
	pub history: Vec<Phase>,
	pub artifact_names: Vec<String>,
	pub critique_counter: u32,
	pub gate_enabled: bool,
	pub transition_count: usize,
}

/// The mutable per-request half of the orchestration state machine.
///
/// Lives for exactly one user request. Not shared across requests; the
/// router drives it from a single logical thread of control, so no internal
/// synchronization is needed (contrast with [`bridge-graph`]'s task graph,
/// which is also touched by child-completion callbacks).
pub struct OrchestratorState {
	current: Phase,
	history: Vec<Phase>,
	artifacts: HashMap<String, Artifact>,
	log: Vec<TransitionRecord>,
	critique_counter: u32,
	config: OrchestratorConfig,
	gate: Option<GateCallback>,
}

impl OrchestratorState {
	/// Start a new request at `Classify` with the given configuration.
	pub fn new(config: OrchestratorConfig) -> Self {
		Self {
			current: Phase::Classify,
			history: vec![Phase::Classify],
			artifacts: HashMap::new(),
			log: Vec::new(),
			critique_counter: 0,
			config,
			gate: None,
		}
	}

	/// Install a gate callback, replacing any previous one.
	pub fn set_gate(&mut self, gate_enabled: bool, gate: Option<GateCallback>) {
		self.config.gate_enabled = gate_enabled;
		self.gate = gate;
	}

	pub fn current(&self) -> Phase {
		self.current
	}

	pub fn config(&self) -> &OrchestratorConfig {
		&self.config
	}

	/// Store `content` under `name`. Always succeeds; overwrites silently.
	///
	/// Overwriting an artifact does not alter the transition log — only a
	/// transition that legitimately re-produces the artifact (e.g. a Plan
	/// critique loop) is expected to call this again for the same name.
	pub fn register_artifact(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
		let name = name.into();
		self.artifacts.insert(
			name.clone(),
			Artifact {
				name,
				content: content.into(),
			},
		);
	}

	/// List of required artifacts for `target` that have not been registered.
	pub fn missing_artifacts(&self, target: Phase) -> Vec<&'static str> {
		target
			.required_artifacts()
			.iter()
			.copied()
			.filter(|name| !self.artifacts.contains_key(*name))
			.collect()
	}

	/// Pure precondition check; performs no mutation and raises no error.
	pub fn can_transition(&self, target: Phase) -> bool {
		self.check(target).is_ok()
	}

	fn check(&self, target: Phase) -> Result<(), OrchestratorError> {
		if !self.current.can_reach(target) {
			return Err(OrchestratorError::IllegalTransition {
				from: self.current,
				to: target,
			});
		}

		if self.config.strict_mode {
			let missing = self.missing_artifacts(target);
			if !missing.is_empty() {
				return Err(OrchestratorError::MissingArtifacts {
					phase: target,
					missing,
				});
			}
		}

		if target.is_critique_entry(self.current) && self.critique_counter >= self.config.max_critiques
		{
			return Err(OrchestratorError::CritiqueExhausted {
				counter: self.critique_counter,
				max: self.config.max_critiques,
			});
		}

		Ok(())
	}

	/// Validate and, if accepted, perform the transition to `target`.
	///
	/// Order of checks: legality, strict-mode artifacts, critique budget,
	/// gate callback, so domain errors are reported before the permission
	/// error.
	pub fn transition(&mut self, target: Phase) -> Result<(), OrchestratorError> {
		self.check(target)?;

		if self.config.gate_enabled
			&& let Some(gate) = &self.gate
			&& !gate(self.current, target)
		{
			return Err(OrchestratorError::GateDenied {
				from: self.current,
				to: target,
			});
		}

		let is_critique = target.is_critique_entry(self.current);
		let from = self.current;

		self.log.push(TransitionRecord {
			from,
			to: target,
			wall_clock: SystemTime::now(),
			monotonic: Instant::now(),
		});
		self.current = target;
		self.history.push(target);
		if is_critique {
			self.critique_counter += 1;
		}

		tracing::info!(?from, to = ?target, critiques = self.critique_counter, "phase transition");

		Ok(())
	}

	pub fn history(&self) -> &[Phase] {
		&self.history
	}

	pub fn log(&self) -> &[TransitionRecord] {
		&self.log
	}

	pub fn critique_counter(&self) -> u32 {
		self.critique_counter
	}

	/// Structured observability record for the current state.
	pub fn summary(&self) -> StateSummary {
		StateSummary {
			current: self.current,
			history: self.history.clone(),
			artifact_names: self.artifacts.keys().cloned().collect(),
			critique_counter: self.critique_counter,
			gate_enabled: self.config.gate_enabled,
			transition_count: self.log.len(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn state() -> OrchestratorState {
		OrchestratorState::new(OrchestratorConfig::default())
	}

	#[test]
	fn happy_path_classify_to_execute() {
		let mut s = state();
		s.register_artifact("classification", "x");
		s.transition(Phase::Context).unwrap();
		s.register_artifact("context", "y");
		s.transition(Phase::Plan).unwrap();
		assert_eq!(s.critique_counter(), 0);
		s.register_artifact("plan", "z");
		s.transition(Phase::Validate).unwrap();
		s.register_artifact("validation", "ok");
		s.transition(Phase::Delegate).unwrap();
		s.register_artifact("delegation-targets", "[]");
		s.register_artifact("task-graph", "{}");
		s.transition(Phase::Execute).unwrap();
		assert_eq!(s.current(), Phase::Execute);
	}

	#[test]
	fn missing_artifact_blocks_transition() {
		let mut s = state();
		let err = s.transition(Phase::Context).unwrap_err();
		assert!(matches!(err, OrchestratorError::MissingArtifacts { .. }));
	}

	#[test]
	fn illegal_transition_is_rejected() {
		let mut s = state();
		s.register_artifact("classification", "x");
		let err = s.transition(Phase::Execute).unwrap_err();
		assert!(matches!(err, OrchestratorError::IllegalTransition { .. }));
	}

	#[test]
	fn context_to_plan_does_not_spend_critique_budget() {
		let mut s = state();
		s.register_artifact("classification", "x");
		s.transition(Phase::Context).unwrap();
		s.register_artifact("context", "y");
		s.transition(Phase::Plan).unwrap();
		assert_eq!(s.critique_counter(), 0);
	}

	#[test]
	fn critique_budget_exhaustion_blocks_further_revision() {
		// current=Plan, counter=3, max=3: Plan->Validate ok, Validate->Plan fails.
		let mut s = OrchestratorState::new(OrchestratorConfig {
			max_critiques: 3,
			..Default::default()
		});
		s.register_artifact("classification", "x");
		s.transition(Phase::Context).unwrap();
		s.register_artifact("context", "y");
		s.transition(Phase::Plan).unwrap();
		s.register_artifact("plan", "v1");
		for _ in 0..3 {
			s.transition(Phase::Validate).unwrap();
			s.transition(Phase::Plan).unwrap();
			s.register_artifact("plan", "vN");
		}
		assert_eq!(s.critique_counter(), 3);
		s.transition(Phase::Validate).unwrap();
		let err = s.transition(Phase::Plan).unwrap_err();
		assert!(matches!(err, OrchestratorError::CritiqueExhausted { .. }));
	}

	#[test]
	fn gate_denied_blocks_transition() {
		let mut s = state();
		s.register_artifact("classification", "x");
		s.set_gate(true, Some(Box::new(|_from, _to| false)));
		let err = s.transition(Phase::Context).unwrap_err();
		assert!(matches!(err, OrchestratorError::GateDenied { .. }));
	}

	#[test]
	fn artifact_overwrite_does_not_touch_log() {
		let mut s = state();
		s.register_artifact("classification", "x");
		s.register_artifact("classification", "y");
		assert_eq!(s.log().len(), 0);
		assert!(s.missing_artifacts(Phase::Context).is_empty());
	}

	#[test]
	fn non_strict_mode_skips_artifact_check() {
		let mut s = OrchestratorState::new(OrchestratorConfig {
			strict_mode: false,
			..Default::default()
		});
		assert!(s.transition(Phase::Context).is_ok());
	}
}
