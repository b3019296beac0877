use bridge_orchestrator::{OrchestratorConfig, OrchestratorState, Phase};

#[test]
fn full_cycle_wraps_back_to_classify() {
	let mut state = OrchestratorState::new(OrchestratorConfig::default());
	state.register_artifact("classification", "x");
	state.transition(Phase::Context).unwrap();
	state.register_artifact("context", "y");
	state.transition(Phase::Wisdom).unwrap();
	state.transition(Phase::Plan).unwrap();
	state.register_artifact("plan", "z");
	state.transition(Phase::Validate).unwrap();
	state.register_artifact("validation", "ok");
	state.transition(Phase::Delegate).unwrap();
	state.register_artifact("delegation-targets", "[]");
	state.register_artifact("task-graph", "{}");
	state.transition(Phase::Execute).unwrap();
	state.register_artifact("execution-result", "done");
	state.transition(Phase::Verify).unwrap();
	state.transition(Phase::Classify).unwrap();

	assert_eq!(state.current(), Phase::Classify);
	assert_eq!(state.history().len(), 9);
	assert_eq!(state.summary().transition_count, 8);
}

#[test]
fn validate_rejection_returns_to_plan_and_spends_budget() {
	let mut state = OrchestratorState::new(OrchestratorConfig::default());
	state.register_artifact("classification", "x");
	state.transition(Phase::Context).unwrap();
	state.register_artifact("context", "y");
	state.transition(Phase::Plan).unwrap();
	state.register_artifact("plan", "v1");
	state.transition(Phase::Validate).unwrap();

	// Rejection: Validate -> Plan, one critique spent.
	state.transition(Phase::Plan).unwrap();
	assert_eq!(state.critique_counter(), 1);
}
