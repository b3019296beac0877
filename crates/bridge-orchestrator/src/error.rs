//! Errors raised by the phase state machine.

use thiserror::Error;

use crate::phase::Phase;

/// Failure categories for [`crate::state::OrchestratorState::transition`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
	#[error("illegal transition {from} -> {to}")]
	IllegalTransition { from: Phase, to: Phase },

	#[error("missing artifacts for {phase}: {missing:?}")]
	MissingArtifacts {
		phase: Phase,
		missing: Vec<&'static str>,
	},

	#[error("critique budget exhausted: {counter} >= {max}")]
	CritiqueExhausted { counter: u32, max: u32 },

	#[error("gate denied transition {from} -> {to}")]
	GateDenied { from: Phase, to: Phase },
}

impl OrchestratorError {
	/// Whether the request can be retried after the caller addresses the cause.
	///
	/// None of the state-machine categories are recoverable within the same
	/// request; they indicate the caller drove the machine incorrectly.
	pub fn is_recoverable(&self) -> bool {
		false
	}
}
