//! The phase enumeration and its static transition table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A step of the seven/eight-phase orchestration cycle.
///
/// `Wisdom` is optional: `Context` may transition directly to `Plan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
	Classify,
	Context,
	Wisdom,
	Plan,
	Validate,
	Delegate,
	Execute,
	Verify,
}

impl Phase {
	/// Legal successor phases of `self`, in declaration order.
	///
	/// `Plan` and `Execute` list themselves (self-loops for critique and retry).
	pub fn successors(self) -> &'static [Phase] {
		use Phase::*;
		match self {
			Classify => &[Context],
			Context => &[Wisdom, Plan],
			Wisdom => &[Plan],
			Plan => &[Validate, Plan],
			Validate => &[Delegate, Plan],
			Delegate => &[Execute],
			Execute => &[Verify, Execute],
			Verify => &[Classify],
		}
	}

	/// Whether `target` is a legal successor of `self`.
	pub fn can_reach(self, target: Phase) -> bool {
		self.successors().contains(&target)
	}

	/// Artifact names required to be present before entering `self` under strict mode.
	pub fn required_artifacts(self) -> &'static [&'static str] {
		use Phase::*;
		match self {
			Classify => &[],
			Context => &["classification"],
			Wisdom => &["context"],
			Plan => &[],
			Validate => &["plan"],
			Delegate => &["validation"],
			Execute => &["delegation-targets", "task-graph"],
			Verify => &["execution-result"],
		}
	}

	/// Whether a transition `from -> self` consumes one unit of the critique budget.
	///
	/// Only `Plan -> Plan` and `Validate -> Plan` count; entering `Plan` from
	/// `Context` or `Wisdom` is the first attempt and does not.
	pub fn is_critique_entry(self, from: Phase) -> bool {
		self == Phase::Plan && matches!(from, Phase::Plan | Phase::Validate)
	}
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}
