//! Per-request tunables for the orchestrator state machine.

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::state::OrchestratorState`].
///
/// Deserializable so a `bridge-router`-level config file can override the
/// defaults; every field has a sensible default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
	/// Maximum number of Plan self-loops plus Validate->Plan returns.
	pub max_critiques: u32,
	/// Whether required-artifact preconditions are enforced on transition.
	pub strict_mode: bool,
	/// Whether an external gate callback must approve each transition.
	pub gate_enabled: bool,
}

impl Default for OrchestratorConfig {
	fn default() -> Self {
		Self {
			max_critiques: 3,
			strict_mode: true,
			gate_enabled: false,
		}
	}
}
