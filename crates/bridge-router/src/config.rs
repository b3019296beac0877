//! Process-wide configuration, threaded into every sub-crate.

use std::path::{Path, PathBuf};

use bridge_orchestrator::OrchestratorConfig;
use bridge_graph::EnforcerConfig;
use bridge_supervisor::SupervisorConfig;

/// Aggregates every sub-crate's tunables. Constructed once by the caller and
/// shared via `Arc`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
	pub orchestrator: OrchestratorConfig,
	pub enforcer: EnforcerConfig,
	pub supervisor: SupervisorConfig,
	/// Directory for best-effort sidecar files. `None` disables sidecar writes.
	pub sidecar_dir: Option<PathBuf>,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			orchestrator: OrchestratorConfig::default(),
			enforcer: EnforcerConfig::default(),
			supervisor: SupervisorConfig::default(),
			sidecar_dir: None,
		}
	}
}

impl BridgeConfig {
	/// Load from a TOML file at `path`. A missing file or unparseable
	/// contents fall back to [`Default::default`] rather than panicking;
	/// missing keys within a present file fall back per-field via `serde`.
	pub async fn load(path: &Path) -> Self {
		match tokio::fs::read_to_string(path).await {
			Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
				tracing::warn!(error = %e, path = %path.display(), "failed to parse bridge config, using defaults");
				Self::default()
			}),
			Err(e) => {
				tracing::debug!(error = %e, path = %path.display(), "no bridge config file, using defaults");
				Self::default()
			}
		}
	}

	/// The default config path: `$XDG_CONFIG_HOME/bridge/config.toml` (or
	/// platform equivalent via `dirs`).
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|d| d.join("bridge").join("config.toml"))
	}
}
