//! The unifying error type returned by [`crate::router::RequestRouter`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
	#[error(transparent)]
	Orchestrator(#[from] bridge_orchestrator::OrchestratorError),

	#[error(transparent)]
	Graph(#[from] bridge_graph::GraphError),

	#[error(transparent)]
	Registry(#[from] bridge_registry::RegistryError),

	#[error(transparent)]
	Supervisor(#[from] bridge_supervisor::SupervisorError),

	#[error("request was cancelled")]
	Cancelled,
}

impl BridgeError {
	/// Whether the caller may retry the operation that produced this error.
	pub fn is_recoverable(&self) -> bool {
		match self {
			BridgeError::Supervisor(e) => e.is_recoverable(),
			BridgeError::Cancelled => true,
			_ => false,
		}
	}

	/// Whether this error terminates the whole request, as opposed to just
	/// the operation that raised it (e.g. a single child spawn).
	pub fn is_fatal_for_request(&self) -> bool {
		match self {
			BridgeError::Orchestrator(_) => true,
			// `check_compliance` only ever raises `GraphError::ParallelExecution`
			// when the enforcer is strict, so any graph error reaching here is
			// fatal for the request by construction.
			BridgeError::Graph(_) => true,
			BridgeError::Registry(_) => false,
			BridgeError::Supervisor(e) => !e.is_recoverable(),
			BridgeError::Cancelled => true,
		}
	}
}
