//! Errors raised by the agent registry.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
	#[error("unknown agent kind: {0}")]
	UnknownKind(String),
}

impl RegistryError {
	/// Always fatal for the offending spawn; never recoverable by retry.
	pub fn is_recoverable(&self) -> bool {
		false
	}
}
