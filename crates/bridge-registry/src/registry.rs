//! The static kind -> descriptor table.

use crate::descriptor::{Capability, CostTier, Descriptor, HierarchyClass};
use crate::error::RegistryError;

use Capability::{FileRead, FileWrite, ModelInvoke, Spawn, WebFetch};
use CostTier::{Cheap, Expensive, Medium};
use HierarchyClass::{Orchestrator, Worker};

const TABLE: &[Descriptor] = &[
	Descriptor {
		kind: "orchestrator",
		hierarchy: Orchestrator,
		cost_tier: Expensive,
		capabilities: &[Spawn, FileRead, FileWrite, WebFetch],
		preamble: "You are the orchestrator. Decompose the task and delegate to worker agents; do not perform file edits yourself.",
	},
	Descriptor {
		kind: "planner",
		hierarchy: Orchestrator,
		cost_tier: Expensive,
		capabilities: &[FileRead, WebFetch, ModelInvoke],
		preamble: "You are a thin wrapper. Immediately call the planning tool with the given context and return its output verbatim.",
	},
	Descriptor {
		kind: "reviewer",
		hierarchy: Orchestrator,
		cost_tier: Medium,
		capabilities: &[FileRead, ModelInvoke],
		preamble: "You are a thin wrapper. Immediately call the review tool with the given artifact and return its critique verbatim.",
	},
	Descriptor {
		kind: "searcher",
		hierarchy: Worker,
		cost_tier: Cheap,
		capabilities: &[FileRead, WebFetch],
		preamble: "You are a thin wrapper. Immediately call the search tool with the given query and return its results verbatim.",
	},
	Descriptor {
		kind: "reader",
		hierarchy: Worker,
		cost_tier: Cheap,
		capabilities: &[FileRead],
		preamble: "You are a thin wrapper. Immediately read the given file and return its contents verbatim.",
	},
	Descriptor {
		kind: "debugger",
		hierarchy: Worker,
		cost_tier: Medium,
		capabilities: &[FileRead, FileWrite, ModelInvoke],
		preamble: "You are a thin wrapper. Immediately call the debugging tool with the given failure context and return its diagnosis verbatim.",
	},
	Descriptor {
		kind: "refactorer",
		hierarchy: Worker,
		cost_tier: Medium,
		capabilities: &[FileRead, FileWrite],
		preamble: "You are a thin wrapper. Immediately apply the given refactor and return a summary of the edits.",
	},
	Descriptor {
		kind: "tester",
		hierarchy: Worker,
		cost_tier: Medium,
		capabilities: &[FileRead, FileWrite, ModelInvoke],
		preamble: "You are a thin wrapper. Immediately write or run the given tests and return their results verbatim.",
	},
	Descriptor {
		kind: "summarizer",
		hierarchy: Worker,
		cost_tier: Cheap,
		capabilities: &[ModelInvoke],
		preamble: "You are a thin wrapper. Immediately call the summarization tool with the given text and return its output verbatim.",
	},
	Descriptor {
		kind: "verifier",
		hierarchy: Worker,
		cost_tier: Medium,
		capabilities: &[FileRead, ModelInvoke],
		preamble: "You are a thin wrapper. Immediately call the verification tool against the given claim and return its verdict verbatim.",
	},
	Descriptor {
		kind: "scout",
		hierarchy: Worker,
		cost_tier: Cheap,
		capabilities: &[WebFetch],
		preamble: "You are a thin wrapper. Immediately fetch the given resource and return its contents verbatim.",
	},
	Descriptor {
		kind: "gemini-wrapper",
		hierarchy: Worker,
		cost_tier: Expensive,
		capabilities: &[ModelInvoke],
		preamble: "You are a thin wrapper around the Gemini provider. Immediately forward the given prompt and return its response verbatim.",
	},
];

/// Lookup over the static kind table.
///
/// Construction is infallible; the table is built once at program
/// initialization and never mutated afterward.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgentRegistry;

impl AgentRegistry {
	pub fn new() -> Self {
		Self
	}

	pub fn lookup(&self, kind: &str) -> Result<&'static Descriptor, RegistryError> {
		TABLE
			.iter()
			.find(|d| d.kind == kind)
			.ok_or_else(|| RegistryError::UnknownKind(kind.to_string()))
	}

	pub fn kinds(&self) -> impl Iterator<Item = &'static str> {
		TABLE.iter().map(|d| d.kind)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_kind_resolves_to_itself() {
		let registry = AgentRegistry::new();
		for kind in registry.kinds() {
			let descriptor = registry.lookup(kind).unwrap();
			assert_eq!(descriptor.kind, kind);
		}
	}

	#[test]
	fn orchestrator_may_spawn_worker_may_not() {
		let registry = AgentRegistry::new();
		assert!(registry.lookup("orchestrator").unwrap().may_spawn());
		assert!(!registry.lookup("reader").unwrap().may_spawn());
	}

	#[test]
	fn unknown_kind_is_rejected() {
		let registry = AgentRegistry::new();
		assert_eq!(
			registry.lookup("ghost").unwrap_err(),
			RegistryError::UnknownKind("ghost".to_string())
		);
	}

	#[test]
	fn table_has_twelve_kinds() {
		let registry = AgentRegistry::new();
		assert_eq!(registry.kinds().count(), 12);
	}
}
