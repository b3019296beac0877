//! Per-kind static facts: hierarchy, cost, capabilities, delegation preamble.

/// Where a kind sits in the spawn hierarchy.
///
/// Orchestrator kinds may spawn any kind; worker kinds may spawn none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyClass {
	Orchestrator,
	Worker,
}

/// Advisory cost tier, used only to seed the concurrency limiter's default
/// budgets and to annotate logs. Never gates whether a kind may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostTier {
	Cheap,
	Medium,
	Expensive,
}

/// A single capability a kind's child process is permitted to exercise.
///
/// The core treats these as opaque tags; enforcement, if any, lives in the
/// tool surface the child process itself is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
	FileRead,
	FileWrite,
	WebFetch,
	ModelInvoke,
	Spawn,
}

/// The full static profile of one agent kind.
#[derive(Debug, Clone)]
pub struct Descriptor {
	pub kind: &'static str,
	pub hierarchy: HierarchyClass,
	pub cost_tier: CostTier,
	pub capabilities: &'static [Capability],
	/// Prepended to the child's inbound prompt at spawn time. Opaque to the
	/// core; typically instructs the child to act as a thin wrapper around a
	/// single provider tool call.
	pub preamble: &'static str,
}

impl Descriptor {
	pub fn may_spawn(&self) -> bool {
		matches!(self.hierarchy, HierarchyClass::Orchestrator)
	}

	pub fn has_capability(&self, cap: Capability) -> bool {
		self.capabilities.contains(&cap)
	}
}
