//! Static agent-kind registry.
//!
//! # Purpose
//!
//! Maps an agent kind name to its hierarchy class, cost tier, capability
//! set, and injected delegation preamble. The table is fixed at program
//! initialization and never mutated.
//!
//! # Key types
//!
//! | Type              | Role                                             |
//! |--------------------|---------------------------------------------------|
//! | [`Descriptor`]      | Full static profile of one kind                   |
//! | [`HierarchyClass`]  | `Orchestrator` (may spawn) or `Worker` (may not)  |
//! | [`CostTier`]        | Advisory `Cheap` / `Medium` / `Expensive`         |
//! | [`Capability`]      | One opaque permission tag                         |
//! | [`AgentRegistry`]   | Lookup over the static table                      |
//!
//! # Invariants
//!
//! 1. Every kind name in the table is unique.
//! 2. `lookup` on an unregistered name returns [`RegistryError::UnknownKind`],
//!    which is always fatal for the offending spawn.
//! 3. Cost tier never gates execution; it only seeds concurrency defaults
//!    and annotates logs.

mod descriptor;
mod error;
mod registry;

pub use descriptor::{Capability, CostTier, Descriptor, HierarchyClass};
pub use error::RegistryError;
pub use registry::AgentRegistry;
