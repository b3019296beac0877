//! Per-request driver tying the orchestrator, task graph, registry, and
//! supervisor crates into the end-to-end request cycle.
//!
//! | Type | Role |
//! |---|---|
//! | [`RequestRouter`] | Drives one request through Classify -> ... -> Verify. |
//! | [`RequestHooks`] | Caller-supplied closures for the external collaborators. |
//! | [`TaskSpec`] | One delegation-plan node turned into a graph task. |
//! | [`BridgeConfig`] | Aggregated configuration for all four subsystems. |
//! | [`BridgeError`] | Unified error type across the four subsystems. |
//!
//! Invariants:
//! - `drive` never leaves the enforcer slot installed past its own return.
//! - Sidecar writes are best-effort and never fail a request.
//! - A task whose `kind` the registry does not recognize fails plan-build,
//!   before any subprocess is spawned.

mod config;
mod error;
mod router;
mod sidecar;

pub use config::BridgeConfig;
pub use error::BridgeError;
pub use router::{RequestHooks, RequestRouter, TaskSpec};
pub use sidecar::SidecarAppender;
