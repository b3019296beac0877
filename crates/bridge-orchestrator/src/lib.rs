//! Phase state machine and per-request orchestrator state.
//!
//! # Purpose
//!
//! Owns the seven/eight-phase cycle (Classify -> Context -> \[Wisdom\] ->
//! Plan -> Validate -> Delegate -> Execute -> Verify) and the per-request
//! object that tracks progress through it: current phase, the artifact
//! store, the transition log, and the bounded Plan/Validate critique loop.
//!
//! # Key types
//!
//! | Type | Role |
//! |---|---|
//! | [`Phase`] | Static enum + transition table. |
//! | [`OrchestratorState`] | Mutable per-request state machine. |
//! | [`OrchestratorConfig`] | Tunable defaults (`max_critiques = 3`, strict mode on). |
//! | [`OrchestratorError`] | The four state-machine failure categories. |
//!
//! # Invariants
//!
//! 1. The transition log is append-only; no entry is ever mutated or removed.
//! 2. `current` only ever holds a value reached through a successful `transition` call.
//! 3. The critique counter never exceeds `max_critiques`; only `Plan->Plan` and
//!    `Validate->Plan` increment it.

mod config;
mod error;
mod phase;
mod state;

pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use phase::Phase;
pub use state::{Artifact, GateCallback, OrchestratorState, StateSummary, TransitionRecord};
