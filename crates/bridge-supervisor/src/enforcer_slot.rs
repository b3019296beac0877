//! The process-wide "current enforcer" indirection slot.
//!
//! The supervisor does not own a [`DelegationEnforcer`]; it consults this
//! slot so the enforcer can be installed and cleared per request without
//! creating an ownership cycle between the supervisor and the task graph.

use std::sync::{Arc, Mutex};

use bridge_graph::DelegationEnforcer;

/// A mutable pointer slot, guarded by a mutex, holding at most one active
/// enforcer at a time.
#[derive(Clone, Default)]
pub struct EnforcerSlot {
	current: Arc<Mutex<Option<Arc<Mutex<DelegationEnforcer>>>>>,
}

impl EnforcerSlot {
	pub fn new() -> Self {
		Self::default()
	}

	/// Install `enforcer` as the active one, returning whatever was
	/// previously installed (normally `None`).
	pub fn install(&self, enforcer: DelegationEnforcer) -> Option<Arc<Mutex<DelegationEnforcer>>> {
		self.current
			.lock()
			.unwrap()
			.replace(Arc::new(Mutex::new(enforcer)))
	}

	/// Clear the slot, returning the enforcer that was installed, if any.
	pub fn clear(&self) -> Option<Arc<Mutex<DelegationEnforcer>>> {
		self.current.lock().unwrap().take()
	}

	/// Run `f` against the currently installed enforcer, if any.
	pub fn with_current<R>(&self, f: impl FnOnce(&mut DelegationEnforcer) -> R) -> Option<R> {
		let guard = self.current.lock().unwrap();
		let enforcer = guard.as_ref()?;
		Some(f(&mut enforcer.lock().unwrap()))
	}
}

/// RAII guard that clears the slot on drop, giving the router scoped
/// acquisition even across early returns.
pub struct InstalledEnforcer {
	slot: EnforcerSlot,
}

impl EnforcerSlot {
	/// Install `enforcer` and return a guard that clears the slot on drop.
	pub fn install_scoped(&self, enforcer: DelegationEnforcer) -> InstalledEnforcer {
		self.install(enforcer);
		InstalledEnforcer { slot: self.clone() }
	}
}

impl Drop for InstalledEnforcer {
	fn drop(&mut self) {
		self.slot.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bridge_graph::{EnforcerConfig, TaskGraph};

	#[test]
	fn install_then_clear_round_trips() {
		let slot = EnforcerSlot::new();
		let mut graph = TaskGraph::new();
		graph.add_task("a", "", "cheap", vec![]).unwrap();
		let enforcer = DelegationEnforcer::new(graph, EnforcerConfig::default()).unwrap();

		assert!(slot.install(enforcer).is_none());
		assert!(slot.with_current(|e| e.current_wave().len()).is_some());
		assert!(slot.clear().is_some());
		assert!(slot.with_current(|e| e.current_wave().len()).is_none());
	}

	#[test]
	fn scoped_guard_clears_on_drop() {
		let slot = EnforcerSlot::new();
		let mut graph = TaskGraph::new();
		graph.add_task("a", "", "cheap", vec![]).unwrap();
		let enforcer = DelegationEnforcer::new(graph, EnforcerConfig::default()).unwrap();

		{
			let _guard = slot.install_scoped(enforcer);
			assert!(slot.with_current(|_| ()).is_some());
		}
		assert!(slot.with_current(|_| ()).is_none());
	}
}
