//! Append-only byte sinks backing a child's captured stdout/stderr.

use std::sync::{Arc, Mutex};

/// Shared, append-only byte buffer. Cheap to clone; all clones see the same
/// underlying bytes.
#[derive(Debug, Clone, Default)]
pub struct Sink {
	buf: Arc<Mutex<Vec<u8>>>,
}

impl Sink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn append(&self, bytes: &[u8]) {
		self.buf.lock().unwrap().extend_from_slice(bytes);
	}

	/// Full contents accumulated so far.
	pub fn snapshot(&self) -> Vec<u8> {
		self.buf.lock().unwrap().clone()
	}

	/// Up to `cap` trailing bytes, for a cheap non-blocking progress read.
	pub fn tail(&self, cap: usize) -> Vec<u8> {
		let buf = self.buf.lock().unwrap();
		let start = buf.len().saturating_sub(cap);
		buf[start..].to_vec()
	}
}
