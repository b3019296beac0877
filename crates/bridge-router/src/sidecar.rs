//! Best-effort, write-only sidecar persistence.
//!
//! Appends one line-framed JSON object per transition and per wave close.
//! Advisory only: the router never reads these back within a run.

use std::path::PathBuf;

use serde::Serialize;
use tokio::io::AsyncWriteExt;

#[derive(Serialize)]
struct SidecarLine<'a> {
	ts: String,
	kind: &'a str,
	payload: serde_json::Value,
}

/// Appends line-framed JSON records to a single sidecar file.
pub struct SidecarAppender {
	path: Option<PathBuf>,
}

impl SidecarAppender {
	/// `None` disables all writes, so a request with no configured
	/// `sidecar_dir` pays no cost beyond a branch per call.
	pub fn new(path: Option<PathBuf>) -> Self {
		Self { path }
	}

	pub async fn append(&self, kind: &str, payload: serde_json::Value) {
		let Some(path) = &self.path else { return };
		let line = SidecarLine {
			ts: chrono::Utc::now().to_rfc3339(),
			kind,
			payload,
		};
		let Ok(mut serialized) = serde_json::to_vec(&line) else {
			return;
		};
		serialized.push(b'\n');

		let result = async {
			let mut file = tokio::fs::OpenOptions::new()
				.create(true)
				.append(true)
				.open(path)
				.await?;
			file.write_all(&serialized).await
		}
		.await;

		if let Err(e) = result {
			tracing::warn!(error = %e, path = %path.display(), "failed to append sidecar record");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn disabled_appender_writes_nothing() {
		let appender = SidecarAppender::new(None);
		appender.append("transition", serde_json::json!({})).await;
	}

	#[tokio::test]
	async fn appends_one_json_line_per_call() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("sidecar.jsonl");
		let appender = SidecarAppender::new(Some(path.clone()));
		appender
			.append("transition", serde_json::json!({"from": "Classify", "to": "Context"}))
			.await;
		appender
			.append("wave-close", serde_json::json!({"wave_index": 0}))
			.await;

		let contents = tokio::fs::read_to_string(&path).await.unwrap();
		let lines: Vec<&str> = contents.lines().collect();
		assert_eq!(lines.len(), 2);
		for line in lines {
			let value: serde_json::Value = serde_json::from_str(line).unwrap();
			assert!(value.get("ts").is_some());
			assert!(value.get("kind").is_some());
		}
	}
}
