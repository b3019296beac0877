//! Child-process launching abstraction for production and testing.

use std::future::Future;
use std::io;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::Command;

/// Outcome of a child process that has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
	Success,
	Failure { code: Option<i32> },
}

impl ExitOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, ExitOutcome::Success)
	}
}

/// A live child process: its stdio streams and termination controls.
///
/// This abstraction allows the supervisor to use real subprocesses in
/// production and in-memory fakes for testing.
pub trait ChildProcess: Send {
	/// Take ownership of the child's stdout. Returns `None` if already taken.
	fn take_stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;

	/// Take ownership of the child's stderr. Returns `None` if already taken.
	fn take_stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;

	/// Request graceful termination (e.g. `SIGTERM` on unix).
	fn start_kill(&mut self) -> io::Result<()>;

	/// Wait for the process to exit.
	fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitOutcome>> + Send + '_>>;
}

struct RealChild {
	child: tokio::process::Child,
}

impl ChildProcess for RealChild {
	fn take_stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
		self.child
			.stdout
			.take()
			.map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
	}

	fn take_stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
		self.child
			.stderr
			.take()
			.map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
	}

	fn start_kill(&mut self) -> io::Result<()> {
		self.child.start_kill()
	}

	fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitOutcome>> + Send + '_>> {
		Box::pin(async move {
			let status = self.child.wait().await?;
			Ok(if status.success() {
				ExitOutcome::Success
			} else {
				ExitOutcome::Failure {
					code: status.code(),
				}
			})
		})
	}
}

/// Launches one child process given its argv and a single line of JSON to
/// write to stdin.
pub trait ChildLauncher: Send + Sync + 'static {
	fn launch(
		&self,
		argv: &[String],
		stdin_line: &str,
	) -> Pin<Box<dyn Future<Output = io::Result<Box<dyn ChildProcess>>> + Send>>;
}

/// Production launcher that spawns real OS processes via `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
	#[must_use]
	pub fn new() -> Self {
		Self
	}
}

impl ChildLauncher for ProcessLauncher {
	fn launch(
		&self,
		argv: &[String],
		stdin_line: &str,
	) -> Pin<Box<dyn Future<Output = io::Result<Box<dyn ChildProcess>>> + Send>> {
		let Some((program, args)) = argv.split_first() else {
			return Box::pin(async {
				Err(io::Error::new(io::ErrorKind::InvalidInput, "empty argv"))
			});
		};
		let program = program.clone();
		let args = args.to_vec();
		let stdin_line = format!("{stdin_line}\n");

		Box::pin(async move {
			let mut child = Command::new(&program)
				.args(&args)
				.stdin(std::process::Stdio::piped())
				.stdout(std::process::Stdio::piped())
				.stderr(std::process::Stdio::piped())
				.spawn()
				.map_err(|e| {
					tracing::error!(error = %e, program = %program, "failed to spawn child process");
					e
				})?;

			if let Some(mut stdin) = child.stdin.take() {
				stdin.write_all(stdin_line.as_bytes()).await?;
				stdin.shutdown().await?;
			}

			Ok(Box::new(RealChild { child }) as Box<dyn ChildProcess>)
		})
	}
}

/// Test helpers for running the supervisor against in-memory fake children.
#[doc(hidden)]
pub mod test_helpers {
	use super::*;
	use std::collections::VecDeque;
	use std::sync::Mutex;

	/// A fake child process that replays canned stdout and an exit outcome.
	pub struct FakeChildProcess {
		stdout: Option<Box<dyn AsyncRead + Unpin + Send>>,
		outcome: ExitOutcome,
	}

	impl FakeChildProcess {
		#[must_use]
		pub fn new(stdout_bytes: Vec<u8>, outcome: ExitOutcome) -> Self {
			Self {
				stdout: Some(Box::new(std::io::Cursor::new(stdout_bytes))),
				outcome,
			}
		}
	}

	impl ChildProcess for FakeChildProcess {
		fn take_stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
			self.stdout.take()
		}

		fn take_stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
			None
		}

		fn start_kill(&mut self) -> io::Result<()> {
			Ok(())
		}

		fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitOutcome>> + Send + '_>> {
			let outcome = self.outcome;
			Box::pin(async move { Ok(outcome) })
		}
	}

	/// A launcher that hands out pre-scripted [`FakeChildProcess`]es, one per
	/// queued script, in call order.
	pub struct TestLauncher {
		scripts: Mutex<VecDeque<(Vec<u8>, ExitOutcome)>>,
	}

	impl TestLauncher {
		#[must_use]
		pub fn new(scripts: Vec<(Vec<u8>, ExitOutcome)>) -> Self {
			Self {
				scripts: Mutex::new(scripts.into()),
			}
		}
	}

	impl ChildLauncher for TestLauncher {
		fn launch(
			&self,
			_argv: &[String],
			_stdin_line: &str,
		) -> Pin<Box<dyn Future<Output = io::Result<Box<dyn ChildProcess>>> + Send>> {
			let next = self.scripts.lock().unwrap().pop_front();
			Box::pin(async move {
				let Some((stdout, outcome)) = next else {
					return Err(io::Error::new(io::ErrorKind::Other, "no more scripted children"));
				};
				Ok(Box::new(FakeChildProcess::new(stdout, outcome)) as Box<dyn ChildProcess>)
			})
		}
	}

	/// A fake child that never exits on its own and ignores `start_kill`,
	/// for exercising the grace-period forceful-kill path.
	pub struct HangingChildProcess;

	impl ChildProcess for HangingChildProcess {
		fn take_stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
			None
		}

		fn take_stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
			None
		}

		fn start_kill(&mut self) -> io::Result<()> {
			Ok(())
		}

		fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitOutcome>> + Send + '_>> {
			Box::pin(std::future::pending())
		}
	}

	/// Hands out a fresh [`HangingChildProcess`] on every call.
	pub struct HangingLauncher;

	impl ChildLauncher for HangingLauncher {
		fn launch(
			&self,
			_argv: &[String],
			_stdin_line: &str,
		) -> Pin<Box<dyn Future<Output = io::Result<Box<dyn ChildProcess>>> + Send>> {
			Box::pin(async move { Ok(Box::new(HangingChildProcess) as Box<dyn ChildProcess>) })
		}
	}
}
