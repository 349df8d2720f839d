//! Compute engine process management
//!
//! Handles launching the engine, feeding it the startup script, and owning
//! the child process until it is shut down.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, warn};

use crate::engine::ENGINE_ARGS;
use crate::error::{Error, Result};
use crate::startup::StartupScript;

/// Time allowed for a graceful exit before the engine is killed.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Owns a running engine process and the HTTP front-end it hosts.
///
/// The engine keeps reading commands from stdin, so stdin is held open for
/// the lifetime of the server. Dropping an `EngineServer` without calling
/// [`shutdown`](Self::shutdown) or [`kill`](Self::kill) still kills the
/// process, but logs a warning.
#[derive(Debug)]
pub struct EngineServer {
	process: Child,
	stdin: Option<ChildStdin>,
}

impl EngineServer {
	/// Launch the engine at `executable` and start the front-end with `script`.
	///
	/// # Errors
	///
	/// Returns `Error::LaunchFailed` if the process cannot be spawned or the
	/// script cannot be written. The child is killed on any failure.
	pub async fn launch(executable: &Path, script: &StartupScript) -> Result<Self> {
		Self::spawn(executable, ENGINE_ARGS, &script.render()).await
	}

	/// Spawn `program` with `args` and write `script` to its stdin.
	pub async fn spawn<I, S>(program: &Path, args: I, script: &str) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<OsStr>,
	{
		let mut cmd = Command::new(program);
		cmd.args(args)
			.stdin(Stdio::piped())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.kill_on_drop(true);

		// Own process group, so terminal signals reach us rather than the engine
		// and shutdown can signal every process the front-end forks.
		#[cfg(unix)]
		cmd.process_group(0);

		let mut process = cmd
			.spawn()
			.map_err(|e| Error::LaunchFailed(format!("failed to spawn {}: {e}", program.display())))?;
		let stdin = process.stdin.take();
		let mut server = Self { process, stdin: None };

		let Some(mut stdin) = stdin else {
			let _ = server.kill().await;
			return Err(Error::LaunchFailed("engine stdin was not captured".to_string()));
		};
		if let Err(e) = write_script(&mut stdin, script).await {
			drop(stdin);
			// The kill error is secondary; the write failure is what the caller needs.
			let _ = server.kill().await;
			return Err(Error::LaunchFailed(format!("failed to write startup script: {e}")));
		}
		server.stdin = Some(stdin);

		debug!(
			target = "ocpu",
			pid = ?server.id(),
			program = %program.display(),
			"compute engine launched"
		);
		Ok(server)
	}

	/// OS process id, or `None` once the process has been reaped.
	pub fn id(&self) -> Option<u32> {
		self.process.id()
	}

	/// Fails if the engine has already exited.
	pub fn ensure_running(&mut self) -> Result<()> {
		match self.process.try_wait()? {
			None => Ok(()),
			Some(status) => Err(Error::LaunchFailed(format!(
				"engine exited before the server became ready (status: {status})"
			))),
		}
	}

	/// Shut down the engine gracefully.
	///
	/// Closes stdin and sends `SIGTERM` to the engine's process group, waits up
	/// to `grace` for it to exit, then kills it.
	pub async fn shutdown(mut self, grace: Duration) -> Result<()> {
		drop(self.stdin.take());
		if self.process.try_wait()?.is_some() {
			return Ok(());
		}

		#[cfg(unix)]
		if let Some(pid) = self.process.id() {
			signal_group(pid, libc::SIGTERM);
		}

		match tokio::time::timeout(grace, self.process.wait()).await {
			Ok(Ok(status)) => {
				debug!(target = "ocpu", %status, "compute engine exited");
				Ok(())
			}
			Ok(Err(e)) => Err(Error::Shutdown(format!("failed to wait for engine: {e}"))),
			Err(_) => {
				debug!(
					target = "ocpu",
					grace_ms = grace.as_millis() as u64,
					"compute engine ignored SIGTERM; killing"
				);
				self.kill().await
			}
		}
	}

	/// Force kill the engine and reap it.
	///
	/// The whole process group is signalled even when the engine itself has
	/// already exited, so helpers it forked do not outlive it.
	pub async fn kill(mut self) -> Result<()> {
		drop(self.stdin.take());

		// Before `try_wait`: an unreaped child still holds its pid as group id.
		#[cfg(unix)]
		if let Some(pid) = self.process.id() {
			signal_group(pid, libc::SIGKILL);
		}

		if self.process.try_wait()?.is_some() {
			return Ok(());
		}

		self.process
			.kill()
			.await
			.map_err(|e| Error::Shutdown(format!("failed to kill engine: {e}")))?;
		debug!(target = "ocpu", "compute engine killed");
		Ok(())
	}
}

impl Drop for EngineServer {
	fn drop(&mut self) {
		if let Ok(None) = self.process.try_wait() {
			warn!(
				target = "ocpu",
				pid = ?self.process.id(),
				"compute engine dropped while running; killing"
			);
			#[cfg(unix)]
			if let Some(pid) = self.process.id() {
				signal_group(pid, libc::SIGKILL);
			}
		}
	}
}

async fn write_script(stdin: &mut ChildStdin, script: &str) -> std::io::Result<()> {
	stdin.write_all(script.as_bytes()).await?;
	stdin.flush().await
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
	let Ok(pgid) = libc::pid_t::try_from(pid) else {
		return;
	};
	// SAFETY: kill(2) has no memory-safety preconditions; a negative pid
	// addresses the process group created at spawn.
	unsafe {
		libc::kill(-pgid, signal);
	}
}
