//! Compute engine discovery
//!
//! Resolves the R executable used for local sessions and asks it which
//! OpenCPU front-end version is installed.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::startup::FrontEndVersion;

/// Executable looked up on `PATH` when none is configured.
pub const DEFAULT_ENGINE: &str = "R";

/// Arguments selecting a non-interactive engine with no site or user profile.
pub const ENGINE_ARGS: [&str; 2] = ["--vanilla", "--slave"];

/// Expression printing the installed front-end version on stdout.
const VERSION_QUERY: &str = r#"cat(as.character(utils::packageVersion("opencpu")))"#;

/// Resolve the engine executable.
///
/// - `None` or an empty path looks up [`DEFAULT_ENGINE`] on `PATH`
/// - a bare name (no path separator) is looked up on `PATH`
/// - anything else is used as given, after checking it is executable
///
/// # Errors
///
/// Returns `Error::EngineNotFound` if nothing executable is found.
pub fn resolve_executable(requested: Option<&Path>) -> Result<PathBuf> {
	let name = match requested {
		Some(path) if !path.as_os_str().is_empty() => path,
		_ => Path::new(DEFAULT_ENGINE),
	};

	let resolved = which::which(name).map_err(|source| Error::EngineNotFound {
		name: name.display().to_string(),
		source,
	})?;
	debug!(
		target = "ocpu",
		requested = %name.display(),
		resolved = %resolved.display(),
		"resolved compute engine"
	);
	Ok(resolved)
}

/// Ask the engine at `executable` for its installed OpenCPU version.
///
/// # Errors
///
/// Returns `Error::LaunchFailed` if the engine cannot be run and
/// `Error::FrontEnd` if the package is missing or its version is unparseable.
pub async fn detect_front_end_version(executable: &Path) -> Result<FrontEndVersion> {
	let output = Command::new(executable)
		.args(ENGINE_ARGS)
		.arg("-e")
		.arg(VERSION_QUERY)
		.stdin(Stdio::null())
		.kill_on_drop(true)
		.output()
		.await
		.map_err(|e| Error::LaunchFailed(format!("failed to run {}: {e}", executable.display())))?;

	if !output.status.success() {
		let stderr = String::from_utf8_lossy(&output.stderr);
		return Err(Error::FrontEnd(format!(
			"version query exited with {}: {}",
			output.status,
			stderr.trim()
		)));
	}

	let stdout = String::from_utf8_lossy(&output.stdout);
	let version = stdout.trim().parse::<FrontEndVersion>().map_err(Error::FrontEnd)?;
	debug!(target = "ocpu", %version, "detected OpenCPU front-end");
	Ok(version)
}
