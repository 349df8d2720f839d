//! Front-end version policy and the startup script fed to the engine.
//!
//! The OpenCPU front-end changed its start API at 2.0.0: older releases start
//! with `opencpu$start(port)`, newer ones with `ocpu_start_server(...)`. The
//! installed version is compared against a fixed threshold to pick one.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Dotted numeric package version, e.g. `2.2.11` or `1.6.2.1`.
///
/// Missing trailing components compare as zero, so `2.0` equals `2.0.0`.
#[derive(Debug, Clone)]
pub struct FrontEndVersion(Vec<u32>);

impl FrontEndVersion {
	pub fn new(components: impl Into<Vec<u32>>) -> Self {
		Self(components.into())
	}

	pub fn components(&self) -> &[u32] {
		&self.0
	}
}

impl FromStr for FrontEndVersion {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		if trimmed.is_empty() {
			return Err("empty version string".to_string());
		}
		trimmed
			.split(['.', '-'])
			.map(|part| {
				part.parse::<u32>()
					.map_err(|_| format!("invalid version '{trimmed}'"))
			})
			.collect::<Result<Vec<_>, _>>()
			.map(Self)
	}
}

impl Ord for FrontEndVersion {
	fn cmp(&self, other: &Self) -> Ordering {
		let len = self.0.len().max(other.0.len());
		(0..len)
			.map(|i| {
				let a = self.0.get(i).copied().unwrap_or(0);
				let b = other.0.get(i).copied().unwrap_or(0);
				a.cmp(&b)
			})
			.find(|ord| ord.is_ne())
			.unwrap_or(Ordering::Equal)
	}
}

impl PartialOrd for FrontEndVersion {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for FrontEndVersion {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for FrontEndVersion {}

impl fmt::Display for FrontEndVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
		f.write_str(&parts.join("."))
	}
}

/// Which start API the installed front-end exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontEndGeneration {
	/// `opencpu$start(port)`, releases before the threshold.
	Legacy,
	/// `ocpu_start_server(port, root)`.
	Current,
}

/// Picks the front-end generation from an installed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupPolicy {
	threshold: FrontEndVersion,
}

impl Default for StartupPolicy {
	fn default() -> Self {
		Self::new(FrontEndVersion::new([2, 0, 0]))
	}
}

impl StartupPolicy {
	/// Versions strictly below `threshold` are [`FrontEndGeneration::Legacy`].
	pub fn new(threshold: FrontEndVersion) -> Self {
		Self { threshold }
	}

	pub fn threshold(&self) -> &FrontEndVersion {
		&self.threshold
	}

	pub fn generation(&self, installed: &FrontEndVersion) -> FrontEndGeneration {
		if *installed < self.threshold {
			FrontEndGeneration::Legacy
		} else {
			FrontEndGeneration::Current
		}
	}

	/// Builds the startup script for `installed` serving on `port` under `root_path`.
	pub fn script(&self, installed: &FrontEndVersion, port: u16, root_path: &str) -> StartupScript {
		StartupScript {
			generation: self.generation(installed),
			port,
			root_path: root_path.to_string(),
		}
	}
}

/// Script written to the engine's standard input to start the HTTP front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupScript {
	generation: FrontEndGeneration,
	port: u16,
	root_path: String,
}

impl StartupScript {
	pub fn generation(&self) -> FrontEndGeneration {
		self.generation
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	pub fn render(&self) -> String {
		match self.generation {
			FrontEndGeneration::Legacy => {
				format!("library(opencpu)\nopencpu$start({})\n", self.port)
			}
			FrontEndGeneration::Current => format!(
				"library(opencpu)\nocpu_start_server(port = {}, root = \"{}\")\n",
				self.port,
				r_string_escape(&self.root_path)
			),
		}
	}
}

impl fmt::Display for StartupScript {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.render())
	}
}

fn r_string_escape(s: &str) -> String {
	s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
	use super::*;

	fn v(s: &str) -> FrontEndVersion {
		s.parse().unwrap()
	}

	#[test]
	fn parses_dotted_and_dashed_versions() {
		assert_eq!(v("2.2.11").components(), &[2, 2, 11]);
		assert_eq!(v("1.6.2-1").components(), &[1, 6, 2, 1]);
		assert_eq!(v(" 2.0 \n").components(), &[2, 0]);
	}

	#[test]
	fn rejects_garbage_versions() {
		assert!("".parse::<FrontEndVersion>().is_err());
		assert!("two.zero".parse::<FrontEndVersion>().is_err());
		assert!("2..0".parse::<FrontEndVersion>().is_err());
	}

	#[test]
	fn missing_components_compare_as_zero() {
		assert_eq!(v("2.0"), v("2.0.0"));
		assert!(v("1.99.99") < v("2"));
		assert!(v("2.0.1") > v("2.0"));
		assert!(v("10.0") > v("9.9.9"));
	}

	#[test]
	fn policy_branches_on_threshold() {
		let policy = StartupPolicy::default();
		assert_eq!(policy.generation(&v("1.7.8")), FrontEndGeneration::Legacy);
		assert_eq!(policy.generation(&v("2.0.0")), FrontEndGeneration::Current);
		assert_eq!(policy.generation(&v("2.2.11")), FrontEndGeneration::Current);
	}

	#[test]
	fn custom_threshold() {
		let policy = StartupPolicy::new(v("3.0"));
		assert_eq!(policy.generation(&v("2.2.11")), FrontEndGeneration::Legacy);
		assert_eq!(policy.threshold().to_string(), "3.0");
	}

	#[test]
	fn renders_legacy_script() {
		let script = StartupPolicy::default().script(&v("1.7.8"), 3000, "/ocpu");
		assert_eq!(script.render(), "library(opencpu)\nopencpu$start(3000)\n");
	}

	#[test]
	fn renders_current_script_with_root() {
		let script = StartupPolicy::default().script(&v("2.2.11"), 5656, "/ocpu");
		assert_eq!(
			script.to_string(),
			"library(opencpu)\nocpu_start_server(port = 5656, root = \"/ocpu\")\n"
		);
		assert_eq!(script.port(), 5656);
	}
}
