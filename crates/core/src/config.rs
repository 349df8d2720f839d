//! Session configuration.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ocpu_protocol::DEFAULT_NAMESPACE;
use ocpu_runtime::{DEFAULT_PROBE_INTERVAL, FrontEndVersion, ReadinessProbe, StartupPolicy, Transport};

/// Readiness deadline used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Port conventionally used by a local OpenCPU server.
pub const DEFAULT_PORT: u16 = 5656;

/// Settings for a session backed by a locally spawned engine.
#[derive(Clone)]
pub struct LocalConfig {
	/// Port the front-end listens on.
	pub port: u16,
	/// Engine executable. `None` looks up `R` on `PATH`; bare names are also
	/// looked up, anything else is used as given.
	pub executable: Option<PathBuf>,
	/// API namespace prefix. Empty selects `ocpu`.
	pub namespace: String,
	/// Readiness deadline. Zero waits forever.
	pub timeout: Duration,
	pub probe_interval: Duration,
	/// Skips version detection when set.
	pub front_end_version: Option<FrontEndVersion>,
	pub startup: StartupPolicy,
	/// Replaces the default HTTP transport.
	pub transport: Option<Arc<dyn Transport>>,
}

impl LocalConfig {
	pub fn new(port: u16) -> Self {
		Self {
			port,
			executable: None,
			namespace: DEFAULT_NAMESPACE.to_string(),
			timeout: DEFAULT_TIMEOUT,
			probe_interval: DEFAULT_PROBE_INTERVAL,
			front_end_version: None,
			startup: StartupPolicy::default(),
			transport: None,
		}
	}

	pub(crate) fn probe(&self) -> ReadinessProbe {
		ReadinessProbe::new(self.timeout).with_interval(self.probe_interval)
	}
}

impl Default for LocalConfig {
	fn default() -> Self {
		Self::new(DEFAULT_PORT)
	}
}

impl fmt::Debug for LocalConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LocalConfig")
			.field("port", &self.port)
			.field("executable", &self.executable)
			.field("namespace", &self.namespace)
			.field("timeout", &self.timeout)
			.field("probe_interval", &self.probe_interval)
			.field("front_end_version", &self.front_end_version)
			.field("startup", &self.startup)
			.field("custom_transport", &self.transport.is_some())
			.finish()
	}
}

/// Settings for a session attached to an already running server.
#[derive(Clone)]
pub struct RemoteConfig {
	/// Host URL, e.g. `https://cloud.opencpu.org`. A path on the host is kept
	/// in front of the namespace.
	pub host: String,
	/// API namespace prefix. Empty selects `ocpu`.
	pub namespace: String,
	/// Readiness deadline. Zero waits forever.
	pub timeout: Duration,
	pub probe_interval: Duration,
	/// Replaces the default HTTP transport.
	pub transport: Option<Arc<dyn Transport>>,
}

impl RemoteConfig {
	pub fn new(host: impl Into<String>) -> Self {
		Self {
			host: host.into(),
			namespace: DEFAULT_NAMESPACE.to_string(),
			timeout: DEFAULT_TIMEOUT,
			probe_interval: DEFAULT_PROBE_INTERVAL,
			transport: None,
		}
	}

	pub(crate) fn probe(&self) -> ReadinessProbe {
		ReadinessProbe::new(self.timeout).with_interval(self.probe_interval)
	}
}

impl fmt::Debug for RemoteConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RemoteConfig")
			.field("host", &self.host)
			.field("namespace", &self.namespace)
			.field("timeout", &self.timeout)
			.field("probe_interval", &self.probe_interval)
			.field("custom_transport", &self.transport.is_some())
			.finish()
	}
}
