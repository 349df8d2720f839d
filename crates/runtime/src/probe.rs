//! Readiness probing.
//!
//! A freshly launched or remote server is polled with plain GETs on its API
//! root until one exchange completes. Any HTTP status counts as ready; only
//! transport failures keep the probe waiting.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result, TransportError, TransportErrorKind};
use crate::transport::{Response, Transport};

/// Pause before each probe attempt.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Polls a URL at a fixed interval until it answers or a deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessProbe {
	interval: Duration,
	timeout: Duration,
}

impl ReadinessProbe {
	/// A zero `timeout` polls forever.
	pub fn new(timeout: Duration) -> Self {
		Self {
			interval: DEFAULT_PROBE_INTERVAL,
			timeout,
		}
	}

	pub fn with_interval(mut self, interval: Duration) -> Self {
		self.interval = interval;
		self
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Polls `url` until it answers.
	///
	/// # Errors
	///
	/// Returns `Error::NotReady` carrying the last transport failure once the
	/// deadline has passed.
	pub async fn wait(&self, transport: &dyn Transport, url: &Url) -> Result<()> {
		self.wait_while(transport, url, || Ok(())).await
	}

	/// Like [`wait`](Self::wait), but checks `alive` before every attempt and
	/// stops with its error.
	///
	/// Local sessions use this to notice an engine that exited during startup.
	pub async fn wait_while<F>(&self, transport: &dyn Transport, url: &Url, mut alive: F) -> Result<()>
	where
		F: FnMut() -> Result<()>,
	{
		let start = Instant::now();
		let mut attempts = 0u32;

		loop {
			tokio::time::sleep(self.interval).await;
			alive()?;
			attempts += 1;

			let last_error = match self.attempt(transport, url, start).await {
				Ok(response) => {
					debug!(
						target = "ocpu",
						%url,
						status = %response.status(),
						attempts,
						elapsed_ms = start.elapsed().as_millis() as u64,
						"server ready"
					);
					return Ok(());
				}
				Err(e) => e,
			};
			trace!(target = "ocpu", %url, attempts, error = %last_error, "server not ready");

			let elapsed = start.elapsed();
			if !self.timeout.is_zero() && elapsed >= self.timeout {
				return Err(Error::NotReady {
					url: url.to_string(),
					elapsed,
					source: last_error,
				});
			}
		}
	}

	/// One GET, bounded by what is left of the deadline but never less than
	/// one interval. A server that accepts connections and never answers
	/// shows up as a `Timeout` failure.
	async fn attempt(
		&self,
		transport: &dyn Transport,
		url: &Url,
		start: Instant,
	) -> std::result::Result<Response, TransportError> {
		if self.timeout.is_zero() {
			return transport.get(url.clone()).await;
		}
		let budget = self.timeout.saturating_sub(start.elapsed()).max(self.interval);
		match tokio::time::timeout(budget, transport.get(url.clone())).await {
			Ok(outcome) => outcome,
			Err(_) => Err(TransportError::new(
				TransportErrorKind::Timeout,
				format!("no answer within {}ms", budget.as_millis()),
			)),
		}
	}
}

impl Default for ReadinessProbe {
	fn default() -> Self {
		Self::new(Duration::from_secs(10))
	}
}
