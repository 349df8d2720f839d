//! Error types for the OpenCPU runtime.

use std::fmt;
use std::io;
use std::time::Duration;

use ocpu_protocol::{ManifestError, RootError};
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while launching, probing, or talking to a server.
#[derive(Debug, Error)]
pub enum Error {
	/// The engine executable could not be resolved.
	#[error("compute engine '{name}' not found: {source}")]
	EngineNotFound {
		name: String,
		#[source]
		source: which::Error,
	},

	/// The engine process could not be started or fed its startup script.
	#[error("failed to launch compute engine: {0}")]
	LaunchFailed(String),

	/// The HTTP front-end package is missing or reported an unusable version.
	#[error("OpenCPU front-end unavailable: {0}")]
	FrontEnd(String),

	/// The configured host URL cannot serve as an API root.
	#[error(transparent)]
	InvalidRoot(#[from] RootError),

	/// The server did not answer a readiness probe before the deadline.
	#[error("server at {url} not ready after {}ms: {source}", .elapsed.as_millis())]
	NotReady {
		url: String,
		elapsed: Duration,
		#[source]
		source: TransportError,
	},

	/// A request was issued after the session was closed.
	#[error("{method} on closed session")]
	Closed { method: &'static str },

	/// Network-level failure on an open session.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// A multipart body could not be built.
	#[error("multipart encoding failed: {0}")]
	Encoding(#[source] io::Error),

	/// The server answered a call with a non-success status.
	#[error("server returned {status}: {message}")]
	Status { status: u16, message: String },

	/// A manifest line did not name a resource under the API root.
	#[error(transparent)]
	Manifest(#[from] ManifestError),

	/// A manifest carried no return-value entry.
	#[error("manifest has no return value entry")]
	MissingValue,

	/// Engine process could not be stopped.
	#[error("failed to stop compute engine: {0}")]
	Shutdown(String),

	#[error("I/O error: {0}")]
	Io(#[from] io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if this is a closed-session error.
	pub fn is_closed(&self) -> bool {
		matches!(self, Error::Closed { .. })
	}

	/// Returns true if this is a readiness or transport timeout.
	pub fn is_timeout(&self) -> bool {
		match self {
			Error::NotReady { .. } => true,
			Error::Transport(err) => err.kind() == TransportErrorKind::Timeout,
			_ => false,
		}
	}

	/// Returns true when the underlying transport failure is worth retrying later.
	pub fn is_transient(&self) -> bool {
		match self {
			Error::NotReady { source, .. } | Error::Transport(source) => source.is_transient(),
			_ => false,
		}
	}

	/// Returns the transport error behind this error, if any.
	pub fn transport_error(&self) -> Option<&TransportError> {
		match self {
			Error::NotReady { source, .. } | Error::Transport(source) => Some(source),
			_ => None,
		}
	}

	/// Recovers a [`TransportError`] smuggled through an [`io::Error`] by a body reader.
	pub(crate) fn from_body_io(err: io::Error) -> Self {
		if !err.get_ref().is_some_and(|inner| inner.is::<TransportError>()) {
			return Error::Io(err);
		}
		match err.into_inner().map(|inner| inner.downcast::<TransportError>()) {
			Some(Ok(transport)) => Error::Transport(*transport),
			Some(Err(inner)) => Error::Io(io::Error::other(inner)),
			None => Error::Io(io::Error::other("empty body error")),
		}
	}
}

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
	/// The request or connection attempt timed out.
	Timeout,
	/// The connection was reset, aborted, or interrupted mid-flight.
	Reset,
	/// Nothing is listening at the target address.
	Refused,
	/// Any other failure to establish a connection (DNS, TLS, routing).
	Connect,
	/// The response body could not be read.
	Body,
	Other,
}

impl TransportErrorKind {
	/// Maps an OS-level socket error kind onto a transport kind.
	pub fn from_io(kind: io::ErrorKind) -> Option<Self> {
		match kind {
			io::ErrorKind::TimedOut => Some(Self::Timeout),
			io::ErrorKind::ConnectionReset
			| io::ErrorKind::ConnectionAborted
			| io::ErrorKind::BrokenPipe
			| io::ErrorKind::Interrupted
			| io::ErrorKind::WouldBlock => Some(Self::Reset),
			io::ErrorKind::ConnectionRefused => Some(Self::Refused),
			_ => None,
		}
	}

	/// Timeouts and resets are transient; everything else is not.
	pub fn is_transient(self) -> bool {
		matches!(self, Self::Timeout | Self::Reset)
	}
}

impl fmt::Display for TransportErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Timeout => "timeout",
			Self::Reset => "connection reset",
			Self::Refused => "connection refused",
			Self::Connect => "connect",
			Self::Body => "body",
			Self::Other => "transport",
		};
		f.write_str(s)
	}
}

/// Network-level failure of a single HTTP exchange.
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
	kind: TransportErrorKind,
	message: String,
	#[source]
	source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
	pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			source: None,
		}
	}

	pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
		self.source = Some(Box::new(source));
		self
	}

	pub fn kind(&self) -> TransportErrorKind {
		self.kind
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn is_transient(&self) -> bool {
		self.kind.is_transient()
	}
}

impl From<reqwest::Error> for TransportError {
	fn from(err: reqwest::Error) -> Self {
		let kind = classify_reqwest(&err);
		Self {
			kind,
			message: err.to_string(),
			source: Some(Box::new(err)),
		}
	}
}

fn classify_reqwest(err: &reqwest::Error) -> TransportErrorKind {
	if err.is_timeout() {
		return TransportErrorKind::Timeout;
	}
	if let Some(kind) = io_error_kind(err).and_then(TransportErrorKind::from_io) {
		return kind;
	}
	if err.is_connect() {
		TransportErrorKind::Connect
	} else if err.is_body() || err.is_decode() {
		TransportErrorKind::Body
	} else {
		TransportErrorKind::Other
	}
}

/// Walks the source chain looking for the OS error that caused `err`.
fn io_error_kind(err: &(dyn std::error::Error + 'static)) -> Option<io::ErrorKind> {
	let mut current = err.source();
	while let Some(source) = current {
		if let Some(io_err) = source.downcast_ref::<io::Error>() {
			return Some(io_err.kind());
		}
		current = source.source();
	}
	None
}
