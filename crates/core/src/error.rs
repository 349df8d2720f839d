use thiserror::Error;

use crate::{Error, Session};

/// Failure to attach to a remote server.
///
/// When the readiness probe timed out on a transient transport error the
/// session is still handed back: the server may become reachable later.
/// Any other failure carries no session.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RemoteConnectError {
	error: Error,
	session: Option<Session>,
}

impl RemoteConnectError {
	pub(crate) fn new(error: Error, session: Option<Session>) -> Self {
		Self { error, session }
	}

	pub fn error(&self) -> &Error {
		&self.error
	}

	/// The usable session, if the failure was transient.
	pub fn session(&self) -> Option<&Session> {
		self.session.as_ref()
	}

	pub fn into_session(self) -> Option<Session> {
		self.session
	}

	pub fn into_parts(self) -> (Error, Option<Session>) {
		(self.error, self.session)
	}

	pub fn is_transient(&self) -> bool {
		self.session.is_some()
	}
}

impl From<RemoteConnectError> for Error {
	fn from(err: RemoteConnectError) -> Self {
		err.error
	}
}
