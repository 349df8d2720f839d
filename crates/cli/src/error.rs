use std::path::PathBuf;

use ocpu::RemoteConnectError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Ocpu(#[from] ocpu::Error),

	#[error("invalid JSON body: {0}")]
	Json(#[from] serde_json::Error),

	#[error("cannot open {}: {source}", path.display())]
	OpenFile {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("{0}")]
	Usage(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl From<RemoteConnectError> for CliError {
	fn from(err: RemoteConnectError) -> Self {
		CliError::Ocpu(err.into())
	}
}

impl CliError {
	/// Process exit code: 2 for usage mistakes, 1 for everything else.
	pub fn exit_code(&self) -> i32 {
		match self {
			CliError::Usage(_) | CliError::Json(_) => 2,
			_ => 1,
		}
	}
}
