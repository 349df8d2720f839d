mod request;
mod serve;
mod upload;

use std::time::Duration;

use ocpu::{LocalConfig, Params, RemoteConfig, Session};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::cli::{Cli, Commands, ServerArgs};
use crate::error::Result;

/// Runs one command against a fresh session and always closes it.
pub async fn dispatch(cli: Cli) -> Result<()> {
	let session = connect(&cli.server).await?;

	let outcome = match cli.command {
		Commands::Post(args) => request::post(&session, args).await,
		Commands::Call(args) => request::call(&session, args).await,
		Commands::Get(args) => request::get(&session, args).await,
		Commands::Upload(args) => upload::execute(&session, args).await,
		Commands::Serve => serve::execute(&session).await,
	};

	let closed = session.close().await;
	outcome?;
	closed?;
	Ok(())
}

/// Attaches to `--host`, or spawns a local engine when no host is given.
///
/// A remote server that stayed unreachable for a transient reason is used
/// anyway; the first request reports the real failure.
pub async fn connect(args: &ServerArgs) -> Result<Session> {
	let timeout = Duration::from_secs(args.timeout);

	let Some(host) = &args.host else {
		let mut config = LocalConfig::new(args.port);
		config.executable = args.r_path.clone();
		config.namespace = args.namespace.clone();
		config.timeout = timeout;
		let session = Session::local(config).await?;
		info!(target = "ocpu", url = %session.api_url(), "local server ready");
		return Ok(session);
	};

	let mut config = RemoteConfig::new(host.clone());
	config.namespace = args.namespace.clone();
	config.timeout = timeout;
	match Session::remote(config).await {
		Ok(session) => {
			info!(target = "ocpu", url = %session.api_url(), "attached to server");
			Ok(session)
		}
		Err(err) => match err.into_parts() {
			(error, Some(session)) => {
				warn!(target = "ocpu", %error, "server not ready, continuing");
				Ok(session)
			}
			(error, None) => Err(error.into()),
		},
	}
}

fn to_params(pairs: Vec<(String, String)>) -> Params {
	pairs.into_iter().collect()
}

/// Copies raw bytes to stdout so binary formats survive untouched.
async fn write_stdout(bytes: &[u8]) -> Result<()> {
	let mut stdout = tokio::io::stdout();
	stdout.write_all(bytes).await?;
	stdout.flush().await?;
	Ok(())
}
