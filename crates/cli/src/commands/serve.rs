use ocpu::Session;
use tracing::info;

use super::write_stdout;
use crate::error::{CliError, Result};

/// Keeps the spawned engine alive until Ctrl-C.
pub async fn execute(session: &Session) -> Result<()> {
	if !session.is_local() {
		return Err(CliError::Usage("serve needs a local server; drop --host".to_string()));
	}

	write_stdout(format!("{}\n", session.api_url()).as_bytes()).await?;
	tokio::signal::ctrl_c().await?;
	info!(target = "ocpu", "interrupted, stopping server");
	Ok(())
}
