use ocpu::{Files, NamedPayload, Session};
use tokio::fs::File;

use super::request::print_manifest;
use super::to_params;
use crate::cli::UploadArgs;
use crate::error::{CliError, Result};

/// Sends every `--file` as a multipart file part and lists the resources
/// the server produced.
pub async fn execute(session: &Session, args: UploadArgs) -> Result<()> {
	let mut opened = Vec::with_capacity(args.files.len());
	for (label, path) in args.files {
		let file = File::open(&path)
			.await
			.map_err(|source| CliError::OpenFile {
				path: path.clone(),
				source,
			})?;
		opened.push((label, path, file));
	}

	let mut files = Files::new();
	for (label, path, file) in opened.iter_mut() {
		let name = path.to_string_lossy().into_owned();
		files.insert(label.clone(), NamedPayload::new(name, file));
	}

	let response = session
		.post_multipart(&args.path, &to_params(args.fields), &mut files)
		.await?;
	let manifest = response
		.error_for_status()
		.await?
		.manifest(session.root())
		.collect()
		.await?;
	print_manifest(&manifest).await
}
