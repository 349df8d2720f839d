use ocpu::{FORM_CONTENT_TYPE, JSON_CONTENT_TYPE, Manifest, Params, Response, Session};
use tracing::debug;

use super::{to_params, write_stdout};
use crate::cli::{BodyArgs, CallArgs, GetArgs, PostArgs};
use crate::error::Result;

pub async fn post(session: &Session, args: PostArgs) -> Result<()> {
	let params = to_params(args.params);
	let response = match args.body.json {
		Some(json) => {
			let value: serde_json::Value = serde_json::from_str(&json)?;
			session.post_json(&args.path, &params, &value).await?
		}
		None => {
			let form = to_params(args.body.form);
			session.post_form(&args.path, &params, &form).await?
		}
	};
	print_body(response).await
}

pub async fn get(session: &Session, args: GetArgs) -> Result<()> {
	let response = session.get(&args.path, &to_params(args.params)).await?;
	print_body(response).await
}

/// Calls a function and lists the resources it produced, one relative
/// path per line. With `--value` the return value is printed instead.
pub async fn call(session: &Session, args: CallArgs) -> Result<()> {
	let (content_type, body) = encode_body(args.body)?;
	let manifest = session
		.call(&args.path, content_type, &Params::new(), body)
		.await?;
	debug!(target = "ocpu", entries = manifest.len(), key = ?manifest.session_key(), "call finished");

	match args.value {
		Some(format) => {
			let response = session
				.value(&manifest, Some(format), &to_params(args.params))
				.await?;
			print_body(response).await
		}
		None => print_manifest(&manifest).await,
	}
}

pub(super) async fn print_manifest(manifest: &Manifest) -> Result<()> {
	let mut listing = String::new();
	for entry in manifest.entries() {
		listing.push_str(entry.relative());
		listing.push('\n');
	}
	write_stdout(listing.as_bytes()).await
}

/// Prints the body, or fails with the server's message on a non-success status.
async fn print_body(response: Response) -> Result<()> {
	let bytes = response.error_for_status().await?.bytes().await?;
	write_stdout(&bytes).await
}

fn encode_body(body: BodyArgs) -> Result<(&'static str, String)> {
	match body.json {
		Some(json) => {
			// Reject malformed JSON before it reaches the server.
			serde_json::from_str::<serde_json::Value>(&json)?;
			Ok((JSON_CONTENT_TYPE, json))
		}
		None => {
			let encoded = url::form_urlencoded::Serializer::new(String::new())
				.extend_pairs(&body.form)
				.finish();
			Ok((FORM_CONTENT_TYPE, encoded))
		}
	}
}
