//! Streaming manifest reader.

use ocpu_protocol::{ApiRoot, Manifest, ManifestEntry};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{Error, Result};

/// Reads manifest entries line by line from a response body.
///
/// Entries are yielded as they arrive, so a caller looking for the return
/// value can stop reading early.
#[derive(Debug)]
pub struct ManifestReader<R> {
	reader: R,
	root: ApiRoot,
	line: String,
}

impl<R: AsyncBufRead + Unpin> ManifestReader<R> {
	pub fn new(reader: R, root: ApiRoot) -> Self {
		Self {
			reader,
			root,
			line: String::new(),
		}
	}

	/// Next entry, or `None` at end of body. Blank lines are skipped.
	pub async fn next_entry(&mut self) -> Result<Option<ManifestEntry>> {
		loop {
			self.line.clear();
			let read = self.reader.read_line(&mut self.line).await.map_err(Error::from_body_io)?;
			if read == 0 {
				return Ok(None);
			}
			if self.line.trim().is_empty() {
				continue;
			}
			return Ok(Some(ManifestEntry::parse(&self.line, &self.root)?));
		}
	}

	/// Reads until the return-value entry.
	///
	/// # Errors
	///
	/// Returns `Error::MissingValue` if the body ends without one.
	pub async fn find_value(&mut self) -> Result<ManifestEntry> {
		while let Some(entry) = self.next_entry().await? {
			if entry.is_value() {
				return Ok(entry);
			}
		}
		Err(Error::MissingValue)
	}

	/// Reads every remaining entry.
	pub async fn collect(mut self) -> Result<Manifest> {
		let mut manifest = Manifest::default();
		while let Some(entry) = self.next_entry().await? {
			manifest.push(entry);
		}
		Ok(manifest)
	}
}
