//! `multipart/form-data` encoding for file uploads.
//!
//! [`Multipart::encode`] writes every file part first, then every scalar
//! field, then the closing boundary. Order among files and among fields
//! follows map iteration and is not guaranteed.

use std::collections::HashMap;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::Params;

/// Characters that force the boundary parameter to be quoted.
const TSPECIALS: &[char] = &[
	'(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=', ' ',
];

/// A byte stream uploaded as a file part under its logical filename.
///
/// The encoder only reads from `reader`; the stream stays owned by the caller.
pub struct NamedPayload<'a> {
	file_name: String,
	reader: &'a mut (dyn AsyncRead + Unpin + Send),
}

impl<'a> NamedPayload<'a> {
	pub fn new(file_name: impl Into<String>, reader: &'a mut (dyn AsyncRead + Unpin + Send)) -> Self {
		Self {
			file_name: file_name.into(),
			reader,
		}
	}

	/// Filename as supplied; only its final component is sent.
	pub fn file_name(&self) -> &str {
		&self.file_name
	}
}

impl std::fmt::Debug for NamedPayload<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NamedPayload")
			.field("file_name", &self.file_name)
			.finish_non_exhaustive()
	}
}

/// File parts keyed by form label.
pub type Files<'a> = HashMap<String, NamedPayload<'a>>;

/// A fully encoded multipart body with its matching content type.
#[derive(Debug, Clone)]
pub struct Multipart {
	content_type: String,
	body: Vec<u8>,
}

impl Multipart {
	/// Encodes `files` and `params` into a single body.
	///
	/// Any read error from a payload aborts encoding; no partial body is
	/// returned.
	pub async fn encode(params: &Params, files: &mut Files<'_>) -> io::Result<Self> {
		let mut writer = MultipartWriter::new(Vec::new());

		for (label, payload) in files.iter_mut() {
			let file_name = base_name(&payload.file_name).to_string();
			writer.write_file(label, &file_name, &mut *payload.reader).await?;
		}
		for (name, value) in params {
			writer.write_field(name, value).await?;
		}

		let content_type = writer.content_type();
		let body = writer.finish().await?;
		Ok(Self { content_type, body })
	}

	/// `multipart/form-data; boundary=<boundary>`.
	pub fn content_type(&self) -> &str {
		&self.content_type
	}

	pub fn body(&self) -> &[u8] {
		&self.body
	}

	pub fn into_body(self) -> Vec<u8> {
		self.body
	}

	pub fn into_parts(self) -> (String, Vec<u8>) {
		(self.content_type, self.body)
	}
}

/// Streaming multipart writer over any [`AsyncWrite`].
#[derive(Debug)]
pub struct MultipartWriter<W> {
	writer: W,
	boundary: String,
	wrote_part: bool,
}

impl<W: AsyncWrite + Unpin> MultipartWriter<W> {
	/// Creates a writer with a random 60-character hex boundary.
	pub fn new(writer: W) -> Self {
		Self {
			writer,
			boundary: random_boundary(),
			wrote_part: false,
		}
	}

	/// Creates a writer with an explicit boundary.
	///
	/// The boundary must be 1 to 70 characters from the RFC 2046 set and may
	/// not end in a space.
	pub fn with_boundary(writer: W, boundary: impl Into<String>) -> io::Result<Self> {
		let boundary = boundary.into();
		if !valid_boundary(&boundary) {
			return Err(io::Error::new(
				io::ErrorKind::InvalidInput,
				format!("invalid multipart boundary '{boundary}'"),
			));
		}
		Ok(Self {
			writer,
			boundary,
			wrote_part: false,
		})
	}

	pub fn boundary(&self) -> &str {
		&self.boundary
	}

	/// Content type header value for the body being written.
	pub fn content_type(&self) -> String {
		if self.boundary.contains(TSPECIALS) {
			format!("multipart/form-data; boundary=\"{}\"", self.boundary)
		} else {
			format!("multipart/form-data; boundary={}", self.boundary)
		}
	}

	/// Writes a file part and drains `reader` into it. Returns the bytes copied.
	pub async fn write_file<R>(&mut self, field: &str, file_name: &str, reader: &mut R) -> io::Result<u64>
	where
		R: AsyncRead + Unpin + ?Sized,
	{
		let header = format!(
			"Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
			 Content-Type: application/octet-stream\r\n\r\n",
			escape_quotes(field),
			escape_quotes(file_name),
		);
		self.begin_part(&header).await?;
		tokio::io::copy(reader, &mut self.writer).await
	}

	/// Writes a scalar form field.
	pub async fn write_field(&mut self, name: &str, value: &str) -> io::Result<()> {
		let header = format!(
			"Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
			escape_quotes(name)
		);
		self.begin_part(&header).await?;
		self.writer.write_all(value.as_bytes()).await
	}

	/// Writes the closing boundary, flushes, and returns the inner writer.
	pub async fn finish(mut self) -> io::Result<W> {
		let closing = if self.wrote_part {
			format!("\r\n--{}--\r\n", self.boundary)
		} else {
			format!("--{}--\r\n", self.boundary)
		};
		self.writer.write_all(closing.as_bytes()).await?;
		self.writer.flush().await?;
		Ok(self.writer)
	}

	async fn begin_part(&mut self, header: &str) -> io::Result<()> {
		let delimiter = if self.wrote_part {
			format!("\r\n--{}\r\n", self.boundary)
		} else {
			format!("--{}\r\n", self.boundary)
		};
		self.wrote_part = true;
		self.writer.write_all(delimiter.as_bytes()).await?;
		self.writer.write_all(header.as_bytes()).await
	}
}

fn random_boundary() -> String {
	hex::encode(rand::random::<[u8; 30]>())
}

fn valid_boundary(boundary: &str) -> bool {
	if boundary.is_empty() || boundary.len() > 70 || boundary.ends_with(' ') {
		return false;
	}
	boundary.chars().all(|c| {
		c.is_ascii_alphanumeric()
			|| matches!(
				c,
				'\'' | '(' | ')' | '+' | '_' | ',' | '-' | '.' | '/' | ':' | '=' | '?' | ' '
			)
	})
}

fn escape_quotes(s: &str) -> String {
	s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Final component of `name`, accepting either path separator.
fn base_name(name: &str) -> &str {
	let trimmed = name.trim_end_matches(['/', '\\']);
	match trimmed.rsplit(['/', '\\']).next() {
		Some(base) if !base.is_empty() => base,
		_ => name,
	}
}
