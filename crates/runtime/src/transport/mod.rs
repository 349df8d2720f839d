//! HTTP transport for OpenCPU servers
//!
//! [`Transport`] is the seam between sessions and the network. [`HttpTransport`]
//! is the production implementation backed by `reqwest`; tests substitute
//! their own implementations to script failures.
//!
//! Every exchange yields a [`Response`] regardless of HTTP status. Only
//! network-level failures become [`TransportError`]s.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt, stream};
use ocpu_protocol::ApiRoot;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::de::DeserializeOwned;
use tokio_util::io::StreamReader;
use url::Url;

pub use reqwest::{Body, StatusCode, header};

use crate::error::{Error, Result, TransportError};
use crate::manifest::ManifestReader;


/// Content type of JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type of URL-encoded form bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Single-pass stream of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, TransportError>> + Send>>;

/// Body exposed as an [`tokio::io::AsyncBufRead`].
///
/// Transport failures surface as [`io::Error`]s wrapping the [`TransportError`].
pub type BodyReader = StreamReader<Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>, Bytes>;

/// Status, headers, and a streamable body of one HTTP exchange.
///
/// The body can be consumed once.
pub struct Response {
	status: StatusCode,
	headers: HeaderMap,
	body: BodyStream,
}

impl Response {
	pub fn new(status: StatusCode, headers: HeaderMap, body: BodyStream) -> Self {
		Self { status, headers, body }
	}

	/// Response with an in-memory body.
	pub fn from_bytes(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
		let body: Bytes = body.into();
		Self::new(status, headers, stream::once(async move { Ok(body) }).boxed())
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn content_type(&self) -> Option<&str> {
		self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
	}

	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Passes a success response through; otherwise reads the body and
	/// returns `Error::Status` with it, trimmed, as the message.
	pub async fn error_for_status(self) -> Result<Self> {
		if self.is_success() {
			return Ok(self);
		}
		let status = self.status.as_u16();
		let message = self.text().await?;
		Err(Error::Status {
			status,
			message: message.trim().to_string(),
		})
	}

	pub fn into_stream(self) -> BodyStream {
		self.body
	}

	pub fn into_reader(self) -> BodyReader {
		let stream: Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>> =
			Box::pin(self.body.map_err(io::Error::other));
		StreamReader::new(stream)
	}

	/// Reads the whole body into memory.
	pub async fn bytes(self) -> Result<Bytes> {
		let mut chunks: Vec<Bytes> = self.body.try_collect().await?;
		if chunks.len() == 1 {
			return Ok(chunks.swap_remove(0));
		}
		Ok(chunks.concat().into())
	}

	/// Reads the body as text, replacing invalid UTF-8.
	pub async fn text(self) -> Result<String> {
		let bytes = self.bytes().await?;
		Ok(String::from_utf8_lossy(&bytes).into_owned())
	}

	pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
		let bytes = self.bytes().await?;
		Ok(serde_json::from_slice(&bytes)?)
	}

	/// Streams the body as a manifest of resources under `root`.
	pub fn manifest(self, root: &ApiRoot) -> ManifestReader<BodyReader> {
		ManifestReader::new(self.into_reader(), root.clone())
	}
}

impl fmt::Debug for Response {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Response")
			.field("status", &self.status)
			.field("headers", &self.headers)
			.finish_non_exhaustive()
	}
}

impl From<reqwest::Response> for Response {
	fn from(response: reqwest::Response) -> Self {
		let status = response.status();
		let headers = response.headers().clone();
		let body = response.bytes_stream().map_err(TransportError::from).boxed();
		Self::new(status, headers, body)
	}
}

/// Issues HTTP requests against an OpenCPU server.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
	async fn get(&self, url: Url) -> std::result::Result<Response, TransportError>;

	async fn post(&self, url: Url, content_type: &str, body: Body) -> std::result::Result<Response, TransportError>;
}

/// Client settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
	/// Limit for establishing a connection. `None` uses the system default.
	pub connect_timeout: Option<Duration>,
	/// Limit for a whole exchange including the body. `None` means no limit.
	pub request_timeout: Option<Duration>,
	pub user_agent: String,
}

impl Default for TransportConfig {
	fn default() -> Self {
		Self {
			connect_timeout: None,
			request_timeout: None,
			user_agent: concat!("ocpu-rs/", env!("CARGO_PKG_VERSION")).to_string(),
		}
	}
}

/// [`Transport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: reqwest::Client,
}

impl HttpTransport {
	pub fn new(config: &TransportConfig) -> Result<Self> {
		let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
		if let Some(timeout) = config.connect_timeout {
			builder = builder.connect_timeout(timeout);
		}
		if let Some(timeout) = config.request_timeout {
			builder = builder.timeout(timeout);
		}
		let client = builder.build().map_err(TransportError::from).map_err(Error::Transport)?;
		Ok(Self { client })
	}

	pub fn with_client(client: reqwest::Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn get(&self, url: Url) -> std::result::Result<Response, TransportError> {
		let response = self.client.get(url).send().await?;
		Ok(response.into())
	}

	async fn post(&self, url: Url, content_type: &str, body: Body) -> std::result::Result<Response, TransportError> {
		let response = self
			.client
			.post(url)
			.header(CONTENT_TYPE, content_type)
			.body(body)
			.send()
			.await?;
		Ok(response.into())
	}
}
