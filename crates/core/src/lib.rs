//! OpenCPU client sessions.
//!
//! A [`Session`] talks to one OpenCPU server over HTTP, either a server it
//! spawned itself (a local R process) or one that is already running.
//!
//! # Example
//!
//! ```ignore
//! use ocpu::{LocalConfig, Params, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ocpu::Error> {
//!     let session = Session::local(LocalConfig::new(5656)).await?;
//!
//!     let form = Params::from([("n".to_string(), "3".to_string())]);
//!     let response = session
//!         .post_form("library/stats/R/rnorm/json", &Params::new(), &form)
//!         .await?;
//!     let draws: Vec<f64> = response.json().await?;
//!     assert_eq!(draws.len(), 3);
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! Execution endpoints answer with a manifest of the resources a call
//! produced. [`Session::call`] reads it and [`Session::value`] fetches the
//! return value:
//!
//! ```ignore
//! let manifest = session
//!     .call("library/base/R/identity", "application/json", &Params::new(), r#"{"x":[1,2]}"#)
//!     .await?;
//! let value = session.value(&manifest, Some(Format::Json), &Params::new()).await?;
//! ```

pub mod config;
mod error;
mod session;

pub use config::{DEFAULT_PORT, DEFAULT_TIMEOUT, LocalConfig, RemoteConfig};
pub use error::RemoteConnectError;
pub use ocpu_protocol::{
	ApiRoot, DEFAULT_NAMESPACE, EntryKind, Files, Format, Manifest, ManifestEntry, ManifestError, Multipart,
	MultipartWriter, NamedPayload, Params, RootError, VALUE_MARKER,
};
pub use ocpu_runtime::{
	Body, Error, FORM_CONTENT_TYPE, FrontEndGeneration, FrontEndVersion, HttpTransport, JSON_CONTENT_TYPE,
	ManifestReader, Response, Result, StartupPolicy, StatusCode, Transport, TransportConfig, TransportError,
	TransportErrorKind, header,
};
pub use session::Session;
