//! OpenCPU Runtime - engine lifecycle, HTTP transport, and readiness probing
//!
//! This crate provides the low-level runtime infrastructure for talking to an
//! OpenCPU server:
//!
//! - **Engine management**: Locating R, detecting the installed front-end, and
//!   launching it with the matching startup script
//! - **Transport**: GET and POST over HTTP with streamable response bodies
//! - **Readiness probing**: Polling a server root until it answers
//! - **Manifests**: Streaming the resource list a call returns
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   ocpu-rs    │  Session façade
//! └──────┬───────┘
//!        │ Arc<dyn Transport>
//! ┌──────▼───────┐
//! │ ocpu-runtime │  This crate
//! │  ┌────────┐  │
//! │  │ Probe  │  │  Readiness polling
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  reqwest transport
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Engine │  │  Process management
//! │  └────────┘  │
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │ocpu-protocol │  Paths, manifests, multipart
//! └──────────────┘
//! ```

pub mod engine;
pub mod error;
pub mod manifest;
pub mod probe;
pub mod server;
pub mod startup;
pub mod transport;

pub use engine::{DEFAULT_ENGINE, detect_front_end_version, resolve_executable};
pub use error::{Error, Result, TransportError, TransportErrorKind};
pub use manifest::ManifestReader;
pub use probe::{DEFAULT_PROBE_INTERVAL, ReadinessProbe};
pub use server::{DEFAULT_SHUTDOWN_GRACE, EngineServer};
pub use startup::{FrontEndGeneration, FrontEndVersion, StartupPolicy, StartupScript};
pub use transport::{
	Body, BodyReader, BodyStream, FORM_CONTENT_TYPE, HttpTransport, JSON_CONTENT_TYPE, Response, StatusCode, Transport,
	TransportConfig, header,
};
