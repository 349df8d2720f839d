//! Wire-level types for the OpenCPU HTTP API.
//!
//! This crate holds the parts of the protocol that involve no process or
//! network policy:
//!
//! - [`ApiRoot`]: joins relative resource paths and query parameters under a
//!   configured API namespace
//! - [`Manifest`] / [`ManifestEntry`]: the newline-delimited list of session
//!   outputs returned after a call, with each line classified by [`EntryKind`]
//! - [`MultipartWriter`]: `multipart/form-data` bodies built from scalar
//!   fields and named byte streams
//! - [`Format`]: output representations selectable on a resource path

pub mod format;
pub mod manifest;
pub mod multipart;
pub mod path;

use std::collections::HashMap;

pub use format::Format;
pub use manifest::{EntryKind, Manifest, ManifestEntry, ManifestError, VALUE_MARKER};
pub use multipart::{Files, Multipart, MultipartWriter, NamedPayload};
pub use path::{ApiRoot, DEFAULT_NAMESPACE, RootError};

/// Scalar request parameters, passed opaquely to the server's argument parser.
///
/// Used both as URL query parameters and as multipart form fields. Iteration
/// order is not significant; query strings are encoded in key order.
pub type Params = HashMap<String, String>;
