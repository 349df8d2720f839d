//! Session - one handle on an OpenCPU server
//!
//! A session either owns a locally spawned engine or attaches to a server
//! that is already running. Both kinds probe the API root before they are
//! handed out, and both refuse every request once closed.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ocpu_protocol::{ApiRoot, Files, Format, Manifest, ManifestEntry, Multipart, Params};
use ocpu_runtime::{
	Body, DEFAULT_SHUTDOWN_GRACE, EngineServer, Error, FORM_CONTENT_TYPE, HttpTransport, JSON_CONTENT_TYPE, Response,
	Result, Transport, TransportConfig, detect_front_end_version, resolve_executable,
};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::{LocalConfig, RemoteConfig};
use crate::error::RemoteConnectError;

/// A connection to one OpenCPU server.
///
/// Call [`close`](Self::close) when done. A local session dropped without
/// closing still kills its engine, but without a graceful shutdown.
pub struct Session {
	transport: Arc<dyn Transport>,
	root: ApiRoot,
	/// Engine owned by a local session; taken on close.
	server: Mutex<Option<EngineServer>>,
	local: bool,
	closed: AtomicBool,
}

impl Session {
	/// Spawns an engine, starts the HTTP front-end, and waits for it to answer.
	///
	/// # Errors
	///
	/// Returns an error if:
	/// - the engine executable cannot be found or started
	/// - the front-end is missing or reports an unparseable version
	/// - the engine exits before the server answers
	/// - the server does not answer within `config.timeout`
	///
	/// The engine is killed before any error after launch is returned.
	pub async fn local(config: LocalConfig) -> Result<Self> {
		let executable = resolve_executable(config.executable.as_deref())?;
		let root = ApiRoot::local(config.port, &config.namespace);

		let version = match &config.front_end_version {
			Some(version) => version.clone(),
			None => detect_front_end_version(&executable).await?,
		};
		let script = config.startup.script(&version, config.port, root.root_path());
		let transport = match &config.transport {
			Some(transport) => Arc::clone(transport),
			None => Arc::new(HttpTransport::new(&TransportConfig::default())?),
		};

		let mut server = EngineServer::launch(&executable, &script).await?;
		debug!(
			target = "ocpu",
			url = %root.url(),
			generation = ?script.generation(),
			"waiting for local server"
		);

		let probed = config
			.probe()
			.wait_while(transport.as_ref(), root.url(), || server.ensure_running())
			.await;
		if let Err(err) = probed {
			// A failed kill still drops the handle, which kills the child.
			let _ = server.kill().await;
			return Err(err);
		}

		Ok(Self {
			transport,
			root,
			server: Mutex::new(Some(server)),
			local: true,
			closed: AtomicBool::new(false),
		})
	}

	/// Attaches to a running server and waits for it to answer.
	///
	/// # Errors
	///
	/// If the probe times out on a transient transport error, the returned
	/// [`RemoteConnectError`] still carries a usable session. Any other
	/// failure carries none.
	pub async fn remote(config: RemoteConfig) -> std::result::Result<Self, RemoteConnectError> {
		let root = ApiRoot::new(&config.host, &config.namespace)
			.map_err(|e| RemoteConnectError::new(e.into(), None))?;
		let transport = match &config.transport {
			Some(transport) => Arc::clone(transport),
			None => Arc::new(
				HttpTransport::new(&TransportConfig::default()).map_err(|e| RemoteConnectError::new(e, None))?,
			),
		};
		let session = Self {
			transport,
			root,
			server: Mutex::new(None),
			local: false,
			closed: AtomicBool::new(false),
		};

		let probed = config
			.probe()
			.wait(session.transport.as_ref(), session.root.url())
			.await;
		match probed {
			Ok(()) => Ok(session),
			Err(err) if err.is_transient() => Err(RemoteConnectError::new(err, Some(session))),
			Err(err) => Err(RemoteConnectError::new(err, None)),
		}
	}

	/// Issues a GET on `path` below the API root.
	pub async fn get(&self, path: &str, params: &Params) -> Result<Response> {
		self.ensure_open("GET")?;
		let url = self.root.join(path, params);
		Ok(self.transport.get(url).await?)
	}

	/// Issues a POST on `path` with `body` sent verbatim as `content_type`.
	pub async fn post(
		&self,
		path: &str,
		content_type: &str,
		params: &Params,
		body: impl Into<Body>,
	) -> Result<Response> {
		self.ensure_open("POST")?;
		let url = self.root.join(path, params);
		Ok(self.transport.post(url, content_type, body.into()).await?)
	}

	/// Issues a multipart POST with `files` first, then `fields`.
	///
	/// # Errors
	///
	/// Returns `Error::Encoding` if a payload cannot be read; nothing is sent.
	pub async fn post_multipart(&self, path: &str, fields: &Params, files: &mut Files<'_>) -> Result<Response> {
		self.ensure_open("POST")?;
		let (content_type, body) = Multipart::encode(fields, files)
			.await
			.map_err(Error::Encoding)?
			.into_parts();
		let url = self.root.join(path, &Params::new());
		Ok(self.transport.post(url, &content_type, Body::from(body)).await?)
	}

	/// POSTs `value` as a JSON body.
	pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, params: &Params, value: &T) -> Result<Response> {
		self.ensure_open("POST")?;
		let body = serde_json::to_vec(value)?;
		self.post(path, JSON_CONTENT_TYPE, params, body).await
	}

	/// POSTs `form` URL-encoded, keys in sorted order.
	pub async fn post_form(&self, path: &str, params: &Params, form: &Params) -> Result<Response> {
		self.ensure_open("POST")?;
		let mut pairs: Vec<_> = form.iter().collect();
		pairs.sort();
		let body = url::form_urlencoded::Serializer::new(String::new())
			.extend_pairs(pairs)
			.finish();
		self.post(path, FORM_CONTENT_TYPE, params, body).await
	}

	/// POSTs to an execution endpoint and reads the whole manifest.
	///
	/// # Errors
	///
	/// A non-success status becomes `Error::Status` with the body as message.
	pub async fn call(
		&self,
		path: &str,
		content_type: &str,
		params: &Params,
		body: impl Into<Body>,
	) -> Result<Manifest> {
		let response = self.post(path, content_type, params, body).await?;
		response.error_for_status().await?.manifest(&self.root).collect().await
	}

	/// Fetches a manifest entry, optionally in a specific output format.
	pub async fn get_entry(&self, entry: &ManifestEntry, format: Option<Format>, params: &Params) -> Result<Response> {
		let path = match format {
			Some(format) => entry.with_format(format),
			None => entry.relative().to_string(),
		};
		self.get(&path, params).await
	}

	/// Fetches the return value named in `manifest`.
	///
	/// # Errors
	///
	/// Returns `Error::MissingValue` if the manifest has no value entry.
	pub async fn value(&self, manifest: &Manifest, format: Option<Format>, params: &Params) -> Result<Response> {
		let entry = manifest.value().ok_or(Error::MissingValue)?;
		self.get_entry(entry, format, params).await
	}

	pub fn root(&self) -> &ApiRoot {
		&self.root
	}

	/// Fully qualified API root URL.
	pub fn api_url(&self) -> &Url {
		self.root.url()
	}

	/// Namespace prefix anchored at `/`, e.g. `/ocpu`.
	pub fn root_path(&self) -> &str {
		self.root.root_path()
	}

	/// Whether this session spawned its own engine.
	pub fn is_local(&self) -> bool {
		self.local
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Closes the session, shutting down an owned engine.
	///
	/// Later calls are no-ops. Every request after close fails with
	/// `Error::Closed` without touching the network.
	pub async fn close(&self) -> Result<()> {
		if self.closed.swap(true, Ordering::SeqCst) {
			return Ok(());
		}
		// Take the engine without holding the lock across await.
		let server = self.server.lock().take();
		if let Some(server) = server {
			debug!(target = "ocpu", pid = ?server.id(), "closing local session");
			server.shutdown(DEFAULT_SHUTDOWN_GRACE).await?;
		}
		Ok(())
	}

	fn ensure_open(&self, method: &'static str) -> Result<()> {
		if self.is_closed() {
			return Err(Error::Closed { method });
		}
		Ok(())
	}
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("api_url", &self.root.url().as_str())
			.field("local", &self.local)
			.field("closed", &self.is_closed())
			.finish_non_exhaustive()
	}
}
