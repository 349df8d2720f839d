//! In-process fake OpenCPU server and scripted transports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use ocpu::{Body, HttpTransport, RemoteConfig, Response, Session, Transport, TransportConfig, TransportError, TransportErrorKind};
use tokio::net::TcpListener;
use url::Url;

pub const SESSION_KEY: &str = "x0123abcd";

/// Value of `coef(lm(speed ~ dist, data = cars))` at ten significant digits.
pub const COEF_DIGITS_10: &str = "[8.2839056418, 0.16556757464]\n";
pub const COEF_DEFAULT: &str = "[8.2839, 0.1656]\n";

#[derive(Debug, Clone)]
pub struct Part {
	pub name: String,
	pub file_name: Option<String>,
	pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Recorded {
	pub content_type: Option<String>,
	pub body: String,
	pub parts: Vec<Part>,
}

#[derive(Debug, Default)]
pub struct FakeState {
	pub last: Mutex<Recorded>,
	pub hits: AtomicUsize,
}

pub struct FakeServer {
	pub addr: SocketAddr,
	pub state: Arc<FakeState>,
}

impl FakeServer {
	pub async fn start() -> Self {
		let state = Arc::new(FakeState::default());
		let router = Router::new()
			.route("/ocpu", get(root))
			.route("/ocpu/", get(root))
			.route("/ocpu/library/stats/R/rnorm/json", post(rnorm))
			.route("/ocpu/library/base/R/identity", post(identity))
			.route("/ocpu/library/base/R/stop", post(stop))
			.route("/ocpu/library/utils/R/read.csv", post(read_csv))
			.route("/ocpu/tmp/{key}/R/.val/json", get(value_json))
			.route("/ocpu/tmp/{key}/stdout", get(stdout))
			.fallback(not_found)
			.with_state(Arc::clone(&state));

		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, router).await.unwrap();
		});
		Self { addr, state }
	}

	pub fn host(&self) -> String {
		format!("http://{}", self.addr)
	}

	pub fn config(&self) -> RemoteConfig {
		let mut config = RemoteConfig::new(self.host());
		config.probe_interval = Duration::from_millis(10);
		config.timeout = Duration::from_secs(5);
		config
	}

	pub async fn session(&self) -> Session {
		Session::remote(self.config()).await.unwrap()
	}

	pub fn hits(&self) -> usize {
		self.state.hits.load(Ordering::SeqCst)
	}

	pub fn last<T>(&self, f: impl FnOnce(&Recorded) -> T) -> T {
		f(&self.state.last.lock().unwrap())
	}
}

pub fn manifest_body(extra: &[&str]) -> String {
	let mut lines: Vec<String> = ["R/.val", "R/identity", "stdout", "source", "console", "info"]
		.iter()
		.map(|rest| format!("/ocpu/tmp/{SESSION_KEY}/{rest}"))
		.collect();
	lines.extend(extra.iter().map(|rest| format!("/ocpu/tmp/{SESSION_KEY}/{rest}")));
	lines.join("\n") + "\n"
}

async fn root(State(state): State<Arc<FakeState>>) -> &'static str {
	state.hits.fetch_add(1, Ordering::SeqCst);
	"OpenCPU API\n"
}

/// Accepts arguments either URL-encoded or as a JSON object.
async fn rnorm(State(state): State<Arc<FakeState>>, headers: HeaderMap, body: String) -> (StatusCode, Json<Vec<f64>>) {
	state.hits.fetch_add(1, Ordering::SeqCst);
	let json = headers
		.get("content-type")
		.and_then(|v| v.to_str().ok())
		.is_some_and(|v| v.starts_with("application/json"));

	let n = if json {
		match serde_json::from_str::<HashMap<String, serde_json::Value>>(&body) {
			Ok(args) => args.get("n").and_then(serde_json::Value::as_u64).map(|n| n as usize),
			Err(_) => return (StatusCode::BAD_REQUEST, Json(Vec::new())),
		}
	} else {
		url::form_urlencoded::parse(body.as_bytes())
			.find(|(key, _)| key == "n")
			.and_then(|(_, n)| n.parse::<usize>().ok())
	};
	let n = n.unwrap_or(1);
	(StatusCode::OK, Json((0..n).map(|i| i as f64 * 0.5 - 1.0).collect()))
}

async fn identity(State(state): State<Arc<FakeState>>, headers: HeaderMap, body: String) -> (StatusCode, String) {
	state.hits.fetch_add(1, Ordering::SeqCst);
	let mut last = state.last.lock().unwrap();
	last.content_type = headers
		.get("content-type")
		.and_then(|v| v.to_str().ok())
		.map(str::to_string);
	last.body = body;
	(StatusCode::CREATED, manifest_body(&[]))
}

async fn stop(State(state): State<Arc<FakeState>>) -> (StatusCode, &'static str) {
	state.hits.fetch_add(1, Ordering::SeqCst);
	(StatusCode::BAD_REQUEST, "object 'x' not found\n\nIn call:\nidentity(x)\n")
}

async fn read_csv(State(state): State<Arc<FakeState>>, headers: HeaderMap, mut multipart: Multipart) -> (StatusCode, String) {
	state.hits.fetch_add(1, Ordering::SeqCst);
	let mut parts = Vec::new();
	loop {
		let field = match multipart.next_field().await {
			Ok(Some(field)) => field,
			Ok(None) => break,
			Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()),
		};
		let name = field.name().unwrap_or_default().to_string();
		let file_name = field.file_name().map(str::to_string);
		let data = match field.bytes().await {
			Ok(data) => data.to_vec(),
			Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()),
		};
		parts.push(Part { name, file_name, data });
	}

	let uploads: Vec<String> = parts
		.iter()
		.filter_map(|p| p.file_name.as_ref())
		.map(|f| format!("files/{f}"))
		.collect();
	let extra: Vec<&str> = uploads.iter().map(String::as_str).collect();

	let mut last = state.last.lock().unwrap();
	last.content_type = headers
		.get("content-type")
		.and_then(|v| v.to_str().ok())
		.map(str::to_string);
	last.parts = parts;
	(StatusCode::CREATED, manifest_body(&extra))
}

async fn value_json(
	State(state): State<Arc<FakeState>>,
	Path(key): Path<String>,
	Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, &'static str) {
	state.hits.fetch_add(1, Ordering::SeqCst);
	if key != SESSION_KEY {
		return (StatusCode::NOT_FOUND, "session not found\n");
	}
	match query.get("digits").map(String::as_str) {
		Some("10") => (StatusCode::OK, COEF_DIGITS_10),
		_ => (StatusCode::OK, COEF_DEFAULT),
	}
}

async fn stdout(State(state): State<Arc<FakeState>>) -> &'static str {
	state.hits.fetch_add(1, Ordering::SeqCst);
	"[1] \"hello\"\n"
}

async fn not_found(State(state): State<Arc<FakeState>>, uri: Uri) -> (StatusCode, String) {
	state.hits.fetch_add(1, Ordering::SeqCst);
	(StatusCode::NOT_FOUND, uri.path().to_string())
}

/// Wraps the HTTP transport and counts every request.
#[derive(Debug)]
pub struct Counting {
	inner: HttpTransport,
	calls: AtomicUsize,
}

impl Counting {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			inner: HttpTransport::new(&TransportConfig::default()).unwrap(),
			calls: AtomicUsize::new(0),
		})
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Transport for Counting {
	async fn get(&self, url: Url) -> Result<Response, TransportError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.inner.get(url).await
	}

	async fn post(&self, url: Url, content_type: &str, body: Body) -> Result<Response, TransportError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.inner.post(url, content_type, body).await
	}
}

/// Fails every request with the same kind of transport error.
#[derive(Debug)]
pub struct Failing {
	kind: TransportErrorKind,
	calls: AtomicUsize,
}

impl Failing {
	pub fn new(kind: TransportErrorKind) -> Arc<Self> {
		Arc::new(Self {
			kind,
			calls: AtomicUsize::new(0),
		})
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Transport for Failing {
	async fn get(&self, _url: Url) -> Result<Response, TransportError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Err(TransportError::new(self.kind, "scripted failure"))
	}

	async fn post(&self, _url: Url, _content_type: &str, _body: Body) -> Result<Response, TransportError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Err(TransportError::new(self.kind, "scripted failure"))
	}
}

/// Never answers a request, like a server that accepted the connection and hung.
#[derive(Debug, Default)]
pub struct Silent {
	calls: AtomicUsize,
}

impl Silent {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Transport for Silent {
	async fn get(&self, _url: Url) -> Result<Response, TransportError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		std::future::pending().await
	}

	async fn post(&self, _url: Url, _content_type: &str, _body: Body) -> Result<Response, TransportError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		std::future::pending().await
	}
}
