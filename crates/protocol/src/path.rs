//! API root handling and request path composition.
//!
//! Every request path is joined *under* the configured root: leading slashes
//! on the relative path are ignored and `..` segments never climb above the
//! namespace, so a composed URL always stays on the session's host and prefix.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use thiserror::Error;
use url::Url;

use crate::Params;

/// Namespace prefix used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "ocpu";

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'%')
	.add(b'/')
	.add(b'<')
	.add(b'>')
	.add(b'?')
	.add(b'`')
	.add(b'{')
	.add(b'}');

/// Errors from building an [`ApiRoot`].
#[derive(Debug, Error)]
pub enum RootError {
	#[error("invalid host URL '{url}': {source}")]
	Parse {
		url: String,
		#[source]
		source: url::ParseError,
	},

	#[error("host URL '{0}' must use http or https")]
	UnsupportedScheme(String),
}

/// The base of the remote API: host URL plus namespace prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoot {
	/// Fully qualified root, e.g. `http://localhost:5656/ocpu`.
	url: Url,
	/// Namespace anchored at `/`, e.g. `/ocpu`.
	root_path: String,
}

impl ApiRoot {
	/// Builds a root from a host URL and a namespace prefix.
	///
	/// An empty namespace selects [`DEFAULT_NAMESPACE`]. Leading and trailing
	/// slashes on the namespace are insignificant.
	pub fn new(host: &str, namespace: &str) -> Result<Self, RootError> {
		let mut url = Url::parse(host).map_err(|source| RootError::Parse {
			url: host.to_string(),
			source,
		})?;
		if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
			return Err(RootError::UnsupportedScheme(host.to_string()));
		}

		let mut namespace_segments = clean_segments(namespace);
		if namespace_segments.is_empty() {
			namespace_segments.push(DEFAULT_NAMESPACE);
		}
		let root_path = format!("/{}", namespace_segments.join("/"));

		let mut path = url.path().trim_end_matches('/').to_string();
		push_encoded(&mut path, &namespace_segments);
		url.set_path(&path);
		url.set_query(None);
		url.set_fragment(None);

		Ok(Self { url, root_path })
	}

	/// Builds the root for a locally hosted server on `port`.
	///
	/// # Panics
	///
	/// Panics if `http://localhost:<port>/` fails to parse, which would mean
	/// the URL parser itself is broken.
	pub fn local(port: u16, namespace: &str) -> Self {
		match Self::new(&format!("http://localhost:{port}/"), namespace) {
			Ok(root) => root,
			Err(e) => panic!("ocpu: unexpected error building local API root: {e}"),
		}
	}

	/// Fully qualified API root URL, the target of readiness probes.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Namespace prefix anchored at `/`, e.g. `/ocpu`.
	pub fn root_path(&self) -> &str {
		&self.root_path
	}

	/// Joins `path` under the root and encodes `params` as the query string.
	///
	/// Query pairs are emitted in key order; an empty map produces no `?`.
	pub fn join(&self, path: &str, params: &Params) -> Url {
		let mut url = self.url.clone();

		let mut joined = url.path().trim_end_matches('/').to_string();
		push_encoded(&mut joined, &clean_segments(path));
		if joined.is_empty() {
			joined.push('/');
		}
		url.set_path(&joined);

		if params.is_empty() {
			url.set_query(None);
		} else {
			let mut pairs: Vec<(&String, &String)> = params.iter().collect();
			pairs.sort();
			url.query_pairs_mut().clear().extend_pairs(pairs);
		}
		url
	}

	/// Strips the namespace prefix from an absolute server path.
	///
	/// Returns `None` when `absolute` does not lie under the namespace.
	pub fn relative(&self, absolute: &str) -> Option<String> {
		let absolute = absolute.trim();
		let rest = absolute.strip_prefix(self.root_path.as_str())?;
		if !rest.is_empty() && !rest.starts_with('/') {
			return None;
		}
		Some(clean_segments(rest).join("/"))
	}
}

/// Splits `path` into segments, dropping empty and `.` segments and resolving
/// `..` without ever climbing above the first segment.
fn clean_segments(path: &str) -> Vec<&str> {
	let mut segments = Vec::new();
	for segment in path.split('/') {
		match segment {
			"" | "." => {}
			".." => {
				segments.pop();
			}
			s => segments.push(s),
		}
	}
	segments
}

fn push_encoded(path: &mut String, segments: &[&str]) {
	for segment in segments {
		path.push('/');
		path.extend(utf8_percent_encode(segment, PATH_SEGMENT));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn params(pairs: &[(&str, &str)]) -> Params {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn empty_namespace_defaults_to_ocpu() {
		let root = ApiRoot::new("http://public.opencpu.org", "").unwrap();
		assert_eq!(root.root_path(), "/ocpu");
		assert_eq!(root.url().as_str(), "http://public.opencpu.org/ocpu");
	}

	#[test]
	fn namespace_slashes_are_insignificant() {
		for ns in ["ocpu", "/ocpu", "ocpu/", "/ocpu/"] {
			let root = ApiRoot::new("http://localhost:5656", ns).unwrap();
			assert_eq!(root.root_path(), "/ocpu", "namespace {ns:?}");
			let url = root.join("a/b", &Params::new());
			assert_eq!(url.path(), "/ocpu/a/b", "namespace {ns:?}");
		}
	}

	#[test]
	fn host_path_is_kept_before_namespace() {
		let root = ApiRoot::new("http://example.com/base/", "ocpu").unwrap();
		assert_eq!(root.url().path(), "/base/ocpu");
		assert_eq!(root.root_path(), "/ocpu");
	}

	#[test]
	fn local_root_targets_localhost() {
		let root = ApiRoot::local(3000, "");
		assert_eq!(root.url().as_str(), "http://localhost:3000/ocpu");
	}

	#[test]
	fn join_never_escapes_root() {
		let root = ApiRoot::local(3000, "ocpu");
		assert_eq!(root.join("/library/base", &Params::new()).path(), "/ocpu/library/base");
		assert_eq!(root.join("../../etc/passwd", &Params::new()).path(), "/ocpu/etc/passwd");
		assert_eq!(
			root.join("http://evil.example/x", &Params::new()).host_str(),
			Some("localhost")
		);
	}

	#[test]
	fn join_resolves_dot_segments() {
		let root = ApiRoot::local(3000, "ocpu");
		let url = root.join("tmp/./x01/R/../R/.val/json", &Params::new());
		assert_eq!(url.path(), "/ocpu/tmp/x01/R/.val/json");
	}

	#[test]
	fn join_escapes_reserved_characters() {
		let root = ApiRoot::local(3000, "ocpu");
		let url = root.join("files/my data?.csv", &Params::new());
		assert_eq!(url.path(), "/ocpu/files/my%20data%3F.csv");
		assert_eq!(url.query(), None);
	}

	#[test]
	fn join_encodes_query_in_key_order() {
		let root = ApiRoot::local(3000, "ocpu");
		let url = root.join("tmp/x/R/.val/json", &params(&[("digits", "10"), ("auto_unbox", "true")]));
		assert_eq!(url.query(), Some("auto_unbox=true&digits=10"));
	}

	#[test]
	fn join_with_empty_path_is_root() {
		let root = ApiRoot::local(3000, "ocpu");
		assert_eq!(root.join("", &Params::new()), *root.url());
	}

	#[test]
	fn relative_strips_namespace_on_segment_boundary() {
		let root = ApiRoot::local(3000, "ocpu");
		assert_eq!(
			root.relative("/ocpu/tmp/x0123456789/R/.val").as_deref(),
			Some("tmp/x0123456789/R/.val")
		);
		assert_eq!(root.relative("/ocpu").as_deref(), Some(""));
		assert_eq!(root.relative("/ocpux/tmp"), None);
		assert_eq!(root.relative("/other/tmp"), None);
	}

	#[test]
	fn rejects_non_http_hosts() {
		assert!(matches!(
			ApiRoot::new("ftp://example.com", ""),
			Err(RootError::UnsupportedScheme(_))
		));
		assert!(matches!(ApiRoot::new("not a url", ""), Err(RootError::Parse { .. })));
	}
}
