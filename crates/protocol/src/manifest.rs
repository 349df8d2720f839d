//! Session manifests.
//!
//! A successful call returns a newline-delimited list of absolute resource
//! paths under the API root, one per session output:
//!
//! ```text
//! /ocpu/tmp/x0a1b2c3d4e/R/.val
//! /ocpu/tmp/x0a1b2c3d4e/stdout
//! /ocpu/tmp/x0a1b2c3d4e/source
//! /ocpu/tmp/x0a1b2c3d4e/console
//! /ocpu/tmp/x0a1b2c3d4e/info
//! /ocpu/tmp/x0a1b2c3d4e/files/mydata.csv
//! ```
//!
//! Order is preserved exactly as emitted. The entry holding the call's return
//! value is recognised only by its filename, [`VALUE_MARKER`].

use thiserror::Error;

use crate::format::Format;
use crate::path::ApiRoot;

/// Filename the server uses for the return value of a call.
pub const VALUE_MARKER: &str = ".val";

/// Errors from interpreting a manifest line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
	#[error("manifest entry '{line}' is not under the API root '{root}'")]
	OutsideRoot { line: String, root: String },
}

/// What a manifest entry refers to, inferred from the `tmp/<key>/...` layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
	/// The return value (`R/.val`).
	Value,
	/// Another named object in the session environment (`R/<name>`).
	Object(String),
	/// Captured standard output.
	Stdout,
	/// Echoed source of the call.
	Source,
	/// Console transcript.
	Console,
	/// Session and engine metadata.
	Info,
	/// Messages raised during evaluation.
	Messages,
	/// Warnings raised during evaluation.
	Warnings,
	/// Uploaded or generated file, by path below `files/`.
	File(String),
	/// Graphics device output, by index or name below `graphics/`.
	Graphic(String),
	/// Anything the layout does not name.
	Other,
}

/// One line of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
	path: String,
	relative: String,
	session_key: Option<String>,
	kind: EntryKind,
}

impl ManifestEntry {
	/// Interprets one manifest line against `root`.
	pub fn parse(line: &str, root: &ApiRoot) -> Result<Self, ManifestError> {
		let path = line.trim().to_string();
		let relative = root
			.relative(&path)
			.ok_or_else(|| ManifestError::OutsideRoot {
				line: path.clone(),
				root: root.root_path().to_string(),
			})?;
		let (session_key, kind) = classify(&relative);
		Ok(Self {
			path,
			relative,
			session_key,
			kind,
		})
	}

	/// Absolute path as emitted by the server.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Path relative to the API root, suitable for a follow-up request.
	pub fn relative(&self) -> &str {
		&self.relative
	}

	/// Temporary session key (`x0a1b2c3d4e`) when the entry lives under `tmp/`.
	pub fn session_key(&self) -> Option<&str> {
		self.session_key.as_deref()
	}

	pub fn kind(&self) -> &EntryKind {
		&self.kind
	}

	/// Final path segment.
	pub fn file_name(&self) -> &str {
		self.relative.rsplit('/').next().unwrap_or_default()
	}

	pub fn is_value(&self) -> bool {
		self.kind == EntryKind::Value
	}

	/// Relative path for requesting this entry in `format`.
	pub fn with_format(&self, format: Format) -> String {
		format!("{}/{}", self.relative, format.as_segment())
	}
}

fn classify(relative: &str) -> (Option<String>, EntryKind) {
	let segments: Vec<&str> = relative.split('/').collect();
	if let ["tmp", key, rest @ ..] = segments.as_slice() {
		if !rest.is_empty() {
			return (Some((*key).to_string()), classify_output(rest));
		}
	}

	let kind = if segments.last() == Some(&VALUE_MARKER) {
		EntryKind::Value
	} else {
		EntryKind::Other
	};
	(None, kind)
}

fn classify_output(rest: &[&str]) -> EntryKind {
	match rest {
		["R", name] if *name == VALUE_MARKER => EntryKind::Value,
		["R", name] => EntryKind::Object((*name).to_string()),
		["stdout"] => EntryKind::Stdout,
		["source"] => EntryKind::Source,
		["console"] => EntryKind::Console,
		["info"] => EntryKind::Info,
		["messages"] => EntryKind::Messages,
		["warnings"] => EntryKind::Warnings,
		["files", file @ ..] if !file.is_empty() => EntryKind::File(file.join("/")),
		["graphics", graphic] => EntryKind::Graphic((*graphic).to_string()),
		[.., last] if *last == VALUE_MARKER => EntryKind::Value,
		_ => EntryKind::Other,
	}
}

/// An ordered manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
	entries: Vec<ManifestEntry>,
}

impl Manifest {
	pub fn new(entries: Vec<ManifestEntry>) -> Self {
		Self { entries }
	}

	/// Parses a complete manifest body. Blank lines are skipped.
	pub fn parse(body: &str, root: &ApiRoot) -> Result<Self, ManifestError> {
		body.lines()
			.filter(|line| !line.trim().is_empty())
			.map(|line| ManifestEntry::parse(line, root))
			.collect::<Result<Vec<_>, _>>()
			.map(Self::new)
	}

	pub fn entries(&self) -> &[ManifestEntry] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// First entry holding the return value.
	pub fn value(&self) -> Option<&ManifestEntry> {
		self.entries.iter().find(|e| e.is_value())
	}

	/// Entries of the given kind, in manifest order.
	pub fn of_kind<'a>(&'a self, kind: &'a EntryKind) -> impl Iterator<Item = &'a ManifestEntry> + 'a {
		self.entries.iter().filter(move |e| &e.kind == kind)
	}

	/// File entries, in manifest order.
	pub fn files(&self) -> impl Iterator<Item = &ManifestEntry> {
		self.entries
			.iter()
			.filter(|e| matches!(e.kind, EntryKind::File(_)))
	}

	/// Session key shared by the entries, taken from the first keyed entry.
	pub fn session_key(&self) -> Option<&str> {
		self.entries.iter().find_map(ManifestEntry::session_key)
	}

	pub fn push(&mut self, entry: ManifestEntry) {
		self.entries.push(entry);
	}
}

impl IntoIterator for Manifest {
	type Item = ManifestEntry;
	type IntoIter = std::vec::IntoIter<ManifestEntry>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}

impl<'a> IntoIterator for &'a Manifest {
	type Item = &'a ManifestEntry;
	type IntoIter = std::slice::Iter<'a, ManifestEntry>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BODY: &str = "/ocpu/tmp/x0a1b2c3d4e/R/.val\n\
		/ocpu/tmp/x0a1b2c3d4e/stdout\n\
		/ocpu/tmp/x0a1b2c3d4e/source\n\
		/ocpu/tmp/x0a1b2c3d4e/console\n\
		/ocpu/tmp/x0a1b2c3d4e/info\n\
		/ocpu/tmp/x0a1b2c3d4e/files/mydata.csv\n";

	fn root() -> ApiRoot {
		ApiRoot::local(5656, "")
	}

	#[test]
	fn preserves_server_order() {
		let manifest = Manifest::parse(BODY, &root()).unwrap();
		let relative: Vec<&str> = manifest.entries().iter().map(|e| e.relative()).collect();
		assert_eq!(
			relative,
			[
				"tmp/x0a1b2c3d4e/R/.val",
				"tmp/x0a1b2c3d4e/stdout",
				"tmp/x0a1b2c3d4e/source",
				"tmp/x0a1b2c3d4e/console",
				"tmp/x0a1b2c3d4e/info",
				"tmp/x0a1b2c3d4e/files/mydata.csv",
			]
		);
	}

	#[test]
	fn classifies_outputs() {
		let manifest = Manifest::parse(BODY, &root()).unwrap();
		let kinds: Vec<&EntryKind> = manifest.entries().iter().map(|e| e.kind()).collect();
		assert_eq!(
			kinds,
			[
				&EntryKind::Value,
				&EntryKind::Stdout,
				&EntryKind::Source,
				&EntryKind::Console,
				&EntryKind::Info,
				&EntryKind::File("mydata.csv".into()),
			]
		);
		assert_eq!(manifest.session_key(), Some("x0a1b2c3d4e"));
	}

	#[test]
	fn value_is_found_by_marker_not_position() {
		let body = "/ocpu/tmp/x01/stdout\n/ocpu/tmp/x01/R/fit\n/ocpu/tmp/x01/R/.val\n";
		let manifest = Manifest::parse(body, &root()).unwrap();
		let value = manifest.value().unwrap();
		assert_eq!(value.relative(), "tmp/x01/R/.val");
		assert_eq!(value.file_name(), VALUE_MARKER);
		assert_eq!(value.with_format(Format::Json), "tmp/x01/R/.val/json");
		assert_eq!(
			manifest.of_kind(&EntryKind::Object("fit".into())).count(),
			1
		);
	}

	#[test]
	fn manifest_without_value_has_none() {
		let manifest = Manifest::parse("/ocpu/tmp/x01/stdout\n", &root()).unwrap();
		assert!(manifest.value().is_none());
	}

	#[test]
	fn skips_blank_lines_and_carriage_returns() {
		let manifest = Manifest::parse("\r\n/ocpu/tmp/x01/R/.val\r\n\n", &root()).unwrap();
		assert_eq!(manifest.len(), 1);
		assert_eq!(manifest.entries()[0].path(), "/ocpu/tmp/x01/R/.val");
	}

	#[test]
	fn graphics_and_nested_files() {
		let body = "/ocpu/tmp/x01/graphics/1\n/ocpu/tmp/x01/files/out/plot.csv\n";
		let manifest = Manifest::parse(body, &root()).unwrap();
		assert_eq!(manifest.entries()[0].kind(), &EntryKind::Graphic("1".into()));
		let files: Vec<_> = manifest.files().collect();
		assert_eq!(files.len(), 1);
		assert_eq!(files[0].kind(), &EntryKind::File("out/plot.csv".into()));
	}

	#[test]
	fn value_marker_outside_tmp_layout() {
		let entry = ManifestEntry::parse("/ocpu/library/mypkg/R/.val", &root()).unwrap();
		assert!(entry.is_value());
		assert_eq!(entry.session_key(), None);
	}

	#[test]
	fn rejects_lines_outside_root() {
		let err = ManifestEntry::parse("/elsewhere/tmp/x01/R/.val", &root()).unwrap_err();
		assert_eq!(
			err,
			ManifestError::OutsideRoot {
				line: "/elsewhere/tmp/x01/R/.val".into(),
				root: "/ocpu".into(),
			}
		);
	}

	#[test]
	fn custom_namespace_is_stripped() {
		let root = ApiRoot::new("http://example.com", "stats/api").unwrap();
		let entry = ManifestEntry::parse("/stats/api/tmp/x9/console", &root).unwrap();
		assert_eq!(entry.relative(), "tmp/x9/console");
		assert_eq!(entry.kind(), &EntryKind::Console);
	}
}
