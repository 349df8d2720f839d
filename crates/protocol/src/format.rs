//! Output representations for session resources.

use std::fmt;
use std::str::FromStr;

/// Representation requested by appending a trailing segment to a resource
/// path, e.g. `tmp/x0a1b2c3d4e/R/.val/json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
	Json,
	Print,
	Text,
	Csv,
	Tab,
	Md,
	Rds,
	Rda,
	Pb,
	Png,
	Svg,
	Pdf,
}

impl Format {
	/// Path segment the server recognises for this representation.
	pub fn as_segment(self) -> &'static str {
		match self {
			Format::Json => "json",
			Format::Print => "print",
			Format::Text => "text",
			Format::Csv => "csv",
			Format::Tab => "tab",
			Format::Md => "md",
			Format::Rds => "rds",
			Format::Rda => "rda",
			Format::Pb => "pb",
			Format::Png => "png",
			Format::Svg => "svg",
			Format::Pdf => "pdf",
		}
	}

	/// Returns true for rendered-image representations of graphics entries.
	pub fn is_image(self) -> bool {
		matches!(self, Format::Png | Format::Svg | Format::Pdf)
	}
}

impl fmt::Display for Format {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_segment())
	}
}

impl FromStr for Format {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let format = match s.to_ascii_lowercase().as_str() {
			"json" => Format::Json,
			"print" => Format::Print,
			"text" => Format::Text,
			"csv" => Format::Csv,
			"tab" => Format::Tab,
			"md" => Format::Md,
			"rds" => Format::Rds,
			"rda" => Format::Rda,
			"pb" => Format::Pb,
			"png" => Format::Png,
			"svg" => Format::Svg,
			"pdf" => Format::Pdf,
			other => return Err(format!("unknown output format '{other}'")),
		};
		Ok(format)
	}
}
