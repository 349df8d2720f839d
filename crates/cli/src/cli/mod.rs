
use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};
use ocpu::Format;

/// Root CLI for ocpu.
#[derive(Parser, Debug)]
#[command(name = "ocpu")]
#[command(about = "OpenCPU client - call R functions over HTTP")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(flatten)]
	pub server: ServerArgs,

	#[command(subcommand)]
	pub command: Commands,
}

/// Which server to talk to. Without `--host` a local R process is spawned.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
	/// Attach to a running server, e.g. https://cloud.opencpu.org
	#[arg(long, global = true, env = "OCPU_HOST", value_name = "URL")]
	pub host: Option<String>,

	/// Port for a locally spawned server
	#[arg(long, global = true, env = "OCPU_PORT", default_value_t = ocpu::DEFAULT_PORT, conflicts_with = "host")]
	pub port: u16,

	/// R executable for a locally spawned server (default: R on PATH)
	#[arg(long, global = true, env = "OCPU_R", value_name = "PATH", conflicts_with = "host")]
	pub r_path: Option<PathBuf>,

	/// API namespace prefix
	#[arg(long, global = true, env = "OCPU_NAMESPACE", default_value = ocpu::DEFAULT_NAMESPACE)]
	pub namespace: String,

	/// Seconds to wait for the server to answer (0 waits forever)
	#[arg(long, global = true, env = "OCPU_TIMEOUT", value_name = "SECS", default_value_t = 10)]
	pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// POST to a path and print the raw response body.
	Post(PostArgs),
	/// Call a function and print the resources it produced.
	Call(CallArgs),
	/// GET a path and print the response body.
	Get(GetArgs),
	/// Upload files as multipart form data and print the resources produced.
	Upload(UploadArgs),
	/// Keep a local server running until interrupted.
	Serve,
}

/// Request body: a JSON document or URL-encoded form fields.
#[derive(Args, Debug, Clone, Default)]
pub struct BodyArgs {
	/// JSON object of function arguments
	#[arg(long, value_name = "JSON", conflicts_with = "form")]
	pub json: Option<String>,

	/// Form field of function arguments (repeatable)
	#[arg(long, value_name = "KEY=VALUE", value_parser = parse_key_value)]
	pub form: Vec<(String, String)>,
}

#[derive(Args, Debug, Clone)]
pub struct PostArgs {
	/// Path below the API root, e.g. library/stats/R/rnorm/json
	pub path: String,

	#[command(flatten)]
	pub body: BodyArgs,

	/// Query parameter (repeatable)
	#[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
	pub params: Vec<(String, String)>,
}

#[derive(Args, Debug, Clone)]
pub struct CallArgs {
	/// Function path below the API root, e.g. library/base/R/identity
	pub path: String,

	#[command(flatten)]
	pub body: BodyArgs,

	/// Also fetch and print the return value in this format (json, print, csv, ...)
	#[arg(long, value_name = "FORMAT")]
	pub value: Option<Format>,

	/// Query parameter for the value request (repeatable)
	#[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
	pub params: Vec<(String, String)>,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
	/// Path below the API root, e.g. tmp/x0a1b2c/R/.val/json
	pub path: String,

	/// Query parameter (repeatable)
	#[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
	pub params: Vec<(String, String)>,
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
	/// Function path below the API root, e.g. library/utils/R/read.csv
	pub path: String,

	/// File part as LABEL=PATH (repeatable)
	#[arg(long = "file", value_name = "LABEL=PATH", required = true, value_parser = parse_file_arg)]
	pub files: Vec<(String, PathBuf)>,

	/// Form field (repeatable)
	#[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
	pub fields: Vec<(String, String)>,
}

/// Help colors: bold yellow headers and usage, green literals.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default().bold())
		.usage(AnsiColor::Yellow.on_default().bold())
		.literal(AnsiColor::Green.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.error(AnsiColor::Red.on_default().bold())
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
	match s.split_once('=') {
		Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
		_ => Err(format!("expected KEY=VALUE, got '{s}'")),
	}
}

fn parse_file_arg(s: &str) -> Result<(String, PathBuf), String> {
	match s.split_once('=') {
		Some((label, path)) if !label.is_empty() && !path.is_empty() => Ok((label.to_string(), PathBuf::from(path))),
		_ => Err(format!("expected LABEL=PATH, got '{s}'")),
	}
}
