//! Exit codes and messages of the `ocpu` binary when no server is usable.

use std::process::{Command, Output};

fn ocpu(args: &[&str]) -> Output {
	Command::new(env!("CARGO_BIN_EXE_ocpu"))
		.args(args)
		.env_remove("OCPU_HOST")
		.env_remove("OCPU_PORT")
		.env_remove("OCPU_R")
		.env_remove("OCPU_NAMESPACE")
		.env_remove("OCPU_TIMEOUT")
		.env_remove("RUST_LOG")
		.output()
		.expect("failed to execute ocpu")
}

fn stderr(output: &Output) -> String {
	String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn unsupported_scheme_is_reported() {
	let output = ocpu(&["--host", "ftp://example.org", "get", "info"]);
	assert_eq!(output.status.code(), Some(1));
	let err = stderr(&output);
	assert!(err.starts_with("Error: "), "unexpected stderr: {err}");
	assert!(err.contains("must use http or https"), "unexpected stderr: {err}");
	assert!(output.stdout.is_empty());
}

#[test]
fn missing_engine_is_reported() {
	let output = ocpu(&["--r-path", "/nonexistent/bin/R", "get", "info"]);
	assert_eq!(output.status.code(), Some(1));
	let err = stderr(&output);
	assert!(err.contains("compute engine '/nonexistent/bin/R' not found"), "unexpected stderr: {err}");
}

#[test]
fn refused_connection_gives_up_after_timeout() {
	let output = ocpu(&["--host", "http://127.0.0.1:1", "--timeout", "1", "get", "info"]);
	assert_eq!(output.status.code(), Some(1));
	let err = stderr(&output);
	assert!(err.contains("not ready"), "unexpected stderr: {err}");
}

#[test]
fn bad_arguments_exit_with_usage_code() {
	let output = ocpu(&["get", "info", "--param", "novalue"]);
	assert_eq!(output.status.code(), Some(2));
	assert!(stderr(&output).contains("expected KEY=VALUE"));
}
