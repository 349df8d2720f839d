use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the stderr subscriber. `RUST_LOG` overrides `verbosity`.
pub fn init_logging(verbosity: u8) {
	// 0 = errors only
	// 1 (-v) = info, e.g. which server a session attached to
	// 2+ (-vv) = debug, including engine launch and probe results
	let filter = match verbosity {
		0 => "error",
		1 => "info",
		_ => "debug,hyper=info,reqwest=info",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(verbosity > 1)
		.compact()
		.init();
}
