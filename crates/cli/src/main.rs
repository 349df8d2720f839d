use clap::Parser;
use ocpu_cli::{cli::Cli, commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(cli).await {
		eprintln!("Error: {err}");
		std::process::exit(err.exit_code());
	}
}
