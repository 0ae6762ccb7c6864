use apigraph::cli::{Cli, Command};
use apigraph::{cmd_extract, cmd_init};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match cli.command {
        Command::Extract(args) => cmd_extract(args),
        Command::Init(args) => cmd_init(args),
    };

    std::process::exit(exit_code);
}

/// Logs go to stderr. `RUST_LOG` controls the filter unless `--verbose`
/// asks for debug output.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("apigraph=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
