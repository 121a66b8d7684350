//! LawMate command-line client.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lawmate::cli::{execute, Cli};

/// Log to stderr so streamed answers on stdout stay clean.
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "lawmate=debug" } else { "lawmate=error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    execute(cli).await
}
