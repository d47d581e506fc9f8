use anyhow::Result;
use clap::Parser;
use infralink::cli::{self, InfralinkCli};
use infralink::runtime::RuntimeRegistry;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = InfralinkCli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Starting infralink v{}", env!("CARGO_PKG_VERSION"));

    // Provider crates ship their own binary with their runtimes registered.
    if let Err(e) = cli::run(cli, RuntimeRegistry::new()).await {
        error!("{e}");
        if let Some(hint) = e.hint() {
            eprintln!("💡 {hint}");
        }
        return Err(e.into());
    }
    Ok(())
}
