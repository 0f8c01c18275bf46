use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracklink_app::{init_tracing, run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    info!("Starting Tracklink v{}", env!("CARGO_PKG_VERSION"));

    let output = run(Cli::parse()).await?;
    info!(status = %output.status, "Done");
    Ok(())
}
