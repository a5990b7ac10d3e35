use anyhow::Result;
use clap::Parser;
use outline_mcp::cli::Args;
use outline_mcp::{logging, run_server};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Usage errors exit here, before any transport exists
    let args = Args::parse();
    let _guard = logging::setup_logging()?;

    run_server(args.session_config()).await.inspect_err(|e| {
        tracing::error!("Fatal error running server: {:#}", e);
    })
}
