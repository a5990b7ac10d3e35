//! MCP server exposing an Outline knowledge base.
//!
//! Tool calls arrive as JSON-RPC over stdio, are validated and dispatched by
//! [`mcp_core::ToolRegistry`], and forwarded to the Outline API through
//! [`client::OutlineClient`].

pub mod cli;
pub mod client;
pub mod logging;
pub mod router;
pub mod tools;

use std::sync::Arc;

use anyhow::{Context, Result};
use mcp_server::router::RouterService;
use mcp_server::{ByteTransport, Server};
use tokio::io::{stdin, stdout};

pub use client::{OutlineClient, RemoteCall, RemoteCallError, SessionConfig};
pub use router::OutlineRouter;

/// Builds the router for `config` and serves it on stdio until stdin closes.
pub async fn run_server(config: SessionConfig) -> Result<()> {
    let config = Arc::new(config);
    let client =
        OutlineClient::new(Arc::clone(&config)).context("Failed to create Outline client")?;
    let router = OutlineRouter::new(Arc::new(client)).context("Failed to register tools")?;

    let server = Server::new(RouterService(router));
    let transport = ByteTransport::new(stdin(), stdout());

    tracing::info!("Server running on stdio");
    tracing::info!(
        server = %config.server(),
        token = %config.redacted_token(),
        "Using Outline server"
    );

    server
        .run(transport)
        .await
        .context("Server stopped with an error")
}
