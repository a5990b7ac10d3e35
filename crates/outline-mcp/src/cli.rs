use clap::Parser;

use crate::client::SessionConfig;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "outline-mcp",
    author,
    version,
    about = "MCP server for an Outline knowledge base, served over stdio",
    long_about = None
)]
pub struct Args {
    /// Base address of the Outline server, e.g. https://docs.example.com
    pub server: String,

    /// Outline API token, sent as the bearer credential
    pub token: String,
}

impl Args {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.server.clone(), self.token.clone())
    }
}
