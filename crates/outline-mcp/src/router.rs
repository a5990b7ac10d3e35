use std::{future::Future, pin::Pin, sync::Arc};

use indoc::indoc;
use mcp_core::{ToolError, ToolRegistry, ToolResult};
use mcp_server::router::{CapabilitiesBuilder, ServerCapabilities};
use mcp_server::Router;
use rmcp::model::{Content, Tool};
use serde_json::Value;

use crate::client::OutlineClient;
use crate::tools::{AddTool, ReadTool, SearchTool};

pub const SERVER_NAME: &str = "outline-mcp";

#[derive(Clone, Debug)]
pub struct OutlineRouter {
    registry: Arc<ToolRegistry>,
    instructions: String,
}

impl OutlineRouter {
    pub fn new(client: Arc<OutlineClient>) -> ToolResult<Self> {
        let mut registry = ToolRegistry::new();
        registry.register(AddTool)?;
        registry.register(SearchTool::new(Arc::clone(&client)))?;
        registry.register(ReadTool::new(client))?;

        let instructions = indoc! {r#"
            Tools for an Outline knowledge base.

            Use `search` to find documents matching a query; results are paginated
            with `offset` and `limit`. Use `read` with the ids from the search results
            to fetch the full documents.
        "#}
        .to_string();

        Ok(Self {
            registry: Arc::new(registry),
            instructions,
        })
    }
}

impl Router for OutlineRouter {
    fn name(&self) -> String {
        SERVER_NAME.to_string()
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn instructions(&self) -> String {
        self.instructions.clone()
    }

    fn capabilities(&self) -> ServerCapabilities {
        CapabilitiesBuilder::new().with_tools(false).build()
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.registry.list()
    }

    fn call_tool(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Content>, ToolError>> + Send + 'static>> {
        let registry = Arc::clone(&self.registry);
        let tool_name = tool_name.to_string();
        Box::pin(async move { registry.dispatch(&tool_name, arguments).await })
    }
}
