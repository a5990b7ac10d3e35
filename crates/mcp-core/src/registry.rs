//! Tool registry and dispatcher.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rmcp::model::{Content, Tool};
use serde_json::Value;

use crate::handler::{ToolError, ToolHandler, ToolResult};
use crate::validation::{deserialize_arguments, ArgumentSchema};

/// Future produced by a registered tool once its arguments have been accepted.
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult<Vec<Content>>> + Send>>;

type Executor = Arc<dyn Fn(Value) -> ToolResult<ToolFuture> + Send + Sync>;

struct RegisteredTool {
    tool: Tool,
    schema: ArgumentSchema,
    executor: Executor,
}

/// Registry that stores tool implementations keyed by name.
///
/// Tools are registered during startup; afterwards the registry is only read,
/// so it can be shared behind an `Arc` without locking.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("registered", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool implementation.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already present, or
    /// [`ToolError::SchemaError`] if the parameter schema cannot be compiled.
    pub fn register<H: ToolHandler>(&mut self, handler: H) -> ToolResult<()> {
        let name = handler.name();
        if self.tools.contains_key(name) {
            return Err(ToolError::DuplicateTool(name.to_string()));
        }

        let schema = ArgumentSchema::for_type::<H::Params>()?;
        let tool = Tool::new(name, handler.description(), schema.as_object());

        let handler = Arc::new(handler);
        let executor: Executor = Arc::new(move |arguments: Value| {
            let params: H::Params = deserialize_arguments(arguments)?;
            let handler = Arc::clone(&handler);
            let future: ToolFuture = Box::pin(async move { handler.call(params).await });
            Ok(future)
        });

        self.tools.insert(
            name.to_string(),
            RegisteredTool {
                tool,
                schema,
                executor,
            },
        );
        Ok(())
    }

    /// Protocol descriptions of every registered tool, ordered by name.
    pub fn list(&self) -> Vec<Tool> {
        self.tools.values().map(|entry| entry.tool.clone()).collect()
    }

    /// Routes one invocation to its handler.
    ///
    /// Unknown names yield [`ToolError::NotFound`] and invalid arguments yield
    /// [`ToolError::InvalidParameters`]; in both cases no handler runs. Any
    /// failure raised by the handler itself is reported as
    /// [`ToolError::ExecutionError`].
    pub async fn dispatch(&self, name: &str, arguments: Value) -> ToolResult<Vec<Content>> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let arguments = entry.schema.normalize(arguments).inspect_err(|e| {
            tracing::warn!(tool = name, error = %e, "Rejected tool arguments");
        })?;
        let future = (entry.executor)(arguments)?;

        tracing::info!(tool = name, "Dispatching tool call");
        future.await.map_err(|err| {
            tracing::warn!(tool = name, error = %err, "Tool call failed");
            match err {
                ToolError::ExecutionError(_) => err,
                other => ToolError::ExecutionError(other.to_string()),
            }
        })
    }
}
