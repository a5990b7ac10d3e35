use async_trait::async_trait;
use rmcp::model::Content;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Invalid parameters: {message}")]
    InvalidParameters {
        message: String,
        /// JSON pointers of the offending fields, e.g. `/offset`.
        fields: Vec<String>,
    },
    #[error("Execution failed: {0}")]
    ExecutionError(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("Tool not found: {0}")]
    NotFound(String),
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),
}

impl ToolError {
    pub fn invalid_parameters(message: impl Into<String>, fields: Vec<String>) -> Self {
        ToolError::InvalidParameters {
            message: message.into(),
            fields,
        }
    }

    pub fn execution(reason: impl Into<String>) -> Self {
        ToolError::ExecutionError(reason.into())
    }
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Trait for implementing MCP tools
///
/// Arguments arrive already validated against the schema generated from
/// [`ToolHandler::Params`], with declared defaults filled in.
#[async_trait]
pub trait ToolHandler: Send + Sync + 'static {
    /// Typed arguments; the tool's input schema is derived from this type
    type Params: DeserializeOwned + JsonSchema + Send + 'static;

    /// The name of the tool
    fn name(&self) -> &'static str;

    /// A description of what the tool does
    fn description(&self) -> &'static str;

    /// Execute the tool with the given parameters
    async fn call(&self, params: Self::Params) -> ToolResult<Vec<Content>>;
}

/// Helper function to generate JSON schema for a type
pub fn generate_schema<T: JsonSchema>() -> ToolResult<Value> {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema).map_err(|e| ToolError::SchemaError(e.to_string()))
}
