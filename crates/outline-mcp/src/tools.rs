use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use mcp_core::{ToolError, ToolHandler, ToolResult};
use rmcp::model::Content;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Number, Value};

use crate::client::{OutlineClient, RemoteCall};

pub const DOCUMENTS_SEARCH: &str = "documents.search";
pub const DOCUMENTS_INFO: &str = "documents.info";

fn json_text(value: &Value) -> ToolResult<Vec<Content>> {
    let text = serde_json::to_string(value)
        .map_err(|e| ToolError::execution(format!("Failed to encode result: {}", e)))?;
    Ok(vec![Content::text(text)])
}

/// Renders `value` the way JavaScript's `String(number)` does.
///
/// Magnitudes of `1e21` and above or below `1e-6` use exponent notation with
/// an explicit sign (`1e+21`), infinities are spelled out and negative zero
/// prints as `0`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let exponent_form = format!("{:e}", value);
        return match exponent_form.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => exponent_form,
        };
    }
    value.to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddParams {
    pub a: f64,
    pub b: f64,
}

/// Adds two numbers. Needs no server, handy for checking a client setup.
pub struct AddTool;

#[async_trait]
impl ToolHandler for AddTool {
    type Params = AddParams;

    fn name(&self) -> &'static str {
        "add"
    }

    fn description(&self) -> &'static str {
        "Add two numbers"
    }

    async fn call(&self, params: AddParams) -> ToolResult<Vec<Content>> {
        Ok(vec![Content::text(format_number(params.a + params.b))])
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// search query
    pub query: String,
    /// pagination offset
    #[serde(default = "default_offset")]
    pub offset: Number,
    /// max pagination limit
    #[serde(default = "default_limit")]
    pub limit: Number,
}

// Pagination values are passed to Outline exactly as the caller wrote them.
fn default_offset() -> Number {
    Number::from(1)
}

fn default_limit() -> Number {
    Number::from(10)
}

pub struct SearchTool {
    client: Arc<OutlineClient>,
}

impl SearchTool {
    pub fn new(client: Arc<OutlineClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for SearchTool {
    type Params = SearchParams;

    fn name(&self) -> &'static str {
        "search"
    }

    fn description(&self) -> &'static str {
        "Search documents in the Outline knowledge base"
    }

    async fn call(&self, params: SearchParams) -> ToolResult<Vec<Content>> {
        let body = json!({
            "offset": params.offset,
            "limit": params.limit,
            "query": params.query,
        });
        let data = self
            .client
            .call(RemoteCall::post(DOCUMENTS_SEARCH, body))
            .await?;
        json_text(&data)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadParams {
    /// document ids
    pub ids: Vec<String>,
}

/// Fetches several documents at once.
///
/// All lookups are issued together; the first failure fails the whole call
/// and the lookups still in flight are dropped.
pub struct ReadTool {
    client: Arc<OutlineClient>,
}

impl ReadTool {
    pub fn new(client: Arc<OutlineClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for ReadTool {
    type Params = ReadParams;

    fn name(&self) -> &'static str {
        "read"
    }

    fn description(&self) -> &'static str {
        "Read Outline documents by id"
    }

    async fn call(&self, params: ReadParams) -> ToolResult<Vec<Content>> {
        let lookups = params.ids.iter().map(|id| async move {
            self.client
                .call(RemoteCall::post(DOCUMENTS_INFO, json!({ "id": id })))
                .await
                .map_err(|e| {
                    tracing::warn!(id = %id, status = ?e.status(), "Document lookup failed");
                    ToolError::execution(format!("Failed to read document {}: {}", id, e))
                })
        });
        let documents = try_join_all(lookups).await?;
        json_text(&Value::Array(documents))
    }
}
