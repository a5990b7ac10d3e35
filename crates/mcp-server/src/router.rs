use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::future::ready;
use mcp_core::handler::ToolError;
use rmcp::model::{
    Content, JsonObject, JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse,
    JsonRpcVersion2_0, Tool,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_service::Service;

use crate::{BoxError, RouterError};

/// Protocol revisions this server can speak, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-03-26", "2024-11-05"];

type RouterFuture = Pin<Box<dyn Future<Output = Result<JsonObject, RouterError>> + Send>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

#[derive(Default)]
pub struct CapabilitiesBuilder {
    tools: Option<ToolsCapability>,
}

impl CapabilitiesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(mut self, list_changed: bool) -> Self {
        self.tools = Some(ToolsCapability {
            list_changed: Some(list_changed),
        });
        self
    }

    pub fn build(self) -> ServerCapabilities {
        ServerCapabilities { tools: self.tools }
    }
}

pub trait Router: Send + Sync + 'static {
    fn name(&self) -> String;
    fn version(&self) -> String;
    fn instructions(&self) -> String;
    fn capabilities(&self) -> ServerCapabilities;
    fn list_tools(&self) -> Vec<Tool>;
    fn call_tool(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Content>, ToolError>> + Send + 'static>>;
}

fn into_object<T: Serialize>(value: T) -> Result<JsonObject, RouterError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(RouterError::Internal(format!(
            "result is not a JSON object: {}",
            other
        ))),
        Err(e) => Err(RouterError::Internal(e.to_string())),
    }
}

fn handle_initialize<R: Router>(router: &R, params: &JsonObject) -> Result<JsonObject, RouterError> {
    let requested = params.get("protocolVersion").and_then(Value::as_str);
    let protocol_version = requested
        .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0]);

    into_object(json!({
        "protocolVersion": protocol_version,
        "capabilities": router.capabilities(),
        "serverInfo": {
            "name": router.name(),
            "version": router.version(),
        },
        "instructions": router.instructions(),
    }))
}

fn handle_tools_list<R: Router>(router: &R) -> Result<JsonObject, RouterError> {
    into_object(json!({ "tools": router.list_tools() }))
}

fn handle_tools_call<R: Router>(router: &R, params: &JsonObject) -> RouterFuture {
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return Box::pin(ready(Err(RouterError::invalid_params("Missing tool name"))));
    };
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
    let call = router.call_tool(name, arguments);

    Box::pin(async move {
        let (content, is_error) = match call.await {
            Ok(content) => (content, false),
            Err(ToolError::ExecutionError(message)) => (vec![Content::text(message)], true),
            Err(ToolError::NotFound(tool)) => return Err(RouterError::ToolNotFound(tool)),
            Err(ToolError::InvalidParameters { message, fields }) => {
                return Err(RouterError::InvalidParams { message, fields })
            }
            Err(other) => return Err(RouterError::Internal(other.to_string())),
        };
        into_object(json!({ "content": content, "isError": is_error }))
    })
}

/// Maps MCP requests onto a [`Router`].
///
/// Every request yields a reply message: failures become JSON-RPC errors,
/// except tool execution failures which are reported as a tool result with
/// `isError` set.
pub struct RouterService<T>(pub T);

impl<T> Service<JsonRpcRequest> for RouterService<T>
where
    T: Router,
{
    type Response = JsonRpcMessage;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: JsonRpcRequest) -> Self::Future {
        let JsonRpcRequest { id, request, .. } = req;
        let router = &self.0;

        let outcome: RouterFuture = match request.method.as_str() {
            "initialize" => Box::pin(ready(handle_initialize(router, &request.params))),
            "ping" => Box::pin(ready(Ok(JsonObject::new()))),
            "tools/list" => Box::pin(ready(handle_tools_list(router))),
            "tools/call" => handle_tools_call(router, &request.params),
            method => Box::pin(ready(Err(RouterError::MethodNotFound(method.to_string())))),
        };

        Box::pin(async move {
            let message = match outcome.await {
                Ok(result) => JsonRpcMessage::Response(JsonRpcResponse {
                    jsonrpc: JsonRpcVersion2_0,
                    id,
                    result,
                }),
                Err(err) => {
                    tracing::warn!(error = %err, "Request failed");
                    JsonRpcMessage::Error(JsonRpcError {
                        jsonrpc: JsonRpcVersion2_0,
                        id,
                        error: err.into(),
                    })
                }
            };
            Ok(message)
        })
    }
}
