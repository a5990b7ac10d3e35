//! HTTP client for the Outline API.
//!
//! Every call is a JSON request to `<server>/api/<path>` carrying the session
//! bearer token. The token and the content type are installed as default
//! headers when the client is built and cannot be changed per call.

use std::fmt;
use std::sync::Arc;

use mcp_core::ToolError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Outline serves its RPC-style API under this prefix.
pub const API_PREFIX: &str = "api";

/// Address and credential of the Outline server, fixed for the process lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionConfig {
    server: String,
    token: String,
}

impl SessionConfig {
    pub fn new(server: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            token: token.into(),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The token with everything but its last four characters masked.
    pub fn redacted_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("server", &self.server)
            .field("token", &self.redacted_token())
            .finish()
    }
}

/// One outbound request to the Outline API.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub path: String,
    pub method: Method,
    pub body: Value,
}

impl RemoteCall {
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            path: path.into(),
            method: Method::POST,
            body,
        }
    }
}

#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned status {status}: {message}")]
    Status {
        path: String,
        status: StatusCode,
        message: String,
    },

    #[error("{path} returned an invalid body: {reason}")]
    InvalidBody { path: String, reason: String },

    #[error("{path} response has no `data` field")]
    MissingData { path: String },
}

impl RemoteCallError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RemoteCallError::Status { status, .. } => Some(*status),
            RemoteCallError::Request { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<RemoteCallError> for ToolError {
    fn from(err: RemoteCallError) -> Self {
        ToolError::ExecutionError(err.to_string())
    }
}

#[derive(Clone)]
pub struct OutlineClient {
    http: Client,
    config: Arc<SessionConfig>,
}

impl fmt::Debug for OutlineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OutlineClient {
    pub fn new(config: Arc<SessionConfig>) -> Result<Self, RemoteCallError> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.token()))
            .map_err(|e| RemoteCallError::InvalidConfig(format!("invalid token: {}", e)))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteCallError::InvalidConfig(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.server().trim_end_matches('/'),
            API_PREFIX,
            path.trim_start_matches('/')
        )
    }

    /// Issues `call` and returns the `data` field of the JSON response.
    pub async fn call(&self, call: RemoteCall) -> Result<Value, RemoteCallError> {
        let RemoteCall { path, method, body } = call;
        let url = self.endpoint(&path);

        tracing::debug!(%method, %url, "Calling Outline");
        let response = self
            .http
            .request(method, &url)
            .json(&body)
            .send()
            .await
            .map_err(|source| RemoteCallError::Request {
                path: path.clone(),
                source,
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| RemoteCallError::Request {
                path: path.clone(),
                source,
            })?;

        if !status.is_success() {
            tracing::debug!(%status, %url, "Outline request failed");
            return Err(RemoteCallError::Status {
                path,
                status,
                message: error_message(status, &bytes),
            });
        }

        let mut payload: Value =
            serde_json::from_slice(&bytes).map_err(|e| RemoteCallError::InvalidBody {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        match payload.get_mut("data") {
            Some(data) => Ok(data.take()),
            None => Err(RemoteCallError::MissingData { path }),
        }
    }
}

/// Outline error bodies look like `{"ok": false, "error": "not_found", "message": "..."}`.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    let parsed = serde_json::from_slice::<Value>(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(Value::as_str)
            .map(str::to_owned)
    };

    field("message")
        .or_else(|| field("error"))
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string())
}
