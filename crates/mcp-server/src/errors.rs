use rmcp::model::{ErrorCode, ErrorData};
use serde_json::json;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Sync + Send>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid UTF-8 sequence: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String, fields: Vec<String> },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RouterError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        RouterError::InvalidParams {
            message: message.into(),
            fields: Vec::new(),
        }
    }
}

impl From<RouterError> for ErrorData {
    fn from(err: RouterError) -> Self {
        let message = err.to_string().into();
        match err {
            RouterError::MethodNotFound(_) => ErrorData {
                code: ErrorCode::METHOD_NOT_FOUND,
                message,
                data: None,
            },
            RouterError::InvalidParams { fields, .. } => ErrorData {
                code: ErrorCode::INVALID_PARAMS,
                message,
                data: (!fields.is_empty()).then(|| json!({ "fields": fields })),
            },
            RouterError::ToolNotFound(tool) => ErrorData {
                code: ErrorCode::INVALID_PARAMS,
                message,
                data: Some(json!({ "tool": tool })),
            },
            RouterError::Internal(_) => ErrorData {
                code: ErrorCode::INTERNAL_ERROR,
                message,
                data: None,
            },
        }
    }
}
