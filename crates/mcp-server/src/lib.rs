use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use pin_project::pin_project;
use rmcp::model::{
    ErrorData, JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcVersion2_0, RequestId,
};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tower_service::Service;
use tracing::Instrument;

mod errors;
pub use errors::{BoxError, RouterError, ServerError, TransportError};

pub mod router;
pub use router::Router;

/// A transport layer that handles JSON-RPC messages over byte
#[pin_project]
pub struct ByteTransport<R, W> {
    // Reader is a BufReader on the underlying stream (stdin or similar) buffering
    // the underlying data across poll calls. Bytes of a partially received line
    // are kept in `line` so a Pending poll never loses them.
    #[pin]
    reader: BufReader<R>,
    line: Vec<u8>,
    #[pin]
    writer: W,
}

impl<R, W> ByteTransport<R, W>
where
    R: AsyncRead,
    W: AsyncWrite,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            // Default BufReader capacity is 8 * 1024, increase this to 2MB so
            // large tool results and arguments fit without reallocation churn
            reader: BufReader::with_capacity(2 * 1024 * 1024, reader),
            line: Vec::new(),
            writer,
        }
    }
}

fn parse_message(line: &str) -> Result<JsonRpcMessage, TransportError> {
    let value = serde_json::from_str::<serde_json::Value>(line)?;

    // Validate basic JSON-RPC structure
    let Some(obj) = value.as_object() else {
        return Err(TransportError::InvalidMessage(
            "Message must be a JSON object".into(),
        ));
    };

    // Check jsonrpc version field
    if obj.get("jsonrpc").and_then(|v| v.as_str()) != Some("2.0") {
        return Err(TransportError::InvalidMessage(
            "Missing or invalid jsonrpc version".into(),
        ));
    }

    Ok(serde_json::from_value::<JsonRpcMessage>(value)?)
}

impl<R, W> Stream for ByteTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    type Item = Result<JsonRpcMessage, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let mut reader = this.reader;
        let line = this.line;

        loop {
            let available = match reader.as_mut().poll_fill_buf(cx) {
                Poll::Ready(Ok(buf)) => buf,
                Poll::Ready(Err(e)) => return Poll::Ready(Some(Err(TransportError::Io(e)))),
                Poll::Pending => return Poll::Pending,
            };

            let eof = available.is_empty();
            let (consumed, complete) = match available.iter().position(|b| *b == b'\n') {
                Some(idx) => {
                    line.extend_from_slice(&available[..=idx]);
                    (idx + 1, true)
                }
                None => {
                    line.extend_from_slice(available);
                    (available.len(), eof)
                }
            };
            reader.as_mut().consume(consumed);

            if !complete {
                continue;
            }
            if eof && line.is_empty() {
                return Poll::Ready(None);
            }

            let buf = std::mem::take(line);
            let text = match String::from_utf8(buf) {
                Ok(s) => s,
                Err(e) => return Poll::Ready(Some(Err(TransportError::Utf8(e)))),
            };
            if text.trim().is_empty() {
                if eof {
                    return Poll::Ready(None);
                }
                continue;
            }

            // Log incoming message here before serde conversion to
            // track incomplete chunks which are not valid JSON
            tracing::info!(json = %text.trim_end(), "incoming message");
            return Poll::Ready(Some(parse_message(&text)));
        }
    }
}

impl<R, W> ByteTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub async fn write_message(&mut self, msg: JsonRpcMessage) -> Result<(), std::io::Error> {
        let json = serde_json::to_string(&msg)?;
        Pin::new(&mut self.writer)
            .write_all(json.as_bytes())
            .await?;
        Pin::new(&mut self.writer).write_all(b"\n").await?;
        Pin::new(&mut self.writer).flush().await?;
        Ok(())
    }
}

fn error_message(id: RequestId, error: ErrorData) -> JsonRpcMessage {
    JsonRpcMessage::Error(JsonRpcError {
        jsonrpc: JsonRpcVersion2_0,
        id,
        error,
    })
}

/// The main server type that processes incoming requests
pub struct Server<S> {
    service: S,
}

impl<S> Server<S>
where
    S: Service<JsonRpcRequest, Response = JsonRpcMessage> + Send,
    S::Error: Into<BoxError>,
    S::Future: Send,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Serves requests one at a time until the reader reaches EOF.
    ///
    /// Failures tied to a single message are answered on the transport and
    /// the loop keeps going; only a failure to write a reply ends it.
    pub async fn run<R, W>(self, mut transport: ByteTransport<R, W>) -> Result<(), ServerError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        use futures::StreamExt;
        let mut service = self.service;

        tracing::info!("Server started");
        while let Some(msg_result) = transport.next().await {
            let reply = match msg_result {
                Ok(JsonRpcMessage::Request(request)) => {
                    let span = tracing::info_span!("message_processing", id = %request.id);
                    tracing::info!(
                        parent: &span,
                        method = %request.request.method,
                        "Received request"
                    );

                    let id = request.id.clone();
                    match service.call(request).instrument(span).await {
                        Ok(reply) => reply,
                        Err(e) => {
                            let error_msg = e.into().to_string();
                            tracing::error!(error = %error_msg, "Request processing failed");
                            error_message(id, RouterError::Internal(error_msg).into())
                        }
                    }
                }
                Ok(JsonRpcMessage::Response(_))
                | Ok(JsonRpcMessage::Notification(_))
                | Ok(JsonRpcMessage::BatchRequest(_))
                | Ok(JsonRpcMessage::BatchResponse(_))
                | Ok(JsonRpcMessage::Error(_)) => {
                    // Ignore responses, notifications, batch messages and error messages
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read message");
                    // Convert transport error to JSON-RPC error response
                    let code = match e {
                        TransportError::Json(_) | TransportError::InvalidMessage(_) => {
                            rmcp::model::ErrorCode::PARSE_ERROR
                        }
                        _ => rmcp::model::ErrorCode::INTERNAL_ERROR,
                    };
                    let error_data = ErrorData {
                        code,
                        message: e.to_string().into(),
                        data: None,
                    };
                    // Use a default ID for transport errors
                    error_message(RequestId::Number(0), error_data)
                }
            };

            tracing::info!(
                json = %serde_json::to_string(&reply).unwrap_or_default(),
                "Sending response"
            );
            transport
                .write_message(reply)
                .await
                .map_err(|e| ServerError::Transport(TransportError::Io(e)))?;
        }

        tracing::info!("Server stopped: input closed");
        Ok(())
    }
}
