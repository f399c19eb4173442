//! Plumbing shared by the HTTP-backed adapters

use std::sync::Arc;

use ember_core::RequestContext;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::LlmError;
use crate::keys::{CredentialLease, KeyProvider};
use crate::processor::Processor;
use crate::stream::ChunkStream;
use crate::types::{ChatChunk, ChatRequest};

/// One upstream model behind an HTTP API
#[derive(Debug)]
pub struct Upstream {
    pub(crate) client: Client,
    /// Normalized base URL without a trailing slash
    pub(crate) base_url: String,
    /// Model id sent upstream
    pub(crate) model: String,
    pub(crate) keys: Arc<KeyProvider>,
    pub(crate) processor: Option<Arc<Processor>>,
}

impl Upstream {
    /// Run the model's processor, if any
    pub(crate) fn prepare(&self, request: ChatRequest) -> ChatRequest {
        match &self.processor {
            Some(processor) => {
                let processed = processor.process(request);
                tracing::debug!(
                    upstream_model = %self.model,
                    messages = processed.messages.len(),
                    "processed request"
                );
                processed
            }
            None => request,
        }
    }

    /// Send a request, racing it against cancellation
    ///
    /// Non-success statuses are turned into `LlmError::Upstream` with the
    /// response body attached.
    pub(crate) async fn send(&self, ctx: &RequestContext, builder: RequestBuilder) -> Result<Response, LlmError> {
        let response = tokio::select! {
            () = ctx.cancellation.cancelled() => return Err(LlmError::Cancelled),
            result = builder.send() => result.map_err(|e| {
                let e = e.without_url();
                tracing::error!(upstream_model = %self.model, error = %e, "upstream request failed");
                LlmError::Upstream(e.to_string())
            })?,
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                upstream_model = %self.model,
                status = %status,
                "upstream returned error"
            );
            return Err(LlmError::Upstream(format!("provider returned {status}: {body}")));
        }

        Ok(response)
    }
}

/// Read a whole JSON body, racing it against cancellation
pub(crate) async fn read_json<T: DeserializeOwned>(ctx: &RequestContext, response: Response) -> Result<T, LlmError> {
    tokio::select! {
        () = ctx.cancellation.cancelled() => Err(LlmError::Cancelled),
        parsed = response.json::<T>() => {
            parsed.map_err(|e| LlmError::Upstream(format!("failed to parse response: {}", e.without_url())))
        }
    }
}

/// Decode an SSE body into canonical chunks
///
/// `[DONE]` markers are skipped. Events that do not parse as `T`, or that
/// `convert` rejects, are logged and dropped; transport failures end up as
/// `LlmError::Streaming` items.
pub(crate) fn decode_sse<T, F>(response: Response, convert: F) -> ChunkStream
where
    T: DeserializeOwned + 'static,
    F: Fn(T) -> Option<ChatChunk> + Send + 'static,
{
    let mapped = response.bytes_stream().eventsource().filter_map(move |result| {
        let item = match result {
            Ok(event) => {
                let data = event.data.trim();
                if data == "[DONE]" {
                    None
                } else {
                    match serde_json::from_str::<T>(data) {
                        Ok(parsed) => convert(parsed).map(Ok),
                        Err(e) => {
                            tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
                            None
                        }
                    }
                }
            }
            Err(e) => Some(Err(LlmError::Streaming(e.to_string()))),
        };
        futures_util::future::ready(item)
    });

    Box::pin(mapped)
}

/// Keep `lease` alive until the stream is dropped
pub(crate) fn hold_lease(inner: ChunkStream, lease: CredentialLease) -> ChunkStream {
    Box::pin(inner.map(move |item| {
        let _held = &lease;
        item
    }))
}

/// Strip a trailing slash and make sure the URL ends with `/{version}`
pub(crate) fn normalize_base_url(url: &str, version: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let suffix = format!("/{version}");

    if trimmed.ends_with(&suffix) {
        trimmed.to_owned()
    } else {
        format!("{trimmed}{suffix}")
    }
}
