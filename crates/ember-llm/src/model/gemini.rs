//! Adapter for Google Gemini `generateContent`

use ember_core::RequestContext;
use http::header::ACCEPT;
use secrecy::ExposeSecret;

use super::upstream::{Upstream, decode_sse, hold_lease, read_json};
use crate::convert::gemini::gemini_event_to_chunk;
use crate::error::LlmError;
use crate::protocol::gemini::{GeminiRequest, GeminiResponse};
use crate::stream::ChunkStream;
use crate::types::{ChatRequest, ChatResponse};

/// Gemini model; the credential travels as the `key` query parameter
#[derive(Debug)]
pub struct GeminiModel {
    upstream: Upstream,
}

impl GeminiModel {
    pub const fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub(crate) const fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/models/{}:{action}", self.upstream.base_url, self.upstream.model)
    }

    pub(crate) async fn complete(&self, request: ChatRequest, ctx: &RequestContext) -> Result<ChatResponse, LlmError> {
        let request = self.upstream.prepare(request);
        let wire = GeminiRequest::from(&request);

        self.upstream
            .keys
            .with_credential(ctx, |key| async move {
                let builder = self
                    .upstream
                    .client
                    .post(self.action_url("generateContent"))
                    .query(&[("key", key.expose_secret())])
                    .json(&wire);

                let response = self.upstream.send(ctx, builder).await?;
                let wire_response: GeminiResponse = read_json(ctx, response).await?;

                Ok(wire_response.into())
            })
            .await
    }

    pub(crate) async fn stream(&self, request: ChatRequest, ctx: &RequestContext) -> Result<ChunkStream, LlmError> {
        let request = self.upstream.prepare(request);
        let wire = GeminiRequest::from(&request);

        let lease = self.upstream.keys.acquire(ctx).await?;
        let builder = self
            .upstream
            .client
            .post(self.action_url("streamGenerateContent"))
            .query(&[("alt", "sse"), ("key", lease.expose())])
            .header(ACCEPT, "text/event-stream")
            .json(&wire);

        let response = self.upstream.send(ctx, builder).await?;
        let chunks = decode_sse(response, |event: GeminiResponse| Some(gemini_event_to_chunk(event)));

        Ok(hold_lease(chunks, lease))
    }
}
