//! Adapter for OpenAI-style `/chat/completions` backends

use ember_core::RequestContext;
use secrecy::ExposeSecret;

use super::upstream::{Upstream, decode_sse, hold_lease, read_json};
use crate::convert::openai::{ContinuationFlags, to_openai_request};
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiResponse, OpenAiStreamChunk};
use crate::stream::ChunkStream;
use crate::types::{ChatChunk, ChatRequest, ChatResponse};

/// Generic OpenAI-compatible model
#[derive(Debug)]
pub struct OpenAiModel {
    upstream: Upstream,
    flags: ContinuationFlags,
}

impl OpenAiModel {
    pub const fn new(upstream: Upstream, flags: ContinuationFlags) -> Self {
        Self { upstream, flags }
    }

    pub(crate) const fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.upstream.base_url)
    }

    pub(crate) async fn complete(&self, request: ChatRequest, ctx: &RequestContext) -> Result<ChatResponse, LlmError> {
        let request = self.upstream.prepare(request);
        let mut wire = to_openai_request(&request, &self.upstream.model, self.flags);
        wire.stream = false;

        self.upstream
            .keys
            .with_credential(ctx, |key| async move {
                let builder = self
                    .upstream
                    .client
                    .post(self.completions_url())
                    .bearer_auth(key.expose_secret())
                    .json(&wire);

                let response = self.upstream.send(ctx, builder).await?;
                let wire_response: OpenAiResponse = read_json(ctx, response).await?;

                Ok(wire_response.into())
            })
            .await
    }

    pub(crate) async fn stream(&self, request: ChatRequest, ctx: &RequestContext) -> Result<ChunkStream, LlmError> {
        let request = self.upstream.prepare(request);
        let mut wire = to_openai_request(&request, &self.upstream.model, self.flags);
        wire.stream = true;

        let lease = self.upstream.keys.acquire(ctx).await?;
        let builder = self
            .upstream
            .client
            .post(self.completions_url())
            .bearer_auth(lease.expose())
            .json(&wire);

        let response = self.upstream.send(ctx, builder).await?;
        let chunks = decode_sse(response, |chunk: OpenAiStreamChunk| Some(ChatChunk::from(chunk)));

        Ok(hold_lease(chunks, lease))
    }
}
