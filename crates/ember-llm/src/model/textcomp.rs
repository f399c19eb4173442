//! Adapter for text-completion backends fed through a prompt template

use std::sync::Arc;

use ember_core::RequestContext;
use minijinja::Environment;
use secrecy::ExposeSecret;

use super::upstream::{Upstream, decode_sse, hold_lease, read_json};
use crate::convert::textcomp::{textcomp_event_to_chunk, to_textcomp_request};
use crate::error::{ConfigError, LlmError};
use crate::processor::clean_whitespace;
use crate::protocol::textcomp::{TextCompRequest, TextCompResponse};
use crate::stream::ChunkStream;
use crate::types::{ChatRequest, ChatResponse};

const TEMPLATE_NAME: &str = "prompt";

/// Compiled prompt template shared by every model of one provider entry
#[derive(Debug)]
pub struct PromptTemplate {
    env: Environment<'static>,
}

impl PromptTemplate {
    /// Compile `source`; `provider` only labels the error
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidTemplate` if the template does not parse
    pub fn compile(provider: &str, source: String) -> Result<Self, ConfigError> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.add_template_owned(TEMPLATE_NAME, source)
            .map_err(|e| ConfigError::InvalidTemplate {
                provider: provider.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self { env })
    }

    /// Render the whole request; `messages[].content` is flattened to text
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if rendering fails
    pub fn render(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let mut context = serde_json::to_value(request).map_err(anyhow::Error::from)?;

        let messages = request
            .messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role,
                    "content": m.content.as_text(),
                    "name": m.name,
                })
            })
            .collect();

        if let Some(fields) = context.as_object_mut() {
            fields.insert("messages".to_owned(), serde_json::Value::Array(messages));
        }

        let template = self
            .env
            .get_template(TEMPLATE_NAME)
            .map_err(|e| anyhow::anyhow!("prompt template missing: {e}"))?;

        template
            .render(&context)
            .map_err(|e| LlmError::Internal(anyhow::anyhow!("failed to render prompt template: {e}")))
    }
}

/// Text-completion model
#[derive(Debug)]
pub struct TextCompModel {
    upstream: Upstream,
    template: Arc<PromptTemplate>,
    extra_stop_strings: Arc<[String]>,
    clean_whitespace: bool,
}

impl TextCompModel {
    pub const fn new(
        upstream: Upstream,
        template: Arc<PromptTemplate>,
        extra_stop_strings: Arc<[String]>,
        clean_whitespace: bool,
    ) -> Self {
        Self {
            upstream,
            template,
            extra_stop_strings,
            clean_whitespace,
        }
    }

    pub(crate) const fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    fn completions_url(&self) -> String {
        format!("{}/completions", self.upstream.base_url)
    }

    fn build_request(&self, request: ChatRequest, stream: bool) -> Result<TextCompRequest, LlmError> {
        let request = self.upstream.prepare(request);

        let mut prompt = self.template.render(&request)?;
        if self.clean_whitespace {
            prompt = clean_whitespace(&prompt);
        }

        let mut wire = to_textcomp_request(&request, &self.upstream.model, prompt, &self.extra_stop_strings);
        wire.stream = stream;

        Ok(wire)
    }

    pub(crate) async fn complete(&self, request: ChatRequest, ctx: &RequestContext) -> Result<ChatResponse, LlmError> {
        let wire = self.build_request(request, false)?;

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
                let wire_response: TextCompResponse = read_json(ctx, response).await?;

                Ok(wire_response.into())
            })
            .await
    }

    pub(crate) async fn stream(&self, request: ChatRequest, ctx: &RequestContext) -> Result<ChunkStream, LlmError> {
        let wire = self.build_request(request, true)?;

        let lease = self.upstream.keys.acquire(ctx).await?;
        let builder = self
            .upstream
            .client
            .post(self.completions_url())
            .bearer_auth(lease.expose())
            .json(&wire);

        let response = self.upstream.send(ctx, builder).await?;
        let chunks = decode_sse(response, textcomp_event_to_chunk);

        Ok(hold_lease(chunks, lease))
    }
}
