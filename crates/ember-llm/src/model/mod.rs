//! Protocol adapters
//!
//! Every registered model is one [`Model`] variant. Upstream-backed variants
//! run their processor, borrow a credential and talk to their backend;
//! [`Model::Random`] only picks another registered model and delegates.

pub mod gemini;
pub mod openai;
pub mod random;
pub mod textcomp;
pub mod trivial;
pub(crate) mod upstream;

use ember_core::RequestContext;
use futures_util::future::BoxFuture;

pub use self::gemini::GeminiModel;
pub use self::openai::OpenAiModel;
pub use self::random::{MAX_RESOLUTION_ATTEMPTS, RandomModel};
pub use self::textcomp::{PromptTemplate, TextCompModel};
pub use self::trivial::TrivialModel;
pub use self::upstream::Upstream;
use crate::error::LlmError;
use crate::registry::ModelRegistry;
use crate::stream::ChunkStream;
use crate::types::{ChatRequest, ChatResponse};

/// A registered model
#[derive(Debug)]
pub enum Model {
    Trivial(TrivialModel),
    GenericOai(OpenAiModel),
    Gemini(GeminiModel),
    TextComp(TextCompModel),
    Random(RandomModel),
}

impl Model {
    /// Produce a single complete response
    ///
    /// `registry` is only consulted by random models.
    ///
    /// # Errors
    ///
    /// Returns an error if credential acquisition, the upstream call or
    /// response decoding fails, or the request is cancelled
    pub fn complete<'a>(
        &'a self,
        registry: &'a ModelRegistry,
        request: ChatRequest,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, Result<ChatResponse, LlmError>> {
        Box::pin(async move {
            match self {
                Self::Trivial(model) => Ok(model.complete()),
                Self::GenericOai(model) => model.complete(request, ctx).await,
                Self::Gemini(model) => model.complete(request, ctx).await,
                Self::TextComp(model) => model.complete(request, ctx).await,
                Self::Random(model) => model.complete(registry, request, ctx).await,
            }
        })
    }

    /// Start a streamed response
    ///
    /// Errors before the first chunk (credential, connection, non-2xx
    /// status) are returned here; later failures arrive as stream items.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be started
    pub fn stream<'a>(
        &'a self,
        registry: &'a ModelRegistry,
        request: ChatRequest,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, Result<ChunkStream, LlmError>> {
        Box::pin(async move {
            match self {
                Self::Trivial(model) => Ok(model.stream()),
                Self::GenericOai(model) => model.stream(request, ctx).await,
                Self::Gemini(model) => model.stream(request, ctx).await,
                Self::TextComp(model) => model.stream(request, ctx).await,
                Self::Random(model) => model.stream(registry, request, ctx).await,
            }
        })
    }

    /// Upstream connection details for HTTP-backed models
    pub(crate) const fn upstream(&self) -> Option<&Upstream> {
        match self {
            Self::GenericOai(model) => Some(model.upstream()),
            Self::Gemini(model) => Some(model.upstream()),
            Self::TextComp(model) => Some(model.upstream()),
            Self::Trivial(_) | Self::Random(_) => None,
        }
    }

    /// Short label of the adapter kind, used in logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Trivial(_) => "trivial",
            Self::GenericOai(_) => "genericoai",
            Self::Gemini(_) => "gemini",
            Self::TextComp(_) => "textcomp",
            Self::Random(_) => "random",
        }
    }
}
