use ember_core::RequestContext;

use super::Model;
use crate::error::LlmError;
use crate::registry::ModelRegistry;
use crate::stream::ChunkStream;
use crate::types::{ChatRequest, ChatResponse};
use crate::weighted::Weighted;

/// Draws tolerated before giving up on an unregistered target
///
/// Targets are checked when the registry is built, so in practice the
/// first draw always resolves.
pub const MAX_RESOLUTION_ATTEMPTS: usize = 3;

/// Delegates each request to a registered model drawn by weight
#[derive(Debug)]
pub struct RandomModel {
    name: String,
    targets: Weighted<String>,
}

impl RandomModel {
    pub const fn new(name: String, targets: Weighted<String>) -> Self {
        Self { name, targets }
    }

    /// Target model names in configuration order
    pub fn targets(&self) -> impl Iterator<Item = &String> {
        self.targets.values()
    }

    fn pick<'r>(&self, registry: &'r ModelRegistry) -> Result<&'r Model, LlmError> {
        for attempt in 1..=MAX_RESOLUTION_ATTEMPTS {
            let target = self.targets.select();

            if let Some(model) = registry.get(target) {
                tracing::debug!(model = %self.name, target = %target, "random model selected target");
                return Ok(model);
            }

            tracing::warn!(model = %self.name, target = %target, attempt, "random model target is not registered");
        }

        Err(LlmError::NoValidTarget {
            model: self.name.clone(),
        })
    }

    pub(crate) async fn complete(
        &self,
        registry: &ModelRegistry,
        request: ChatRequest,
        ctx: &RequestContext,
    ) -> Result<ChatResponse, LlmError> {
        self.pick(registry)?.complete(registry, request, ctx).await
    }

    pub(crate) async fn stream(
        &self,
        registry: &ModelRegistry,
        request: ChatRequest,
        ctx: &RequestContext,
    ) -> Result<ChunkStream, LlmError> {
        self.pick(registry)?.stream(registry, request, ctx).await
    }
}
