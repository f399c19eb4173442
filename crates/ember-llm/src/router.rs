use std::sync::Arc;

use axum::{Router, routing};

use crate::handler;
use crate::registry::ModelRegistry;

/// `OpenAI`-compatible routes backed by `registry`
///
/// Handlers expect a `RequestContext` extension on every request.
pub fn llm_router(registry: Arc<ModelRegistry>) -> Router {
    Router::new()
        .route("/v1/chat/completions", routing::post(handler::chat_completions))
        .route("/v1/models", routing::get(handler::list_models))
        .with_state(registry)
}
