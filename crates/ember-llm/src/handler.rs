//! Axum handlers for the `OpenAI`-compatible endpoints

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use ember_core::{HttpError, RequestContext};
use futures_util::{Stream, StreamExt, stream};
use tokio_util::sync::DropGuard;

use crate::error::LlmError;
use crate::protocol::openai::{OpenAiModel, OpenAiModelList};
use crate::registry::ModelRegistry;
use crate::stream::ChunkStream;
use crate::types::{ChatChunk, ChatRequest};

/// Handle `POST /v1/chat/completions`
///
/// The request's cancellation token fires when this handler's future or
/// the streamed body is dropped, which is how a client disconnect reaches
/// upstream calls and pool waits.
pub(crate) async fn chat_completions(
    State(registry): State<Arc<ModelRegistry>>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_to_openai_response(LlmError::InvalidRequest(rejection.body_text())),
    };

    let cancel_on_drop = context.cancellation.clone().drop_guard();

    if request.stream {
        match registry.stream(request, &context).await {
            Ok(chunks) => sse_response(chunks, cancel_on_drop).into_response(),
            Err(e) => error_to_openai_response(e),
        }
    } else {
        let result = registry.complete(request, &context).await;
        drop(cancel_on_drop);

        match result {
            Ok(response) => Json(response).into_response(),
            Err(e) => error_to_openai_response(e),
        }
    }
}

/// Handle `GET /v1/models`
pub(crate) async fn list_models(State(registry): State<Arc<ModelRegistry>>) -> Json<OpenAiModelList> {
    let data = registry
        .model_names()
        .into_iter()
        .map(|(id, owner)| OpenAiModel {
            id: id.to_owned(),
            object: "model".to_owned(),
            owned_by: owner.to_owned(),
        })
        .collect();

    Json(OpenAiModelList {
        object: "list".to_owned(),
        data,
    })
}

/// One `data:` event per chunk, an error frame for failures, then `[DONE]`
fn sse_response(chunks: ChunkStream, cancel_on_drop: DropGuard) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = chunks
        .map(chunk_event)
        .chain(stream::once(async { Event::default().data("[DONE]") }))
        .map(move |event| {
            let _held = &cancel_on_drop;
            Ok(event)
        });

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn chunk_event(item: Result<ChatChunk, LlmError>) -> Event {
    match item {
        Ok(chunk) => Event::default().data(serde_json::to_string(&chunk).unwrap_or_default()),
        Err(e) => {
            tracing::warn!(error = %e, "stream failed after it started");
            let error_data = serde_json::json!({
                "error": {
                    "message": e.client_message(),
                    "type": e.error_type(),
                    "code": serde_json::Value::Null,
                }
            });
            Event::default().data(error_data.to_string())
        }
    }
}

/// Convert an LLM error to an `OpenAI`-style JSON error response
#[allow(clippy::needless_pass_by_value)]
fn error_to_openai_response(error: LlmError) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!(error = %error, "request failed");
    } else {
        tracing::debug!(error = %error, "request rejected");
    }

    let body = serde_json::json!({
        "error": {
            "message": error.client_message(),
            "type": error.error_type(),
            "code": serde_json::Value::Null,
        }
    });

    (status, Json(body)).into_response()
}
