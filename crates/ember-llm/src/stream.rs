//! Stream post-processing shared by every model

use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt, stream};
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::types::{ChatChunk, ChunkChoice, ChunkDelta};

/// Lazy, finite stream of canonical chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, LlmError>> + Send>>;

/// End the stream as soon as `token` fires
///
/// A stream cancelled before it produced anything yields a single
/// `LlmError::Cancelled` first. Dropping the inner stream also drops any
/// upstream response body it owns.
pub fn cancellable(inner: ChunkStream, token: CancellationToken) -> ChunkStream {
    Box::pin(stream::unfold(
        (inner, token, false),
        |(mut inner, token, started)| async move {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => None,
                item = inner.next() => Some(item),
            };

            match next {
                None => (!started).then(|| (Err(LlmError::Cancelled), (inner, token, true))),
                Some(item) => item.map(|item| (item, (inner, token, true))),
            }
        },
    ))
}

/// Re-split multi-character deltas into one chunk per character
///
/// Every emitted chunk gets a fresh id from a per-stream counter starting
/// at zero. Errors pass through untouched.
pub fn split_chunks(inner: ChunkStream) -> ChunkStream {
    let split = inner
        .scan(0_u64, |next_id, item| {
            let out: Vec<Result<ChatChunk, LlmError>> = match item {
                Ok(chunk) => split_chunk(chunk)
                    .into_iter()
                    .map(|mut piece| {
                        piece.id = Some(next_id.to_string());
                        *next_id += 1;
                        Ok(piece)
                    })
                    .collect(),
                Err(e) => vec![Err(e)],
            };
            futures_util::future::ready(Some(out))
        })
        .flat_map(stream::iter);

    Box::pin(split)
}

fn split_chunk(chunk: ChatChunk) -> Vec<ChatChunk> {
    let needs_split = chunk
        .choices
        .iter()
        .any(|c| c.delta.content.as_ref().is_some_and(|text| text.chars().nth(1).is_some()));

    if !needs_split {
        return vec![chunk];
    }

    let ChatChunk {
        object,
        created,
        model,
        choices,
        ..
    } = chunk;

    let mut pieces = Vec::new();
    for choice in choices {
        let contents: Vec<Option<String>> = match &choice.delta.content {
            Some(text) if text.chars().nth(1).is_some() => text.chars().map(|c| Some(c.to_string())).collect(),
            other => vec![other.clone()],
        };

        for content in contents {
            pieces.push(ChatChunk {
                id: None,
                object: object.clone(),
                created,
                model: model.clone(),
                choices: vec![ChunkChoice {
                    index: choice.index,
                    delta: ChunkDelta {
                        role: choice.delta.role,
                        content,
                    },
                    finish_reason: choice.finish_reason.clone(),
                }],
            });
        }
    }

    pieces
}

/// Yield each item only once both it and an `interval` timer are ready
pub fn paced(inner: ChunkStream, interval: Duration) -> ChunkStream {
    Box::pin(stream::unfold(inner, move |mut inner| async move {
        let (item, ()) = tokio::join!(inner.next(), tokio::time::sleep(interval));
        item.map(|item| (item, inner))
    }))
}
