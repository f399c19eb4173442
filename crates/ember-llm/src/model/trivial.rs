use std::time::Duration;

use futures_util::{StreamExt, stream};

use crate::stream::ChunkStream;
use crate::types::{ChatChunk, ChatResponse, Choice};

/// Pause between streamed characters unless configured otherwise
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

const MODEL_NAME: &str = "trivial";

/// Canned-output model, useful for wiring tests
#[derive(Debug)]
pub struct TrivialModel {
    output: String,
    delay: Duration,
}

impl TrivialModel {
    pub fn new(output: String, delay: Option<Duration>) -> Self {
        Self {
            output,
            delay: delay.unwrap_or(DEFAULT_DELAY),
        }
    }

    pub(crate) fn complete(&self) -> ChatResponse {
        ChatResponse {
            model: Some(MODEL_NAME.to_owned()),
            ..ChatResponse::new(vec![Choice::assistant(0, self.output.clone())])
        }
    }

    /// One chunk per character, `delay` apart
    pub(crate) fn stream(&self) -> ChunkStream {
        let delay = self.delay;
        let characters: Vec<String> = self.output.chars().map(String::from).collect();

        Box::pin(
            stream::iter(characters.into_iter().enumerate()).then(move |(position, character)| async move {
                if position > 0 {
                    tokio::time::sleep(delay).await;
                }

                Ok(ChatChunk {
                    model: Some(MODEL_NAME.to_owned()),
                    ..ChatChunk::assistant_text(character)
                })
            }),
        )
    }
}
