use serde::{Deserialize, Serialize};

use super::message::Role;

/// One chunk of a streamed chat completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Always `chat.completion.chunk`
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub choices: Vec<ChunkChoice>,
}

impl ChatChunk {
    /// Chunk with the given choices and no metadata
    pub fn new(choices: Vec<ChunkChoice>) -> Self {
        Self {
            id: None,
            object: "chat.completion.chunk".to_owned(),
            created: None,
            model: None,
            choices,
        }
    }

    /// Single-choice chunk carrying assistant text
    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self::new(vec![ChunkChoice::assistant(0, content)])
    }
}

/// Incremental choice within a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl ChunkChoice {
    /// Assistant delta at `index`
    pub fn assistant(index: u32, content: impl Into<String>) -> Self {
        Self {
            index,
            delta: ChunkDelta {
                role: Some(Role::Assistant),
                content: Some(content.into()),
            },
            finish_reason: None,
        }
    }
}

/// Incremental content for one choice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
