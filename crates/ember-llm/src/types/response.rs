use serde::{Deserialize, Serialize};

use super::message::Role;

/// Canonical non-streaming chat completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Always `chat.completion`
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub choices: Vec<Choice>,
}

impl ChatResponse {
    /// Response with the given choices and no metadata
    pub fn new(choices: Vec<Choice>) -> Self {
        Self {
            id: None,
            object: "chat.completion".to_owned(),
            created: None,
            model: None,
            choices,
        }
    }
}

/// A single completion choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChoiceMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl Choice {
    /// Assistant reply at `index`
    pub fn assistant(index: u32, content: impl Into<String>) -> Self {
        Self {
            index,
            message: ChoiceMessage {
                role: Role::Assistant,
                content: content.into(),
            },
            finish_reason: None,
        }
    }
}

/// Message body of a completion choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    pub role: Role,
    pub content: String,
}
