//! Conversion between canonical types and the `OpenAI` wire format

use super::wire_index;
use crate::protocol::openai::{
    OpenAiContent, OpenAiContentPart, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk,
};
use crate::types::{
    ChatChunk, ChatRequest, ChatResponse, Choice, ChunkChoice, ChunkDelta, Content, ContentPart, Message, Role,
};

/// Backend quirks for continuing a trailing assistant message
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuationFlags {
    /// Mistral-style `prefix: true`
    pub mistral_prefix: bool,
    /// Moonshot-style `partial: true`
    pub moonshot_partial: bool,
}

// -- Outbound: canonical request -> OpenAI wire request --

/// Build the upstream request for `upstream_model`
pub fn to_openai_request(request: &ChatRequest, upstream_model: &str, flags: ContinuationFlags) -> OpenAiRequest {
    let mut messages: Vec<OpenAiMessage> = request.messages.iter().map(OpenAiMessage::from).collect();

    if let Some(last) = messages.last_mut()
        && last.role == Role::Assistant.as_ref()
    {
        if flags.mistral_prefix {
            last.prefix = Some(true);
        }
        if flags.moonshot_partial {
            last.partial = Some(true);
        }
    }

    let sampling = &request.sampling;
    let stop = request.stop.as_ref().map(crate::types::StopSequences::to_vec);

    OpenAiRequest {
        model: upstream_model.to_owned(),
        messages,
        stream: request.stream,
        max_tokens: request.max_tokens.or(request.max_completion_tokens),
        max_completion_tokens: request.max_completion_tokens.or(request.max_tokens),
        seed: request.seed,
        stop,
        temperature: sampling.temperature,
        top_p: sampling.top_p,
        top_k: sampling.top_k,
        top_a: sampling.top_a,
        min_p: sampling.min_p,
        frequency_penalty: sampling.frequency_penalty,
        presence_penalty: sampling.presence_penalty,
        repetition_penalty: sampling.repetition_penalty,
        logit_bias: request.logit_bias.clone(),
        logprobs: request.logprobs,
        top_logprobs: request.top_logprobs,
    }
}

impl From<&Message> for OpenAiMessage {
    fn from(message: &Message) -> Self {
        let content = match &message.content {
            Content::Text(text) => OpenAiContent::Text(text.clone()),
            Content::Parts(parts) => OpenAiContent::Parts(
                parts
                    .iter()
                    .map(|ContentPart::Text { text }| OpenAiContentPart::Text { text: text.clone() })
                    .collect(),
            ),
        };

        Self {
            role: message.role.to_string(),
            content,
            name: message.name.clone(),
            prefix: None,
            partial: None,
        }
    }
}

// -- Inbound: OpenAI wire response -> canonical response --

impl From<OpenAiResponse> for ChatResponse {
    fn from(response: OpenAiResponse) -> Self {
        let choices = response
            .choices
            .into_iter()
            .enumerate()
            .map(|(position, choice)| {
                let message = choice.message.unwrap_or_default();
                let index = choice.index.unwrap_or_else(|| wire_index(position));
                let mut converted = Choice::assistant(index, message.content.unwrap_or_default());
                if let Some(role) = message.role.and_then(|r| r.parse::<Role>().ok()) {
                    converted.message.role = role;
                }
                converted.finish_reason = choice.finish_reason;
                converted
            })
            .collect();

        Self {
            id: response.id,
            created: response.created,
            model: response.model,
            ..Self::new(choices)
        }
    }
}

// -- Inbound: OpenAI stream chunk -> canonical chunk --

impl From<OpenAiStreamChunk> for ChatChunk {
    fn from(chunk: OpenAiStreamChunk) -> Self {
        let choices = chunk
            .choices
            .into_iter()
            .map(|choice| {
                let delta = choice.delta.unwrap_or_default();
                ChunkChoice {
                    index: choice.index,
                    delta: ChunkDelta {
                        role: delta.role.and_then(|r| r.parse().ok()),
                        content: delta.content,
                    },
                    finish_reason: choice.finish_reason,
                }
            })
            .collect();

        Self {
            id: chunk.id,
            created: chunk.created,
            model: chunk.model,
            ..Self::new(choices)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StopSequences;

    fn request() -> ChatRequest {
        let mut request = ChatRequest::new(
            "local/small",
            vec![
                Message::text(Role::System, "rules"),
                Message::text(Role::User, "hi"),
                Message::text(Role::Assistant, "Once upon"),
            ],
        );
        request.max_tokens = Some(64);
        request.stop = Some(StopSequences::One("END".to_owned()));
        request.sampling.top_k = Some(10);
        request
    }

    #[test]
    fn token_limits_fall_back_to_each_other() {
        let wire = to_openai_request(&request(), "qwen", ContinuationFlags::default());
        assert_eq!(wire.model, "qwen");
        assert_eq!(wire.max_tokens, Some(64));
        assert_eq!(wire.max_completion_tokens, Some(64));
        assert_eq!(wire.stop, Some(vec!["END".to_owned()]));
        assert_eq!(wire.top_k, Some(10));
        assert!(!wire.stream);
    }

    #[test]
    fn trailing_assistant_message_is_marked_for_continuation() {
        let flags = ContinuationFlags {
            mistral_prefix: true,
            moonshot_partial: true,
        };
        let wire = to_openai_request(&request(), "m", flags);
        let value = serde_json::to_value(&wire).unwrap();

        assert_eq!(value["messages"][2]["prefix"], true);
        assert_eq!(value["messages"][2]["partial"], true);
        assert!(value["messages"][1].get("prefix").is_none());
    }

    #[test]
    fn no_marking_when_last_message_is_from_user() {
        let mut req = request();
        req.messages.pop();
        let flags = ContinuationFlags {
            mistral_prefix: true,
            moonshot_partial: false,
        };
        let wire = to_openai_request(&req, "m", flags);
        assert!(wire.messages.iter().all(|m| m.prefix.is_none()));
    }

    #[test]
    fn lenient_response_conversion() {
        let wire: OpenAiResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hello"}},{}],"usage":{"total_tokens":3}}"#)
                .unwrap();
        let response = ChatResponse::from(wire);

        assert_eq!(response.object, "chat.completion");
        assert_eq!(response.choices.len(), 2);
        assert_eq!(response.choices[0].message.content, "hello");
        assert_eq!(response.choices[0].message.role, Role::Assistant);
        assert_eq!(response.choices[1].index, 1);
    }

    #[test]
    fn stream_chunk_conversion() {
        let wire: OpenAiStreamChunk = serde_json::from_str(
            r#"{"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"role":"assistant","content":"Hel"}}]}"#,
        )
        .unwrap();
        let chunk = ChatChunk::from(wire);

        assert_eq!(chunk.id.as_deref(), Some("c1"));
        assert_eq!(chunk.choices[0].delta.role, Some(Role::Assistant));
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hel"));
    }
}
