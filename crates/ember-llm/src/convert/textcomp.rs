//! Conversion between canonical types and the text completion wire format

use super::wire_index;
use crate::protocol::textcomp::{TextCompRequest, TextCompResponse};
use crate::types::{ChatChunk, ChatRequest, ChatResponse, Choice, ChunkChoice};

/// Build the upstream request around an already rendered prompt
pub fn to_textcomp_request(
    request: &ChatRequest,
    upstream_model: &str,
    prompt: String,
    extra_stop_strings: &[String],
) -> TextCompRequest {
    let mut stop = request.stop_sequences();
    stop.extend(extra_stop_strings.iter().cloned());

    let sampling = &request.sampling;

    TextCompRequest {
        model: upstream_model.to_owned(),
        prompt,
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
    }
}

impl From<TextCompResponse> for ChatResponse {
    fn from(response: TextCompResponse) -> Self {
        let choices = response
            .choices
            .into_iter()
            .enumerate()
            .map(|(position, choice)| {
                let index = choice.index.unwrap_or_else(|| wire_index(position));
                let mut converted = Choice::assistant(index, choice.text.unwrap_or_default());
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

/// Convert one streamed completion event; every choice maps onto choice 0
///
/// Returns `None` for events without choices.
pub fn textcomp_event_to_chunk(event: TextCompResponse) -> Option<ChatChunk> {
    if event.choices.is_empty() {
        return None;
    }

    let choices = event
        .choices
        .into_iter()
        .map(|choice| {
            let mut converted = ChunkChoice::assistant(0, choice.text.unwrap_or_default());
            converted.finish_reason = choice.finish_reason;
            converted
        })
        .collect();

    Some(ChatChunk {
        id: event.id,
        created: event.created,
        model: event.model,
        ..ChatChunk::new(choices)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, Role, StopSequences};

    #[test]
    fn stop_strings_merge_caller_first() {
        let mut request = ChatRequest::new("tc/llama", vec![Message::text(Role::User, "hi")]);
        request.stop = Some(StopSequences::Many(vec!["A".to_owned()]));
        request.max_completion_tokens = Some(32);

        let wire = to_textcomp_request(&request, "llama", "PROMPT".to_owned(), &["</s>".to_owned()]);

        assert_eq!(wire.stop, vec!["A".to_owned(), "</s>".to_owned()]);
        assert_eq!(wire.prompt, "PROMPT");
        assert_eq!(wire.max_tokens, Some(32));
    }

    #[test]
    fn stream_events_map_onto_first_choice() {
        let event: TextCompResponse =
            serde_json::from_str(r#"{"choices":[{"text":"Hel","index":3}]}"#).unwrap();
        let chunk = textcomp_event_to_chunk(event).unwrap();
        assert_eq!(chunk.choices[0].index, 0);
        assert_eq!(chunk.choices[0].delta.role, Some(Role::Assistant));
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hel"));

        assert!(textcomp_event_to_chunk(TextCompResponse::default()).is_none());
    }

    #[test]
    fn response_text_becomes_assistant_message() {
        let response: TextCompResponse =
            serde_json::from_str(r#"{"choices":[{"text":"done","finish_reason":"stop"}]}"#).unwrap();
        let converted = ChatResponse::from(response);
        assert_eq!(converted.choices[0].message.content, "done");
        assert_eq!(converted.choices[0].finish_reason.as_deref(), Some("stop"));
    }
}
