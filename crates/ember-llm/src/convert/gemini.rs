//! Conversion between canonical types and the Gemini wire format

use super::wire_index;
use crate::protocol::gemini::{
    GeminiCandidate, GeminiContent, GeminiGenerationConfig, GeminiPart, GeminiRequest, GeminiResponse,
    GeminiSafetySetting,
};
use crate::types::{ChatChunk, ChatRequest, ChatResponse, Choice, ChunkChoice, Role};

/// Safety categories that are switched off on every request
const SAFETY_CATEGORIES: [&str; 5] = [
    "HARM_CATEGORY_CIVIC_INTEGRITY",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HATE_SPEECH",
];

// -- Outbound: canonical request -> Gemini wire request --

impl From<&ChatRequest> for GeminiRequest {
    fn from(request: &ChatRequest) -> Self {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();
        let mut instructions_done = false;

        for message in &request.messages {
            let parts: Vec<GeminiPart> = message.content.texts().into_iter().map(GeminiPart::text).collect();

            if instructions_done || message.role.is_conversational() {
                instructions_done = true;
                let role = if message.role == Role::Assistant { "model" } else { "user" };
                contents.push(GeminiContent {
                    role: Some(role.to_owned()),
                    parts,
                });
            } else {
                system_parts.extend(parts);
            }
        }

        let system_instruction = (!system_parts.is_empty()).then(|| GeminiContent {
            role: None,
            parts: system_parts,
        });

        let sampling = &request.sampling;
        let generation_config = GeminiGenerationConfig {
            stop_sequences: request.stop.as_ref().map(crate::types::StopSequences::to_vec),
            max_output_tokens: request.max_completion_tokens.or(request.max_tokens),
            temperature: sampling.temperature,
            top_k: sampling.top_k,
            top_p: sampling.top_p,
            presence_penalty: sampling.presence_penalty,
            frequency_penalty: sampling.frequency_penalty,
        };

        let safety_settings = SAFETY_CATEGORIES
            .iter()
            .map(|category| GeminiSafetySetting {
                category: (*category).to_owned(),
                threshold: "OFF".to_owned(),
            })
            .collect();

        Self {
            contents,
            system_instruction,
            generation_config: Some(generation_config),
            safety_settings,
        }
    }
}

/// Concatenate a candidate's text parts
fn candidate_text(candidate: &GeminiCandidate, separator: &str) -> String {
    candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join(separator)
        })
        .unwrap_or_default()
}

// -- Inbound: Gemini wire response -> canonical response --

impl From<GeminiResponse> for ChatResponse {
    fn from(response: GeminiResponse) -> Self {
        let choices = response
            .candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                let mut choice = Choice::assistant(wire_index(index), candidate_text(candidate, "\n\n"));
                choice.finish_reason.clone_from(&candidate.finish_reason);
                choice
            })
            .collect();

        Self {
            id: response.response_id,
            model: response.model_version,
            ..Self::new(choices)
        }
    }
}

/// Convert one streamed Gemini event into a canonical chunk
pub fn gemini_event_to_chunk(event: GeminiResponse) -> ChatChunk {
    let choices = event
        .candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| ChunkChoice::assistant(wire_index(index), candidate_text(candidate, "")))
        .collect();

    ChatChunk {
        id: event.response_id,
        model: event.model_version,
        ..ChatChunk::new(choices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, StopSequences};

    #[test]
    fn leading_instructions_become_system_instruction() {
        let mut request = ChatRequest::new(
            "gemini/flash",
            vec![
                Message::text(Role::System, "be brief"),
                Message::text(Role::Developer, "use metric units"),
                Message::text(Role::User, "how far?"),
                Message::text(Role::Assistant, "5 km"),
                Message::text(Role::System, "late note"),
            ],
        );
        request.max_tokens = Some(100);
        request.stop = Some(StopSequences::One("\n".to_owned()));
        request.sampling.top_k = Some(5);

        let wire = GeminiRequest::from(&request);

        let system = wire.system_instruction.unwrap();
        assert!(system.role.is_none());
        assert_eq!(system.parts.len(), 2);

        let roles: Vec<_> = wire.contents.iter().map(|c| c.role.clone().unwrap()).collect();
        assert_eq!(roles, vec!["user", "model", "user"]);

        let config = wire.generation_config.unwrap();
        assert_eq!(config.max_output_tokens, Some(100));
        assert_eq!(config.stop_sequences, Some(vec!["\n".to_owned()]));
        assert_eq!(config.top_k, Some(5));

        assert_eq!(wire.safety_settings.len(), 5);
        assert!(wire.safety_settings.iter().all(|s| s.threshold == "OFF"));
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let request = ChatRequest::new("g", vec![Message::text(Role::System, "s"), Message::text(Role::User, "u")]);
        let value = serde_json::to_value(GeminiRequest::from(&request)).unwrap();

        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "s");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "u");
        assert_eq!(value["safetySettings"][0]["category"], "HARM_CATEGORY_CIVIC_INTEGRITY");
        assert!(value["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn without_instructions_there_is_no_system_instruction() {
        let request = ChatRequest::new("g", vec![Message::text(Role::User, "u")]);
        assert!(GeminiRequest::from(&request).system_instruction.is_none());
    }

    #[test]
    fn response_parts_join_with_blank_line_but_stream_parts_do_not() {
        let raw = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "a"}, {"text": "b"}]}, "finishReason": "STOP"}],
            "modelVersion": "gemini-2.0",
            "responseId": "r1",
            "usageMetadata": {"totalTokenCount": 4}
        }"#;

        let response = ChatResponse::from(serde_json::from_str::<GeminiResponse>(raw).unwrap());
        assert_eq!(response.choices[0].message.content, "a\n\nb");
        assert_eq!(response.choices[0].finish_reason.as_deref(), Some("STOP"));

        let chunk = gemini_event_to_chunk(serde_json::from_str(raw).unwrap());
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("ab"));
        assert_eq!(chunk.model.as_deref(), Some("gemini-2.0"));
    }
}
