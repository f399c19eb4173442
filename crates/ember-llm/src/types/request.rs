use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::message::Message;

/// Sampling knobs that processors may force or remove
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_a: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
}

/// Stop sequences, accepted as a single string or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    One(String),
    Many(Vec<String>),
}

impl StopSequences {
    /// All stop sequences as a list
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(stop) => vec![stop.clone()],
            Self::Many(stops) => stops.clone(),
        }
    }
}

/// Canonical chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Registered model name
    pub model: String,
    /// Conversation messages, in order
    pub messages: Vec<Message>,
    /// Sampling parameters, flat on the wire
    #[serde(flatten)]
    pub sampling: SamplingParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Request with the given messages and nothing else set
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            sampling: SamplingParams::default(),
            max_tokens: None,
            max_completion_tokens: None,
            stop: None,
            seed: None,
            logit_bias: None,
            logprobs: None,
            top_logprobs: None,
            stream: false,
        }
    }

    /// Caller's stop sequences as a list, empty when none were given
    pub fn stop_sequences(&self) -> Vec<String> {
        self.stop.as_ref().map(StopSequences::to_vec).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn sampling_params_are_flat_on_the_wire() {
        let request: ChatRequest = serde_json::from_str(
            r#"{
                "model": "local/small",
                "messages": [{"role": "user", "content": "hi"}],
                "temperature": 0.7,
                "top_k": 40,
                "stop": "END",
                "stream": true
            }"#,
        )
        .unwrap();

        assert_eq!(request.sampling.temperature, Some(0.7));
        assert_eq!(request.sampling.top_k, Some(40));
        assert_eq!(request.stop_sequences(), vec!["END".to_owned()]);
        assert!(request.stream);
        assert_eq!(request.messages[0].role, Role::User);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["temperature"], 0.7);
        assert!(value.get("sampling").is_none());
        assert!(value.get("top_p").is_none());
    }

    #[test]
    fn stop_accepts_a_list() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"model":"m","messages":[],"stop":["a","b"]}"#).unwrap();
        assert_eq!(request.stop_sequences(), vec!["a".to_owned(), "b".to_owned()]);
        assert!(!request.stream);
    }
}
