use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use url::Url;

use crate::keys::{KeyProviderRef, NamedKeyProviderConfig};
use crate::processors::ProcessorRef;

/// Top-level LLM configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Named credential sources
    #[serde(default)]
    pub key_providers: IndexMap<String, NamedKeyProviderConfig>,
    /// Named request processors
    #[serde(default)]
    pub processors: IndexMap<String, ProcessorRef>,
    /// Model providers keyed by name
    #[serde(default)]
    pub models: IndexMap<String, ModelProviderConfig>,
    /// Post-processing applied to every streamed reply
    #[serde(default)]
    pub streaming: StreamingConfig,
}

/// Stream post-processing shared by all models
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamingConfig {
    /// Minimum delay between two chunks sent to the client
    #[serde(default, deserialize_with = "crate::duration::deserialize_option")]
    pub interval: Option<Duration>,
    /// Re-split every chunk into single-character chunks
    #[serde(default)]
    pub split_chunks: bool,
}

/// A model provider entry; most kinds expand into one model per `models` key
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelProviderConfig {
    /// Canned output, no upstream
    Trivial(TrivialModelConfig),
    /// OpenAI-style `/chat/completions` backend
    GenericOai(GenericOaiModelConfig),
    /// Google Gemini `generateContent` backend
    Gemini(GeminiModelConfig),
    /// Text-completion backend fed through a prompt template
    TextComp(TextCompModelConfig),
    /// Weighted random choice among other registered models
    Random(RandomModelConfig),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrivialModelConfig {
    /// Text returned for every request
    #[serde(default = "default_trivial_output")]
    pub output: String,
    /// Pause after each streamed character
    #[serde(default, deserialize_with = "crate::duration::deserialize_option")]
    pub delay: Option<Duration>,
}

/// One upstream model exposed by a provider
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamModelConfig {
    /// Model id sent upstream; defaults to the entry's key
    #[serde(default)]
    pub name: Option<String>,
    /// Processor applied before each request to this model
    #[serde(default)]
    pub processor: Option<ProcessorRef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenericOaiModelConfig {
    /// Base URL; `/v1` is appended when missing
    pub url: Url,
    #[serde(default)]
    pub key_provider: Option<KeyProviderRef>,
    #[serde(default)]
    pub models: IndexMap<String, UpstreamModelConfig>,
    /// Mark a trailing assistant message with `prefix: true`
    #[serde(default)]
    pub mistral_prefix: bool,
    /// Mark a trailing assistant message with `partial: true`
    #[serde(default)]
    pub moonshot_partial: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiModelConfig {
    /// Base URL; `/v1beta` is appended when missing
    #[serde(default = "default_gemini_url")]
    pub url: Url,
    #[serde(default)]
    pub key_provider: Option<KeyProviderRef>,
    #[serde(default)]
    pub models: IndexMap<String, UpstreamModelConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextCompModelConfig {
    /// Base URL; `/v1` is appended when missing
    pub url: Url,
    #[serde(default)]
    pub key_provider: Option<KeyProviderRef>,
    #[serde(default)]
    pub models: IndexMap<String, UpstreamModelConfig>,
    /// Jinja-style template rendering the request into a prompt
    pub template: String,
    /// Stop strings added to every request
    #[serde(default)]
    pub extra_stop_strings: Vec<String>,
    /// Collapse whitespace in the rendered prompt
    #[serde(default)]
    pub clean_whitespace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomModelConfig {
    /// Target model names with explicit weights
    #[serde(default)]
    pub weights: Option<IndexMap<String, f64>>,
    /// Target model names with equal weight
    #[serde(default)]
    pub list: Option<Vec<String>>,
}

fn default_trivial_output() -> String {
    "Yahallo! Some extra padding to make this longer lol.".to_string()
}

#[allow(clippy::missing_panics_doc)]
fn default_gemini_url() -> Url {
    Url::parse("https://generativelanguage.googleapis.com/v1beta").expect("valid default URL")
}
