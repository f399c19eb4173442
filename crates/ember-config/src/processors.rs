use serde::Deserialize;

/// Either a named processor, a bare list (shorthand for a chain) or an inline definition
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProcessorRef {
    /// Reference to an entry in `[llm.processors]`
    Named(String),
    /// Apply each processor in order
    Chain(Vec<ProcessorRef>),
    /// Anonymous processor defined in place
    Inline(Box<ProcessorDefinition>),
}

/// Request transformer definition
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum ProcessorDefinition {
    /// Leave the request untouched
    Identity,
    /// Demote system/developer messages that follow the conversation start
    NoDanglingSys,
    /// Demote every system/developer message to `user`
    NoSys,
    /// Force or remove sampling parameters
    OverrideSamplers(OverrideSamplersConfig),
    /// Rewrite message text with a regular expression
    Regex(RegexConfig),
    /// Rewrite roles from the first assistant message onward
    Noass {
        /// Role given to every message from the first assistant turn
        role: String,
    },
    /// Merge runs of same-role messages
    Squash(SquashConfig),
    /// Insert a fixed message
    InsertMessage(InsertMessageConfig),
    /// Apply nested processors in order
    Chain {
        /// Nested processors
        processors: Vec<ProcessorRef>,
    },
    /// Apply one nested processor drawn at random
    Random(RandomProcessorConfig),
    /// Trim and collapse whitespace
    Whitespace,
}

/// Value for one sampler in an `overridesamplers` processor
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SamplerOverride<T> {
    /// The literal string `"unset"`: drop the field
    Unset(UnsetMarker),
    /// Force the field to this value
    Value(T),
}

/// The `"unset"` keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UnsetMarker {
    #[serde(rename = "unset")]
    Unset,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideSamplersConfig {
    #[serde(default)]
    pub temperature: Option<SamplerOverride<f64>>,
    #[serde(default)]
    pub top_p: Option<SamplerOverride<f64>>,
    #[serde(default)]
    pub top_k: Option<SamplerOverride<u32>>,
    #[serde(default)]
    pub top_a: Option<SamplerOverride<f64>>,
    #[serde(default)]
    pub min_p: Option<SamplerOverride<f64>>,
    #[serde(default)]
    pub frequency_penalty: Option<SamplerOverride<f64>>,
    #[serde(default)]
    pub presence_penalty: Option<SamplerOverride<f64>>,
    #[serde(default)]
    pub repetition_penalty: Option<SamplerOverride<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexConfig {
    pub pattern: String,
    /// Single-letter flags: `i`, `m`, `s`, `x`, `u`, `g`
    #[serde(default)]
    pub flags: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SquashConfig {
    /// Roles whose consecutive runs get merged
    pub roles: Vec<String>,
    /// Text placed between merged messages
    #[serde(default = "default_squash_separator")]
    pub separator: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InsertMessageConfig {
    pub role: String,
    pub content: String,
    /// Index to insert at; negative values count from the end, `-1` appends
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomProcessorConfig {
    /// Candidates with explicit weights
    #[serde(default)]
    pub weights: Option<Vec<WeightedProcessorConfig>>,
    /// Candidates with equal weight
    #[serde(default)]
    pub list: Option<Vec<ProcessorRef>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightedProcessorConfig {
    pub weight: f64,
    pub processor: ProcessorRef,
}

fn default_squash_separator() -> String {
    "\n\n".to_string()
}
