use std::path::Path;

use crate::{Config, ModelProviderConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let config = Self::from_toml_str(&raw)?;
        tracing::debug!(
            path = %path.display(),
            models = config.llm.models.len(),
            key_providers = config.llm.key_providers.len(),
            "configuration loaded"
        );

        Ok(config)
    }

    /// Parse configuration from TOML text, expanding placeholders first
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the parts of the configuration that do not need the model graph
    ///
    /// Reference resolution, weights and templates are checked when the
    /// registry is built.
    ///
    /// # Errors
    ///
    /// Returns an error if no model is configured, a `model_targets`
    /// pattern is not a valid regex, or a random model is ambiguous
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.models.is_empty() {
            anyhow::bail!("at least one model provider must be configured under [llm.models]");
        }

        for (name, provider) in &self.llm.key_providers {
            for pattern in &provider.model_targets {
                regex::Regex::new(pattern)
                    .map_err(|e| anyhow::anyhow!("invalid model_targets pattern for key provider '{name}': {e}"))?;
            }
        }

        for (name, model) in &self.llm.models {
            if let ModelProviderConfig::Random(random) = model
                && random.weights.is_some() == random.list.is_some()
            {
                anyhow::bail!("random model '{name}' needs exactly one of `weights` or `list`");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        Config, KeyProviderDefinition, KeyProviderRef, LogFormat, ModelProviderConfig, ProcessorDefinition,
        ProcessorRef, SamplerOverride,
    };

    const SAMPLE: &str = r#"
[server]
listen_address = "127.0.0.1:3001"

[telemetry]
log_format = "json"

[llm.streaming]
interval = "50ms"
split_chunks = true

[llm.key_providers.main]
type = "literal"
key = "sk-one"
model_targets = ["^local/"]

[llm.key_providers.rotation]
type = "union"
members = ["main", { type = "literal", key = "sk-two" }]

[llm.processors.cleanup]
type = "chain"
processors = ["nosys", { type = "whitespace" }]

[llm.processors.nosys]
type = "nosys"

[llm.processors.cold]
type = "overridesamplers"
temperature = 0.2
top_k = "unset"

[llm.models.echo]
type = "trivial"
output = "hi"
delay = "10ms"

[llm.models.local]
type = "genericoai"
url = "http://localhost:5000"
key_provider = "rotation"
mistral_prefix = true

[llm.models.local.models.small]
name = "qwen-small"
processor = ["cleanup", "cold"]

[llm.models.mix]
type = "random"
weights = { "echo" = 1.0, "local/small" = 3.0 }
"#;

    #[test]
    fn parses_full_sample() {
        let config = Config::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(config.llm.streaming.interval, Some(Duration::from_millis(50)));
        assert!(config.llm.streaming.split_chunks);
        assert_eq!(config.llm.key_providers["main"].model_targets, vec!["^local/".to_owned()]);
        assert_eq!(config.llm.models.len(), 3);

        let KeyProviderDefinition::Union { members } = &config.llm.key_providers["rotation"].definition else {
            panic!("expected union");
        };
        assert!(matches!(&members[0], KeyProviderRef::Named(name) if name == "main"));
        assert!(matches!(&members[1], KeyProviderRef::Inline(_)));

        let ProcessorRef::Inline(cold) = &config.llm.processors["cold"] else {
            panic!("expected inline processor");
        };
        let ProcessorDefinition::OverrideSamplers(samplers) = cold.as_ref() else {
            panic!("expected overridesamplers");
        };
        assert_eq!(samplers.temperature, Some(SamplerOverride::Value(0.2)));
        assert!(matches!(samplers.top_k, Some(SamplerOverride::Unset(_))));
        assert!(samplers.top_p.is_none());

        let ModelProviderConfig::GenericOai(local) = &config.llm.models["local"] else {
            panic!("expected genericoai");
        };
        assert!(local.mistral_prefix);
        let small = &local.models["small"];
        assert_eq!(small.name.as_deref(), Some("qwen-small"));
        assert!(matches!(&small.processor, Some(ProcessorRef::Chain(chain)) if chain.len() == 2));
    }

    #[test]
    fn rejects_empty_model_list() {
        let err = Config::from_toml_str("[server]\n").unwrap_err();
        assert!(err.to_string().contains("at least one model provider"));
    }

    #[test]
    fn rejects_random_model_with_both_forms() {
        let raw = r#"
[llm.models.mix]
type = "random"
weights = { "a" = 1.0 }
list = ["a"]
"#;
        let err = Config::from_toml_str(raw).unwrap_err();
        assert!(err.to_string().contains("exactly one of"));
    }

    #[test]
    fn rejects_invalid_model_target_pattern() {
        let raw = r#"
[llm.key_providers.bad]
type = "literal"
key = "k"
model_targets = ["("]

[llm.models.echo]
type = "trivial"
"#;
        let err = Config::from_toml_str(raw).unwrap_err();
        assert!(err.to_string().contains("model_targets"));
    }

    #[test]
    fn rejects_unknown_processor_type() {
        let raw = r#"
[llm.processors.odd]
type = "reverse"

[llm.models.echo]
type = "trivial"
"#;
        assert!(Config::from_toml_str(raw).is_err());
    }

    #[test]
    fn expands_environment_before_parsing() {
        temp_env::with_var("EMBER_LOADER_KEY", Some("sk-env"), || {
            let raw = r#"
[llm.key_providers.main]
type = "literal"
key = "{{ env.EMBER_LOADER_KEY }}"

[llm.models.echo]
type = "trivial"
"#;
            let config = Config::from_toml_str(raw).unwrap();
            let KeyProviderDefinition::Literal { key } = &config.llm.key_providers["main"].definition else {
                panic!("expected literal");
            };
            assert_eq!(secrecy::ExposeSecret::expose_secret(key), "sk-env");
        });
    }
}
