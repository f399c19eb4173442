//! Configuration builder for integration tests
//!
//! Accumulates TOML fragments and runs them through the real loader, so
//! every test also exercises parsing and validation.

use ember_config::Config;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    sections: Vec<String>,
}

impl ConfigBuilder {
    /// Create a new builder with no models
    pub fn new() -> Self {
        Self { sections: Vec::new() }
    }

    /// Add an OpenAI-compatible provider with a literal key
    pub fn with_openai_provider(self, name: &str, url: &str, models: &[&str]) -> Self {
        let mut section = format!(
            "[llm.models.{name}]\ntype = \"genericoai\"\nurl = \"{url}\"\nkey_provider = {{ type = \"literal\", key = \"sk-{name}\" }}\n"
        );
        for model in models {
            section.push_str(&format!("[llm.models.{name}.models.\"{model}\"]\n"));
        }
        self.with_toml(&section)
    }

    /// Add a Gemini provider with a literal key
    pub fn with_gemini_provider(self, name: &str, url: &str, models: &[&str]) -> Self {
        let mut section = format!(
            "[llm.models.{name}]\ntype = \"gemini\"\nurl = \"{url}\"\nkey_provider = {{ type = \"literal\", key = \"g-{name}\" }}\n"
        );
        for model in models {
            section.push_str(&format!("[llm.models.{name}.models.\"{model}\"]\n"));
        }
        self.with_toml(&section)
    }

    /// Add a trivial model answering with `output`
    pub fn with_trivial(self, name: &str, output: &str) -> Self {
        self.with_toml(&format!(
            "[llm.models.{name}]\ntype = \"trivial\"\noutput = \"{output}\"\ndelay = \"1ms\"\n"
        ))
    }

    /// Append a raw TOML fragment
    pub fn with_toml(mut self, fragment: &str) -> Self {
        self.sections.push(fragment.to_owned());
        self
    }

    /// Disable health endpoint
    pub fn without_health(self) -> Self {
        self.with_toml("[server.health]\nenabled = false\n")
    }

    /// Parse and validate the final config
    pub fn build(self) -> Config {
        Config::from_toml_str(&self.sections.join("\n")).expect("test configuration is valid")
    }
}
