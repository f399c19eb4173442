use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// A named key provider entry under `[llm.key_providers]`
#[derive(Debug, Deserialize)]
pub struct NamedKeyProviderConfig {
    /// The provider definition itself
    #[serde(flatten)]
    pub definition: KeyProviderDefinition,
    /// Regex patterns; every registered model whose name matches one of
    /// them also draws credentials from this provider
    #[serde(default)]
    pub model_targets: Vec<String>,
}

/// Source of an upstream credential
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum KeyProviderDefinition {
    /// Secret written directly in the configuration
    Literal {
        /// The secret itself
        key: SecretString,
    },
    /// Secret read from the process environment at startup
    Environment {
        /// Variable holding the secret
        env_var: String,
    },
    /// Round-robin over the members, one step per borrow
    Union {
        /// Nested providers
        members: Vec<KeyProviderRef>,
    },
    /// Each member is leased to one request at a time
    Pool {
        /// Nested providers
        members: Vec<KeyProviderRef>,
        /// Give up waiting for a free member after this long
        #[serde(default, deserialize_with = "crate::duration::deserialize_option")]
        timeout: Option<Duration>,
    },
}

/// Either the name of a provider in `[llm.key_providers]` or an inline definition
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum KeyProviderRef {
    /// Reference to a named provider
    Named(String),
    /// Anonymous provider defined in place
    Inline(Box<KeyProviderDefinition>),
}
