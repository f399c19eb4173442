//! Model graph built once from configuration
//!
//! [`ModelRegistry::from_config`] resolves every named processor and key
//! provider, expands each provider entry into registered models and checks
//! that random models only point at registered, acyclic targets. The result
//! is immutable and shared by every request.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ember_config::{
    KeyProviderDefinition, KeyProviderRef, LlmConfig, ModelProviderConfig, NamedKeyProviderConfig, ProcessorDefinition,
    ProcessorRef, RandomModelConfig, RandomProcessorConfig, StreamingConfig, UpstreamModelConfig,
};
use ember_core::RequestContext;
use indexmap::IndexMap;
use regex::Regex;
use reqwest::Client;
use tracing::Instrument;

use crate::convert::openai::ContinuationFlags;
use crate::error::{ConfigError, LlmError};
use crate::keys::KeyProvider;
use crate::model::upstream::normalize_base_url;
use crate::model::{GeminiModel, Model, OpenAiModel, PromptTemplate, RandomModel, TextCompModel, TrivialModel, Upstream};
use crate::processor::{InsertMessage, Processor, RegexRewrite, Squash};
use crate::stream::{ChunkStream, cancellable, paced, split_chunks};
use crate::types::{ChatRequest, ChatResponse, Role};
use crate::weighted::{Weighted, WeightedOption};

#[derive(Debug)]
struct RegisteredModel {
    /// Provider entry the model was declared under
    owner: String,
    model: Model,
}

/// Every registered model, keyed by its public name
#[derive(Debug)]
pub struct ModelRegistry {
    models: IndexMap<String, RegisteredModel>,
    streaming: StreamingConfig,
}

impl ModelRegistry {
    /// Build the registry from the `[llm]` configuration section
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for unresolved names, reference cycles,
    /// duplicate model names, missing environment keys, invalid weights,
    /// regexes, roles or templates
    pub fn from_config(config: &LlmConfig) -> Result<Self, ConfigError> {
        let mut processors = ProcessorResolver::new(&config.processors);
        for name in config.processors.keys() {
            processors.named(name)?;
        }

        let mut keys = KeyResolver::new(&config.key_providers);
        for name in config.key_providers.keys() {
            keys.named(name)?;
        }
        let targeted = keys.targeted()?;

        let mut builder = Builder {
            client: Client::new(),
            processors,
            keys,
            targeted,
            models: IndexMap::new(),
        };

        for (provider, definition) in &config.models {
            builder.provider(provider, definition)?;
        }

        let registry = Self {
            models: builder.models,
            streaming: config.streaming.clone(),
        };
        registry.check_random_targets()?;

        for (name, entry) in &registry.models {
            if entry.model.upstream().is_some_and(|upstream| upstream.keys.is_empty()) {
                tracing::warn!(model = %name, "model has no credential source; requests to it will fail");
            }
        }

        tracing::info!(models = registry.models.len(), "model registry built");

        Ok(registry)
    }

    /// Look up a registered model by name
    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.get(name).map(|entry| &entry.model)
    }

    /// Registered model names with their owning provider, sorted by name
    pub fn model_names(&self) -> Vec<(&str, &str)> {
        let mut names: Vec<(&str, &str)> = self
            .models
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.owner.as_str()))
            .collect();
        names.sort_unstable_by(|a, b| a.0.cmp(b.0));
        names
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Complete `request` with the model it names
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ModelNotFound` for an unknown model, or whatever
    /// the adapter fails with
    pub async fn complete(&self, request: ChatRequest, ctx: &RequestContext) -> Result<ChatResponse, LlmError> {
        let model = self.lookup(&request.model)?;
        tracing::info!(parent: &ctx.span, model = %request.model, kind = model.kind(), "completion requested");

        model.complete(self, request, ctx).instrument(ctx.span.clone()).await
    }

    /// Stream `request` from the model it names
    ///
    /// The returned stream ends as soon as the request is cancelled and is
    /// split and paced according to the streaming configuration.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ModelNotFound` for an unknown model, or whatever
    /// the adapter fails with before the first chunk
    pub async fn stream(&self, request: ChatRequest, ctx: &RequestContext) -> Result<ChunkStream, LlmError> {
        let model = self.lookup(&request.model)?;
        tracing::info!(parent: &ctx.span, model = %request.model, kind = model.kind(), "stream requested");

        let mut chunks = model.stream(self, request, ctx).instrument(ctx.span.clone()).await?;

        if self.streaming.split_chunks {
            chunks = split_chunks(chunks);
        }

        if let Some(interval) = self.streaming.interval.filter(|interval| !interval.is_zero()) {
            chunks = paced(chunks, interval);
        }

        Ok(cancellable(chunks, ctx.cancellation.clone()))
    }

    fn lookup(&self, name: &str) -> Result<&Model, LlmError> {
        self.get(name).ok_or_else(|| LlmError::ModelNotFound { model: name.to_owned() })
    }

    fn check_random_targets(&self) -> Result<(), ConfigError> {
        for (name, entry) in &self.models {
            if let Model::Random(random) = &entry.model
                && let Some(missing) = random.targets().find(|target| !self.models.contains_key(target.as_str()))
            {
                tracing::error!(model = %name, target = %missing, "random model targets an unknown model");
                return Err(ConfigError::UnresolvedReference {
                    kind: "model",
                    name: missing.clone(),
                });
            }
        }

        let mut finished = HashSet::new();
        for name in self.models.keys() {
            self.visit_random(name, &mut Vec::new(), &mut finished)?;
        }

        Ok(())
    }

    fn visit_random<'s>(
        &'s self,
        name: &'s str,
        path: &mut Vec<&'s str>,
        finished: &mut HashSet<&'s str>,
    ) -> Result<(), ConfigError> {
        if finished.contains(name) {
            return Ok(());
        }

        if path.contains(&name) {
            return Err(ConfigError::Cycle {
                kind: "random model",
                name: name.to_owned(),
            });
        }

        if let Some(Model::Random(random)) = self.get(name) {
            path.push(name);
            for target in random.targets() {
                self.visit_random(target, path, finished)?;
            }
            path.pop();
        }

        finished.insert(name);
        Ok(())
    }
}

fn parse_role(role: &str) -> Result<Role, ConfigError> {
    role.parse().map_err(|_| ConfigError::InvalidRole(role.to_owned()))
}

/// Accumulates registered models while walking provider entries
struct Builder<'c> {
    client: Client,
    processors: ProcessorResolver<'c>,
    keys: KeyResolver<'c>,
    targeted: Vec<(Regex, Arc<KeyProvider>)>,
    models: IndexMap<String, RegisteredModel>,
}

impl Builder<'_> {
    fn provider(&mut self, provider: &str, definition: &ModelProviderConfig) -> Result<(), ConfigError> {
        match definition {
            ModelProviderConfig::Trivial(trivial) => {
                let model = TrivialModel::new(trivial.output.clone(), trivial.delay);
                self.register(provider.to_owned(), provider, Model::Trivial(model))
            }
            ModelProviderConfig::GenericOai(oai) => {
                let base_url = normalize_base_url(oai.url.as_str(), "v1");
                let flags = ContinuationFlags {
                    mistral_prefix: oai.mistral_prefix,
                    moonshot_partial: oai.moonshot_partial,
                };
                self.upstreams(provider, &base_url, oai.key_provider.as_ref(), &oai.models, |upstream| {
                    Model::GenericOai(OpenAiModel::new(upstream, flags))
                })
            }
            ModelProviderConfig::Gemini(gemini) => {
                let base_url = gemini_base_url(gemini.url.as_str());
                self.upstreams(provider, &base_url, gemini.key_provider.as_ref(), &gemini.models, |upstream| {
                    Model::Gemini(GeminiModel::new(upstream))
                })
            }
            ModelProviderConfig::TextComp(textcomp) => {
                let base_url = normalize_base_url(textcomp.url.as_str(), "v1");
                let template = Arc::new(PromptTemplate::compile(provider, textcomp.template.clone())?);
                let stops: Arc<[String]> = textcomp.extra_stop_strings.clone().into();
                let clean = textcomp.clean_whitespace;
                self.upstreams(provider, &base_url, textcomp.key_provider.as_ref(), &textcomp.models, |upstream| {
                    Model::TextComp(TextCompModel::new(upstream, Arc::clone(&template), Arc::clone(&stops), clean))
                })
            }
            ModelProviderConfig::Random(random) => {
                let targets = random_targets(random)?;
                let model = RandomModel::new(provider.to_owned(), targets);
                self.register(provider.to_owned(), provider, Model::Random(model))
            }
        }
    }

    fn upstreams<F>(
        &mut self,
        provider: &str,
        base_url: &str,
        key_provider: Option<&KeyProviderRef>,
        models: &IndexMap<String, UpstreamModelConfig>,
        make: F,
    ) -> Result<(), ConfigError>
    where
        F: Fn(Upstream) -> Model,
    {
        let provider_keys = key_provider.map(|reference| self.keys.reference(reference)).transpose()?;

        if models.is_empty() {
            tracing::warn!(provider = %provider, "provider declares no models");
        }

        for (key, entry) in models {
            let name = format!("{provider}/{key}");
            let processor = entry
                .processor
                .as_ref()
                .map(|reference| self.processors.reference(reference))
                .transpose()?;

            let upstream = Upstream {
                client: self.client.clone(),
                base_url: base_url.to_owned(),
                model: entry.name.clone().unwrap_or_else(|| key.clone()),
                keys: self.credentials_for(&name, provider_keys.as_ref()),
                processor,
            };

            self.register(name, provider, make(upstream))?;
        }

        Ok(())
    }

    /// The provider's own keys plus every named provider whose
    /// `model_targets` match `name`
    fn credentials_for(&self, name: &str, provider_keys: Option<&Arc<KeyProvider>>) -> Arc<KeyProvider> {
        let mut members: Vec<Arc<KeyProvider>> = provider_keys.into_iter().cloned().collect();
        members.extend(
            self.targeted
                .iter()
                .filter(|(pattern, _)| pattern.is_match(name))
                .map(|(_, provider)| Arc::clone(provider)),
        );

        match members.len() {
            1 => members.remove(0),
            _ => Arc::new(KeyProvider::union(members)),
        }
    }

    fn register(&mut self, name: String, owner: &str, model: Model) -> Result<(), ConfigError> {
        if self.models.contains_key(&name) {
            return Err(ConfigError::NameCollision { name });
        }

        tracing::debug!(model = %name, kind = model.kind(), "registered model");
        self.models.insert(
            name,
            RegisteredModel {
                owner: owner.to_owned(),
                model,
            },
        );
        Ok(())
    }
}

/// Gemini URLs may be given with or without the `/models` suffix
fn gemini_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed
        .strip_suffix("/models")
        .filter(|rest| rest.ends_with("/v1beta"))
        .unwrap_or(trimmed);
    normalize_base_url(trimmed, "v1beta")
}

fn random_targets(config: &RandomModelConfig) -> Result<Weighted<String>, ConfigError> {
    let options = match (&config.weights, &config.list) {
        (Some(weights), None) => weights
            .iter()
            .map(|(target, weight)| WeightedOption::new(target.clone(), *weight))
            .collect(),
        (None, Some(list)) => list.iter().map(|target| WeightedOption::new(target.clone(), 1.0)).collect(),
        _ => {
            return Err(ConfigError::InvalidWeights(
                "random model needs exactly one of `weights` or `list`".to_owned(),
            ));
        }
    };

    Weighted::normalize(options)
}

/// Resolves processor references, sharing each named processor once built
struct ProcessorResolver<'c> {
    definitions: &'c IndexMap<String, ProcessorRef>,
    built: HashMap<String, Arc<Processor>>,
    resolving: Vec<String>,
}

impl<'c> ProcessorResolver<'c> {
    fn new(definitions: &'c IndexMap<String, ProcessorRef>) -> Self {
        Self {
            definitions,
            built: HashMap::new(),
            resolving: Vec::new(),
        }
    }

    fn named(&mut self, name: &str) -> Result<Arc<Processor>, ConfigError> {
        if let Some(built) = self.built.get(name) {
            return Ok(Arc::clone(built));
        }

        if self.resolving.iter().any(|n| n == name) {
            return Err(ConfigError::Cycle {
                kind: "processor",
                name: name.to_owned(),
            });
        }

        let definitions = self.definitions;
        let reference = definitions.get(name).ok_or_else(|| ConfigError::UnresolvedReference {
            kind: "processor",
            name: name.to_owned(),
        })?;

        self.resolving.push(name.to_owned());
        let built = self.reference(reference);
        self.resolving.pop();

        let built = built?;
        self.built.insert(name.to_owned(), Arc::clone(&built));
        Ok(built)
    }

    fn reference(&mut self, reference: &ProcessorRef) -> Result<Arc<Processor>, ConfigError> {
        match reference {
            ProcessorRef::Named(name) => self.named(name),
            ProcessorRef::Chain(items) => Ok(Arc::new(Processor::Chain(self.all(items)?))),
            ProcessorRef::Inline(definition) => self.definition(definition).map(Arc::new),
        }
    }

    fn all(&mut self, items: &[ProcessorRef]) -> Result<Vec<Arc<Processor>>, ConfigError> {
        items.iter().map(|item| self.reference(item)).collect()
    }

    fn definition(&mut self, definition: &ProcessorDefinition) -> Result<Processor, ConfigError> {
        let processor = match definition {
            ProcessorDefinition::Identity => Processor::Identity,
            ProcessorDefinition::NoDanglingSys => Processor::NoDanglingSys,
            ProcessorDefinition::NoSys => Processor::NoSys,
            ProcessorDefinition::Whitespace => Processor::Whitespace,
            ProcessorDefinition::OverrideSamplers(samplers) => Processor::OverrideSamplers(samplers.clone()),
            ProcessorDefinition::Regex(regex) => {
                Processor::Regex(RegexRewrite::new(&regex.pattern, &regex.flags, regex.replacement.clone())?)
            }
            ProcessorDefinition::Noass { role } => Processor::Noass(parse_role(role)?),
            ProcessorDefinition::Squash(squash) => {
                let roles = squash.roles.iter().map(|r| parse_role(r)).collect::<Result<_, _>>()?;
                Processor::Squash(Squash::new(roles, squash.separator.clone()))
            }
            ProcessorDefinition::InsertMessage(insert) => Processor::InsertMessage(InsertMessage::new(
                parse_role(&insert.role)?,
                insert.content.clone(),
                insert.position,
            )),
            ProcessorDefinition::Chain { processors } => Processor::Chain(self.all(processors)?),
            ProcessorDefinition::Random(random) => Processor::Random(self.random(random)?),
        };

        Ok(processor)
    }

    fn random(&mut self, config: &RandomProcessorConfig) -> Result<Weighted<Arc<Processor>>, ConfigError> {
        let options = match (&config.weights, &config.list) {
            (Some(weights), None) => weights
                .iter()
                .map(|option| Ok(WeightedOption::new(self.reference(&option.processor)?, option.weight)))
                .collect::<Result<Vec<_>, ConfigError>>()?,
            (None, Some(list)) => list
                .iter()
                .map(|item| Ok(WeightedOption::new(self.reference(item)?, 1.0)))
                .collect::<Result<Vec<_>, ConfigError>>()?,
            _ => {
                return Err(ConfigError::InvalidWeights(
                    "random processor needs exactly one of `weights` or `list`".to_owned(),
                ));
            }
        };

        Weighted::normalize(options)
    }
}

/// Resolves key provider references, sharing each named provider once built
struct KeyResolver<'c> {
    definitions: &'c IndexMap<String, NamedKeyProviderConfig>,
    built: HashMap<String, Arc<KeyProvider>>,
    resolving: Vec<String>,
}

impl<'c> KeyResolver<'c> {
    fn new(definitions: &'c IndexMap<String, NamedKeyProviderConfig>) -> Self {
        Self {
            definitions,
            built: HashMap::new(),
            resolving: Vec::new(),
        }
    }

    fn named(&mut self, name: &str) -> Result<Arc<KeyProvider>, ConfigError> {
        if let Some(built) = self.built.get(name) {
            return Ok(Arc::clone(built));
        }

        if self.resolving.iter().any(|n| n == name) {
            return Err(ConfigError::Cycle {
                kind: "key provider",
                name: name.to_owned(),
            });
        }

        let definitions = self.definitions;
        let named = definitions.get(name).ok_or_else(|| ConfigError::UnresolvedReference {
            kind: "key provider",
            name: name.to_owned(),
        })?;

        self.resolving.push(name.to_owned());
        let built = self.definition(&named.definition).map(Arc::new);
        self.resolving.pop();

        let built = built?;
        self.built.insert(name.to_owned(), Arc::clone(&built));
        Ok(built)
    }

    fn reference(&mut self, reference: &KeyProviderRef) -> Result<Arc<KeyProvider>, ConfigError> {
        match reference {
            KeyProviderRef::Named(name) => self.named(name),
            KeyProviderRef::Inline(definition) => self.definition(definition).map(Arc::new),
        }
    }

    fn members(&mut self, members: &[KeyProviderRef]) -> Result<Vec<Arc<KeyProvider>>, ConfigError> {
        members.iter().map(|member| self.reference(member)).collect()
    }

    fn definition(&mut self, definition: &KeyProviderDefinition) -> Result<KeyProvider, ConfigError> {
        match definition {
            KeyProviderDefinition::Literal { key } => Ok(KeyProvider::literal(key.clone())),
            KeyProviderDefinition::Environment { env_var } => KeyProvider::environment(env_var),
            KeyProviderDefinition::Union { members } => Ok(KeyProvider::union(self.members(members)?)),
            KeyProviderDefinition::Pool { members, timeout } => Ok(KeyProvider::pool(self.members(members)?, *timeout)),
        }
    }

    /// Named providers with compiled `model_targets`, in configuration order
    fn targeted(&mut self) -> Result<Vec<(Regex, Arc<KeyProvider>)>, ConfigError> {
        let definitions = self.definitions;
        let mut targeted = Vec::new();

        for (name, named) in definitions {
            for pattern in &named.model_targets {
                let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                targeted.push((regex, self.named(name)?));
            }
        }

        Ok(targeted)
    }
}
