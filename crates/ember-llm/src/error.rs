use ember_core::HttpError;
use http::StatusCode;
use thiserror::Error;

/// Status reported when the client went away before the reply was ready
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Errors raised while building the model graph from configuration
///
/// All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An `environment` key provider points at a missing or empty variable
    #[error("environment variable {var} is not set or empty")]
    MissingEnvVar { var: String },

    /// A name used as a reference does not exist
    #[error("unknown {kind} '{name}'")]
    UnresolvedReference { kind: &'static str, name: String },

    /// Two model entries expand to the same registered name
    #[error("model name collision: '{name}' is already registered")]
    NameCollision { name: String },

    /// Named references loop back onto themselves
    #[error("{kind} reference cycle through '{name}'")]
    Cycle { kind: &'static str, name: String },

    /// Weighted options are empty, non-positive or not finite
    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    /// A regex pattern or flag set cannot be compiled
    #[error("invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    /// A prompt template failed to compile
    #[error("invalid template for '{provider}': {reason}")]
    InvalidTemplate { provider: String, reason: String },

    /// A role name outside system, developer, user and assistant
    #[error("invalid role '{0}'")]
    InvalidRole(String),
}

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Requested model is not registered
    #[error("model not found: {model}")]
    ModelNotFound { model: String },

    /// Client sent a malformed or invalid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream provider failed or returned a non-success status
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Error while reading a response stream
    #[error("streaming error: {0}")]
    Streaming(String),

    /// No credential source could hand out a key
    #[error("no credential available")]
    NoCredential,

    /// A random model could not land on a registered target
    #[error("no valid target for random model '{model}'")]
    NoValidTarget { model: String },

    /// The request was cancelled before a result was produced
    #[error("request cancelled")]
    Cancelled,

    /// Configuration problem surfaced at request time
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::Streaming(_) => StatusCode::BAD_GATEWAY,
            Self::Cancelled => {
                StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::NoCredential | Self::NoValidTarget { .. } | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::ModelNotFound { .. } => "not_found_error",
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Upstream(_) => "upstream_error",
            Self::Streaming(_) => "streaming_error",
            Self::NoCredential => "credential_error",
            Self::NoValidTarget { .. } => "routing_error",
            Self::Cancelled => "cancelled",
            Self::Config(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}
