use thiserror::Error;

/// Failures raised by either phase of the configuration pipeline
/// (baseline merge + expansion, or the semantic validator). Both
/// surface through this single type, per spec: a structural
/// contradiction aborts the pipeline immediately, while the validator
/// aggregates everything it finds into one `Validation` value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Duplicate publication: {0}")]
    DuplicatePublication(String),

    #[error("Duplicate subscription: {0}")]
    DuplicateSubscription(String),

    #[error("Publication: {publication} refers to an unknown reply queue: {queue}")]
    UnknownReplyQueue { publication: String, queue: String },

    #[error("Publication: {0} must have exactly one of exchange or queue")]
    AmbiguousPublicationTarget(String),

    #[error("Invalid connection URL: {0}")]
    InvalidConnectionUrl(String),

    #[error("Unsupported AMQP protocol scheme: {0}")]
    UnsupportedProtocol(String),

    #[error("Malformed binding name: {0}")]
    MalformedBindingName(String),

    #[error("Malformed shovel name: {0}")]
    MalformedShovelName(String),

    #[error("Unknown encryption profile: {0}")]
    UnknownEncryptionProfile(String),

    #[error("Unknown counter type: {0}")]
    UnknownCounterType(String),

    #[error("Invalid configuration: {0}")]
    Malformed(String),

    #[error("{} configuration validation error(s): {}", .0.len(), .0.join("; "))]
    Validation(Vec<String>),
}
