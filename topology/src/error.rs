use thiserror::Error;

/// Errors raised while dereferencing or cross-linking already-resolved
/// topology (as opposed to `configurator::ConfigError`, which covers
/// merge/expansion failures on the *raw* tree).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Unknown vhost: {0}")]
    UnknownVhost(String),

    #[error("Unknown exchange: {vhost}/{name}")]
    UnknownExchange { vhost: String, name: String },

    #[error("Unknown queue: {vhost}/{name}")]
    UnknownQueue { vhost: String, name: String },

    #[error("Unknown publication: {0}")]
    UnknownPublication(String),

    #[error("Unknown subscription: {0}")]
    UnknownSubscription(String),
}
