use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CounterError {
    #[error("Unknown counter type: {0}")]
    UnknownType(String),

    #[error("Counter type {0} is not supported by this build")]
    Unsupported(String),
}
