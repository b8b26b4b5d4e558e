use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("max_rounds must be at least 1 (got {got})")]
    InvalidMaxRounds { got: usize },

    #[error("unknown drain policy: {name}")]
    UnknownPolicy { name: String },

    #[error("a global change queue is already installed on this thread")]
    AlreadyInstalled,

    #[cfg(feature = "policy-config")]
    #[error("invalid queue configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl RuntimeError {
    #[must_use]
    pub fn unknown_policy(name: impl Into<String>) -> Self {
        Self::UnknownPolicy { name: name.into() }
    }
}
