use thiserror::Error;

/// Errors raised by provider adapters: loaders, visitors, resources and runtimes.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid configuration for {resource}: {reason}")]
    InvalidConfig { resource: String, reason: String },

    #[error("Constraint violated by {resource}: {reason}")]
    Constraint { resource: String, reason: String },

    #[error("Version lookup failed: {0}")]
    Version(#[from] crate::types::VersionError),

    #[error("Artifact generation failed for {resource}: {reason}")]
    Artifact { resource: String, reason: String },

    #[error("Provider command {command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
