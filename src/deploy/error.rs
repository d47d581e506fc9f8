use thiserror::Error;

use crate::definitions::DefinitionError;
use crate::resolve::ResolveError;
use crate::runtime::ProviderError;
use crate::secrets::SecretError;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("Runtime {runtime} failed to {command}: {source}")]
    Command {
        runtime: String,
        command: String,
        #[source]
        source: ProviderError,
    },

    #[error("Runtime {runtime} failed to initialise environment {env}: {source}")]
    EnvironmentInit {
        runtime: String,
        env: String,
        #[source]
        source: ProviderError,
    },

    #[error("Unknown runtime {name}, available: {available}")]
    UnknownRuntime { name: String, available: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Prompt failed: {reason}")]
    Prompt { reason: String },

    #[error("{command} aborted by operator")]
    Aborted { command: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DeployError {
    /// Operator remediation for secret failures, wherever they surfaced.
    pub fn hint(&self) -> Option<String> {
        match self {
            DeployError::Secret(e) | DeployError::Resolve(ResolveError::Secret(e)) => e.hint(),
            DeployError::UnknownRuntime { .. } => {
                Some("Run `infralink providers` to list the compiled-in runtimes.".to_string())
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
