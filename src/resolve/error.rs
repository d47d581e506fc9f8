use thiserror::Error;

use crate::runtime::ProviderError;
use crate::secrets::SecretError;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Could not find a target environment for {env}")]
    NoTargetEnvironment { env: String },

    #[error("No services to deploy")]
    NoServices,

    #[error("Could not find a runtime that supports service {service} of type {runtime}")]
    UnmatchedRuntime { service: String, runtime: String },

    #[error("Runtime {runtime} does not support resource type {resource_type}, required by service {service}")]
    UnsupportedResourceType {
        runtime: String,
        service: String,
        resource_type: String,
    },

    #[error("Loading {resource_type} for {depended_on_by} failed: {source}")]
    Load {
        resource_type: String,
        depended_on_by: String,
        #[source]
        source: ProviderError,
    },

    #[error("Loading service {service} failed: {source}")]
    ServiceLoad {
        service: String,
        #[source]
        source: ProviderError,
    },

    #[error("Runtime {runtime} failed to initialise: {source}")]
    RuntimeInit {
        runtime: String,
        #[source]
        source: ProviderError,
    },

    #[error("Applying binding of {binding} to {resource} failed: {source}")]
    Wiring {
        binding: String,
        resource: String,
        #[source]
        source: ProviderError,
    },

    #[error("Configuring {resource} failed: {source}")]
    Configure {
        resource: String,
        #[source]
        source: ProviderError,
    },

    #[error("Migration of {resource} failed: {source}")]
    Migration {
        resource: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Secret(#[from] SecretError),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
