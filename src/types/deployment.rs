use crate::runtime::{Resource, Runtime};
use crate::types::env_vars::EnvVars;
use crate::types::environment::Environment;
use crate::types::resource::{ResourceDefinition, ResourceIdentity};
use crate::types::service::Service;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Everything one runtime deploys into the target environment.
pub struct DeploymentConfig {
    pub environment: Arc<Environment>,
    pub runtime: Arc<dyn Runtime>,
    pub services: Vec<Service>,
    pub definitions: Vec<ResourceDefinition>,
    /// Deduplicated resources followed by one resource per service, filled by the graph builder.
    pub resources: Vec<Box<dyn Resource>>,
}

impl DeploymentConfig {
    pub fn new(environment: Arc<Environment>, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            environment,
            runtime,
            services: Vec::new(),
            definitions: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    pub fn resource(&self, identity: &ResourceIdentity) -> Option<&dyn Resource> {
        self.resources
            .iter()
            .find(|r| &r.identity() == identity)
            .map(|r| r.as_ref())
    }

    pub fn resource_mut(&mut self, identity: &ResourceIdentity) -> Option<&mut Box<dyn Resource>> {
        self.resources.iter_mut().find(|r| &r.identity() == identity)
    }

    pub fn identities(&self) -> Vec<ResourceIdentity> {
        self.resources.iter().map(|r| r.identity()).collect()
    }
}

impl fmt::Debug for DeploymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentConfig")
            .field("environment", &self.environment.name)
            .field("runtime", &self.runtime.name())
            .field(
                "services",
                &self.services.iter().map(|s| &s.name).collect::<Vec<_>>(),
            )
            .field("definitions", &self.definitions.len())
            .field("resources", &self.identities())
            .finish()
    }
}

/// Per-service input to a service loader.
#[derive(Debug, Clone, Default)]
pub struct DeploymentContext {
    /// Variables scoped to the keys the service itself declares.
    pub env: EnvVars,
    /// Environment-level configuration for the service's runtime key.
    pub resources: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Plan,
    Export,
    Apply,
    Delete,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Plan => "plan",
            Command::Export => "export",
            Command::Apply => "apply",
            Command::Delete => "delete",
        };
        f.write_str(name)
    }
}
