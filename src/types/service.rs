use crate::types::env_vars::EnvVars;
use crate::types::resource::ResourceIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A deployable unit, bound to a runtime by its `runtime` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub runtime: String,
    /// Provider-specific service specification, interpreted by the service loader.
    #[serde(default)]
    pub spec: serde_yaml::Value,
    /// Resource type to this service's dependency configuration for that type.
    #[serde(default)]
    pub depends_on: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub env: EnvVars,
}

impl Service {
    pub fn new(name: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runtime: runtime.into(),
            spec: serde_yaml::Value::Null,
            depends_on: BTreeMap::new(),
            env: EnvVars::default(),
        }
    }

    pub fn with_spec(mut self, spec: serde_yaml::Value) -> Self {
        self.spec = spec;
        self
    }

    pub fn with_dependency(mut self, resource_type: impl Into<String>, config: serde_yaml::Value) -> Self {
        self.depends_on.insert(resource_type.into(), config);
        self
    }

    /// The identity a service resource carries in the graph.
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(&self.runtime, &self.name)
    }
}
