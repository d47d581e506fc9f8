use crate::runtime::{DependencyVisitor, ProviderError};
use crate::types::secret::SecretRef;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Global key of one logical resource within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentity {
    pub resource_type: String,
    pub id: String,
}

impl ResourceIdentity {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.resource_type, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Privileges {
    ReadOnly,
    ReadWrite,
    Owner,
}

/// Declares that the resource named by `identity` must announce itself to
/// whatever is named by `depended_on_by`.
#[derive(Clone)]
pub struct DependencyBinding {
    pub depended_on_by: ResourceIdentity,
    pub privileges: Privileges,
    pub identity: ResourceIdentity,
    pub visitor: Option<Arc<dyn DependencyVisitor>>,
    pub secret_refs: Vec<SecretRef>,
}

impl DependencyBinding {
    pub fn new(
        depended_on_by: ResourceIdentity,
        privileges: Privileges,
        identity: ResourceIdentity,
    ) -> Self {
        Self {
            depended_on_by,
            privileges,
            identity,
            visitor: None,
            secret_refs: Vec::new(),
        }
    }

    pub fn with_visitor(mut self, visitor: Arc<dyn DependencyVisitor>) -> Self {
        self.visitor = Some(visitor);
        self
    }

    pub fn with_secret(mut self, secret: SecretRef) -> Self {
        self.secret_refs.push(secret);
        self
    }

    /// Secret names this binding requires, namespaced by the bound resource.
    pub fn secret_names(&self) -> impl Iterator<Item = String> + '_ {
        self.secret_refs
            .iter()
            .map(move |r| r.namespaced(&self.identity))
    }
}

impl fmt::Debug for DependencyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyBinding")
            .field("depended_on_by", &self.depended_on_by)
            .field("privileges", &self.privileges)
            .field("identity", &self.identity)
            .field("has_visitor", &self.visitor.is_some())
            .field("secret_refs", &self.secret_refs)
            .finish()
    }
}

/// One service's declared dependency on a resource type.
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    /// Resource type; matched against resource loader names.
    pub name: String,
    pub depended_on_by: ResourceIdentity,
    pub service_config: serde_yaml::Value,
    pub resource_config: Option<serde_yaml::Value>,
    pub(crate) unclaimed: Arc<BTreeMap<String, serde_yaml::Value>>,
}

impl ResourceDefinition {
    pub fn new(
        name: impl Into<String>,
        depended_on_by: ResourceIdentity,
        service_config: serde_yaml::Value,
        resource_config: Option<serde_yaml::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            depended_on_by,
            service_config,
            resource_config,
            unclaimed: Arc::new(BTreeMap::new()),
        }
    }

    pub fn with_unclaimed(mut self, unclaimed: Arc<BTreeMap<String, serde_yaml::Value>>) -> Self {
        self.unclaimed = unclaimed;
        self
    }

    /// Deserialize the service-side configuration.
    pub fn service_config<T: DeserializeOwned>(&self) -> Result<T, ProviderError> {
        decode(&self.name, &self.service_config)
    }

    /// Deserialize the environment-level configuration, if the environment has one.
    pub fn resource_config<T: DeserializeOwned>(&self) -> Result<Option<T>, ProviderError> {
        self.resource_config
            .as_ref()
            .map(|value| decode(&self.name, value))
            .transpose()
    }

    /// Look up an environment resource entry no service claimed, by type name.
    pub fn unclaimed_config<T: DeserializeOwned>(
        &self,
        resource_type: &str,
    ) -> Result<Option<T>, ProviderError> {
        self.unclaimed
            .get(resource_type)
            .map(|value| decode(resource_type, value))
            .transpose()
    }

    pub fn unclaimed_types(&self) -> impl Iterator<Item = &str> {
        self.unclaimed.keys().map(String::as_str)
    }
}

fn decode<T: DeserializeOwned>(name: &str, value: &serde_yaml::Value) -> Result<T, ProviderError> {
    serde_yaml::from_value(value.clone()).map_err(|e| ProviderError::InvalidConfig {
        resource: name.to_string(),
        reason: e.to_string(),
    })
}
