//! Contracts between the resolution engine and provider adapters

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use crate::runtime::error::ProviderResult;
use crate::types::{
    DependencyBinding, DeploymentContext, EnvContext, ResourceDefinition, ResourceIdentity,
    Secret, Service,
};

/// A provider adapter translating a resolved graph into provisioning actions.
#[async_trait]
pub trait Runtime: Send + Sync {
    fn name(&self) -> &str;

    /// First-time bootstrap of the provider account for an environment.
    async fn init_environment(&self, env: &str, context: &str, region: &str) -> ProviderResult<()>;

    /// Called once per deployment config before any service is loaded.
    fn init(&self, ctx: &EnvContext) -> ProviderResult<()>;

    /// Receives the complete decrypted secret set of the environment.
    fn init_secrets(&self, ctx: &EnvContext, secrets: &[Secret]) -> ProviderResult<()>;

    fn resource_loaders(&self) -> Vec<Arc<dyn ResourceLoader>>;

    fn service_loaders(&self) -> Vec<Arc<dyn ServiceLoader>>;

    async fn plan(&self) -> ProviderResult<()>;

    async fn apply(&self) -> ProviderResult<()>;

    async fn delete(&self) -> ProviderResult<()>;

    async fn export(&self) -> ProviderResult<()>;
}

/// Output of one resource loader invocation.
#[derive(Default)]
pub struct Loaded {
    pub resources: Vec<Box<dyn Resource>>,
    pub bindings: Vec<DependencyBinding>,
}

impl Loaded {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, resource: impl Resource + 'static) -> Self {
        self.resources.push(Box::new(resource));
        self
    }

    pub fn binding(mut self, binding: DependencyBinding) -> Self {
        self.bindings.push(binding);
        self
    }
}

/// Builds resources for one resource type; `name` is matched against dependency keys.
pub trait ResourceLoader: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self, definition: &ResourceDefinition) -> ProviderResult<Loaded>;
}

/// Builds the resource for a service; `name` is matched against the service's runtime key.
pub trait ServiceLoader: Send + Sync {
    fn name(&self) -> &str;

    fn load(
        &self,
        ctx: &EnvContext,
        service: &Service,
        deployment: &DeploymentContext,
    ) -> ProviderResult<Box<dyn Resource>>;
}

/// One node of the infrastructure graph.
pub trait Resource: Send {
    fn identity(&self) -> ResourceIdentity;

    /// Render the resource once every binding targeting it has been applied.
    fn configure(&mut self) -> ProviderResult<()>;

    /// Resources with a post-apply step expose it here.
    fn as_migrate(&mut self) -> Option<&mut dyn Migrate> {
        None
    }

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<'a> dyn Resource + 'a {
    /// Typed access for visitors that recognise a concrete resource kind.
    pub fn downcast_mut<T: Resource + 'static>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Deferred step run after the provider has applied the graph.
#[async_trait]
pub trait Migrate: Send {
    async fn migrate(&mut self) -> ProviderResult<()>;
}

/// Result of offering a resource to a visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Applied,
    NotApplicable,
}

/// Projects the state of a bound resource onto the resource that depends on it.
pub trait DependencyVisitor: Send + Sync {
    /// Mutate `resource` if it is a kind this visitor knows, otherwise report
    /// [`Visit::NotApplicable`] and leave it untouched.
    fn configure_resource(&self, resource: &mut dyn Resource) -> ProviderResult<Visit>;
}
