//! Compiled-in registry of runtime adapters

use std::sync::Arc;

use crate::runtime::interface::{ResourceLoader, Runtime};

/// Runtimes available to a run, in registration order.
#[derive(Clone, Default)]
pub struct RuntimeRegistry {
    runtimes: Vec<Arc<dyn Runtime>>,
}

impl RuntimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.register(runtime);
        self
    }

    pub fn register(&mut self, runtime: Arc<dyn Runtime>) {
        self.runtimes.push(runtime);
    }

    pub fn runtimes(&self) -> &[Arc<dyn Runtime>] {
        &self.runtimes
    }

    pub fn names(&self) -> Vec<&str> {
        self.runtimes.iter().map(|r| r.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Runtime>> {
        self.runtimes.iter().find(|r| r.name() == name).cloned()
    }

    /// The first runtime exposing a service loader named `runtime_key`.
    pub fn runtime_for(&self, runtime_key: &str) -> Option<Arc<dyn Runtime>> {
        self.runtimes
            .iter()
            .find(|r| r.service_loaders().iter().any(|l| l.name() == runtime_key))
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }
}

/// The resource loader of `runtime` named exactly `resource_type`.
pub fn resource_loader(runtime: &dyn Runtime, resource_type: &str) -> Option<Arc<dyn ResourceLoader>> {
    runtime
        .resource_loaders()
        .into_iter()
        .find(|l| l.name() == resource_type)
}
