//! Matches services to runtimes and validates their resource dependencies

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::resolve::error::{ResolveError, Result};
use crate::runtime::{resource_loader, RuntimeRegistry};
use crate::types::{
    DeploymentConfig, Environment, ResourceDefinition, Service, VersionResolver,
};

pub struct DeploymentPlanner<'a> {
    registry: &'a RuntimeRegistry,
}

impl<'a> DeploymentPlanner<'a> {
    pub fn new(registry: &'a RuntimeRegistry) -> Self {
        Self { registry }
    }

    /// One [`DeploymentConfig`] per runtime, in the order runtimes are first
    /// matched. Nothing is loaded: a plan either validates completely or fails.
    pub fn plan(
        &self,
        environments: Vec<Environment>,
        services: Vec<Service>,
        selector: Arc<dyn VersionResolver>,
    ) -> Result<Vec<DeploymentConfig>> {
        let mut environment = environments
            .into_iter()
            .find(|e| e.name == selector.env())
            .ok_or_else(|| ResolveError::NoTargetEnvironment {
                env: selector.env().to_string(),
            })?;
        environment.resolver = Some(selector);
        info!("Selected environment {}", environment.name);

        if services.is_empty() {
            return Err(ResolveError::NoServices);
        }

        let environment = Arc::new(environment);
        let mut configs: Vec<DeploymentConfig> = Vec::new();
        let mut claimed: Vec<BTreeSet<String>> = Vec::new();

        for service in services {
            let runtime = self.registry.runtime_for(&service.runtime).ok_or_else(|| {
                ResolveError::UnmatchedRuntime {
                    service: service.name.clone(),
                    runtime: service.runtime.clone(),
                }
            })?;

            let index = match configs
                .iter()
                .position(|c| c.runtime_name() == runtime.name())
            {
                Some(index) => index,
                None => {
                    debug!("Runtime {} handles service {}", runtime.name(), service.name);
                    configs.push(DeploymentConfig::new(environment.clone(), runtime.clone()));
                    claimed.push(BTreeSet::new());
                    configs.len() - 1
                }
            };

            for (resource_type, service_config) in &service.depends_on {
                if resource_loader(runtime.as_ref(), resource_type).is_none() {
                    return Err(ResolveError::UnsupportedResourceType {
                        runtime: runtime.name().to_string(),
                        service: service.name.clone(),
                        resource_type: resource_type.clone(),
                    });
                }
                claimed[index].insert(resource_type.clone());
                configs[index].definitions.push(ResourceDefinition::new(
                    resource_type,
                    service.identity(),
                    service_config.clone(),
                    environment.resources.get(resource_type).cloned(),
                ));
            }
            configs[index].services.push(service);
        }

        for (config, claimed) in configs.iter_mut().zip(&claimed) {
            let unclaimed: BTreeMap<_, _> = environment
                .resources
                .iter()
                .filter(|(key, _)| !claimed.contains(*key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            let unclaimed = Arc::new(unclaimed);
            for definition in &mut config.definitions {
                definition.unclaimed = unclaimed.clone();
            }
            info!(
                "Runtime {}: {} services, {} resource definitions",
                config.runtime_name(),
                config.services.len(),
                config.definitions.len()
            );
        }

        Ok(configs)
    }
}
