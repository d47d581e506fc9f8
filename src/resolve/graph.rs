//! Builds the resource graph of every deployment config

use std::collections::HashSet;
use tracing::{debug, info};

use crate::resolve::error::{ResolveError, Result};
use crate::runtime::Resource;
use crate::secrets::SecretBackend;
use crate::types::{
    DependencyBinding, DeploymentConfig, DeploymentContext, ResourceIdentity, Secret,
};

/// Resources with a post-apply step, by position in their config, in first-seen order.
#[derive(Debug, Default)]
pub struct MigrationQueue {
    entries: Vec<(usize, usize)>,
}

impl MigrationQueue {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, config: usize, resource: usize) {
        self.entries.push((config, resource));
    }

    /// Run every queued migration in order, stopping at the first failure.
    pub async fn run(&self, configs: &mut [DeploymentConfig]) -> Result<usize> {
        let mut ran = 0;
        for &(config, index) in &self.entries {
            let Some(resource) = configs
                .get_mut(config)
                .and_then(|c| c.resources.get_mut(index))
            else {
                continue;
            };
            let identity = resource.identity();
            if let Some(migrate) = resource.as_migrate() {
                info!("Migrating {}", identity);
                migrate
                    .migrate()
                    .await
                    .map_err(|source| ResolveError::Migration {
                        resource: identity.to_string(),
                        source,
                    })?;
                ran += 1;
            }
        }
        Ok(ran)
    }
}

/// Output of [`GraphBuilder::build`]: every binding loaders declared and the deferred migrations.
#[derive(Debug, Default)]
pub struct Graph {
    pub bindings: Vec<DependencyBinding>,
    pub migrations: MigrationQueue,
    /// Secrets handed to the runtimes, including the ones generated in this run.
    pub secret_names: Vec<String>,
}

pub struct GraphBuilder<'a> {
    secrets: &'a mut dyn SecretBackend,
    working_set: Option<Vec<Secret>>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(secrets: &'a mut dyn SecretBackend) -> Self {
        Self {
            secrets,
            working_set: None,
        }
    }

    /// Load resources and services for every config, then provision missing secrets.
    pub fn build(&mut self, configs: &mut [DeploymentConfig]) -> Result<Graph> {
        let mut graph = Graph::default();
        let mut seen: HashSet<ResourceIdentity> = HashSet::new();

        for (config_index, config) in configs.iter_mut().enumerate() {
            let bindings = load_resources(config, config_index, &mut seen, &mut graph.migrations)?;
            graph.bindings.extend(bindings);
        }

        for config in configs.iter_mut() {
            let ctx = config.environment.context();
            config
                .runtime
                .init(&ctx)
                .map_err(|source| ResolveError::RuntimeInit {
                    runtime: config.runtime_name().to_string(),
                    source,
                })?;

            load_services(config)?;

            let secrets = self.provision_secrets(&config.environment.name, &graph.bindings)?;
            config
                .runtime
                .init_secrets(&ctx, secrets)
                .map_err(|source| ResolveError::RuntimeInit {
                    runtime: config.runtime_name().to_string(),
                    source,
                })?;
        }

        graph.secret_names = self
            .working_set
            .iter()
            .flatten()
            .map(|s| s.name.clone())
            .collect();
        Ok(graph)
    }

    /// Decrypt the environment's secrets once per run and generate any that
    /// a binding requires but that do not exist yet.
    fn provision_secrets(&mut self, env: &str, bindings: &[DependencyBinding]) -> Result<&[Secret]> {
        if self.working_set.is_none() {
            let existing = self.secrets.decrypt_all(env)?;
            debug!("Decrypted {} secrets of environment {}", existing.len(), env);
            self.working_set = Some(existing);
        }
        let working_set = self.working_set.get_or_insert_with(Vec::new);

        for binding in bindings {
            for secret_ref in &binding.secret_refs {
                let name = secret_ref.namespaced(&binding.identity);
                if working_set.iter().any(|s| s.name == name) {
                    continue;
                }
                let secret = secret_ref.generate(&binding.identity);
                self.secrets.write(env, &secret)?;
                info!("Generated secret {}", secret.name);
                working_set.push(secret);
            }
        }
        Ok(working_set.as_slice())
    }
}

fn load_resources(
    config: &mut DeploymentConfig,
    config_index: usize,
    seen: &mut HashSet<ResourceIdentity>,
    migrations: &mut MigrationQueue,
) -> Result<Vec<DependencyBinding>> {
    let mut bindings = Vec::new();

    // loader registration order decides which duplicate is seen first
    for loader in config.runtime.resource_loaders() {
        for definition in config.definitions.iter().filter(|d| d.name == loader.name()) {
            debug!(
                "Loading {} for {}",
                definition.name, definition.depended_on_by
            );
            let loaded = loader
                .load(definition)
                .map_err(|source| ResolveError::Load {
                    resource_type: definition.name.clone(),
                    depended_on_by: definition.depended_on_by.to_string(),
                    source,
                })?;
            bindings.extend(loaded.bindings);

            for resource in loaded.resources {
                let identity = resource.identity();
                if !seen.insert(identity.clone()) {
                    debug!("Resource {} already loaded", identity);
                    continue;
                }
                config.resources.push(resource);
            }
        }
    }

    for (index, resource) in config.resources.iter_mut().enumerate() {
        if resource.as_migrate().is_some() {
            migrations.push(config_index, index);
        }
    }
    Ok(bindings)
}

fn load_services(config: &mut DeploymentConfig) -> Result<()> {
    let ctx = config.environment.context();
    let loaders = config.runtime.service_loaders();

    let mut loaded: Vec<Box<dyn Resource>> = Vec::with_capacity(config.services.len());
    for service in &config.services {
        let Some(loader) = loaders.iter().find(|l| l.name() == service.runtime) else {
            continue;
        };
        // environment values win, and only keys the service declares survive
        let merged = service.env.merged(&config.environment.env);
        let env = service.env.declared_keys().apply(&merged);
        let deployment = DeploymentContext {
            env,
            resources: config.environment.resources.get(&service.runtime).cloned(),
        };
        let resource = loader
            .load(&ctx, service, &deployment)
            .map_err(|source| ResolveError::ServiceLoad {
                service: service.name.clone(),
                source,
            })?;
        debug!("Loaded service {} as {}", service.name, resource.identity());
        loaded.push(resource);
    }
    config.resources.extend(loaded);
    Ok(())
}
