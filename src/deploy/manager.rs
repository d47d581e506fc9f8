use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Settings;
use crate::deploy::{DeployError, Result};
use crate::fs::write_private;
use crate::resolve::{resolve, Resolution};
use crate::runtime::{Runtime, RuntimeRegistry};
use crate::secrets::{random_lowercase, KeySession, SecretVault};
use crate::types::{Command, VersionResolver};

/// Entry point for every run against a definitions root.
pub struct DeploymentManager {
    settings: Settings,
    registry: RuntimeRegistry,
}

/// What [`DeploymentManager::execute`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub runtimes: Vec<String>,
    pub resources: usize,
    pub migrations: usize,
}

#[derive(Serialize)]
struct EnvironmentFile<'a> {
    context: &'a str,
    region: &'a str,
    state_store: String,
}

impl DeploymentManager {
    pub fn new(settings: Settings, registry: RuntimeRegistry) -> Self {
        Self { settings, registry }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &RuntimeRegistry {
        &self.registry
    }

    /// Read definitions and resolve them into wired graphs, one per runtime.
    pub fn prepare(
        &self,
        selector: Arc<dyn VersionResolver>,
        session: &mut KeySession,
    ) -> Result<Resolution> {
        info!(
            "Preparing environment {} from {}",
            selector.env(),
            self.settings.root.display()
        );
        let definitions = self.settings.reader().read()?;
        debug!(
            "Read {} environments and {} services",
            definitions.environments.len(),
            definitions.services.len()
        );

        let mut vault = SecretVault::new(self.settings.secret_store(), session);
        Ok(resolve(&self.registry, definitions, selector, &mut vault)?)
    }

    /// Prepare, then run `command` against each runtime in order. Deferred
    /// migrations run only after a successful apply.
    pub async fn execute(
        &self,
        command: Command,
        selector: Arc<dyn VersionResolver>,
        session: &mut KeySession,
    ) -> Result<ExecutionReport> {
        let mut resolution = self.prepare(selector, session)?;
        let runtimes: Vec<Arc<dyn Runtime>> = resolution
            .configs
            .iter()
            .map(|c| c.runtime.clone())
            .collect();

        let mut report = ExecutionReport {
            resources: resolution.configs.iter().map(|c| c.resources.len()).sum(),
            ..ExecutionReport::default()
        };
        for runtime in runtimes {
            info!("Running {} on runtime {}", command, runtime.name());
            run_command(runtime.as_ref(), command).await?;
            report.runtimes.push(runtime.name().to_string());
        }

        if command == Command::Apply && resolution.pending_migrations() > 0 {
            report.migrations = resolution.run_migrations().await?;
        }
        Ok(report)
    }

    /// Create `environments/<env>/resources.yaml` if missing, then let the
    /// runtime bootstrap its account.
    pub async fn init_environment(
        &self,
        env: &str,
        context: &str,
        region: &str,
        runtime: &str,
    ) -> Result<PathBuf> {
        let runtime = self
            .registry
            .get(runtime)
            .ok_or_else(|| DeployError::UnknownRuntime {
                name: runtime.to_string(),
                available: self.registry.names().join(", "),
            })?;

        let path = self.settings.reader().resources_file(env);
        if path.exists() {
            debug!("{} already exists", path.display());
        } else {
            let file = EnvironmentFile {
                context,
                region,
                state_store: format!("infralink-state-{}-{}", context, random_lowercase(6)),
            };
            let content = serde_yaml::to_string(&file)
                .map_err(|e| DeployError::Configuration(e.to_string()))?;
            write_private(&path, content.as_bytes()).map_err(|source| DeployError::Io {
                path: path.display().to_string(),
                source,
            })?;
            info!("Created {}", path.display());
        }

        runtime
            .init_environment(env, context, region)
            .await
            .map_err(|source| DeployError::EnvironmentInit {
                runtime: runtime.name().to_string(),
                env: env.to_string(),
                source,
            })?;
        Ok(path)
    }
}

async fn run_command(runtime: &dyn Runtime, command: Command) -> Result<()> {
    let result = match command {
        Command::Plan => runtime.plan().await,
        Command::Export => runtime.export().await,
        Command::Apply => runtime.apply().await,
        Command::Delete => runtime.delete().await,
    };
    result.map_err(|source| DeployError::Command {
        runtime: runtime.name().to_string(),
        command: command.to_string(),
        source,
    })
}
