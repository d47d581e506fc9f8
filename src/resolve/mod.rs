//! Resolution of definitions into wired, configured resource graphs

pub mod error;
pub mod graph;
pub mod planner;
pub mod wiring;

pub use error::*;
pub use graph::*;
pub use planner::*;
pub use wiring::*;

use std::sync::Arc;
use tracing::info;

use crate::definitions::Definitions;
use crate::runtime::RuntimeRegistry;
use crate::secrets::SecretBackend;
use crate::types::{DependencyBinding, DeploymentConfig, VersionResolver};

/// A fully wired graph, ready for a provider command.
#[derive(Debug)]
pub struct Resolution {
    pub configs: Vec<DeploymentConfig>,
    pub bindings: Vec<DependencyBinding>,
    pub secret_names: Vec<String>,
    migrations: MigrationQueue,
}

impl Resolution {
    pub fn pending_migrations(&self) -> usize {
        self.migrations.len()
    }

    /// Run the deferred migrations of every resource that has one.
    pub async fn run_migrations(&mut self) -> Result<usize> {
        self.migrations.run(&mut self.configs).await
    }
}

/// Plan, load, provision secrets and wire: the whole pipeline up to the provider command.
pub fn resolve(
    registry: &RuntimeRegistry,
    definitions: Definitions,
    selector: Arc<dyn VersionResolver>,
    secrets: &mut dyn SecretBackend,
) -> Result<Resolution> {
    let mut configs = DeploymentPlanner::new(registry).plan(
        definitions.environments,
        definitions.services,
        selector,
    )?;

    let graph = GraphBuilder::new(secrets).build(&mut configs)?;
    wire(&mut configs, &graph.bindings)?;

    info!(
        "Resolved {} deployment configs with {} resources",
        configs.len(),
        configs.iter().map(|c| c.resources.len()).sum::<usize>()
    );
    Ok(Resolution {
        configs,
        bindings: graph.bindings,
        secret_names: graph.secret_names,
        migrations: graph.migrations,
    })
}
