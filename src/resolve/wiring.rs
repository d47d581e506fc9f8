use tracing::{debug, info};

use crate::resolve::error::{ResolveError, Result};
use crate::runtime::Visit;
use crate::types::{DependencyBinding, DeploymentConfig};

/// Counts reported by [`wire`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WiringSummary {
    pub applied: usize,
    pub not_applicable: usize,
    pub configured: usize,
}

/// Offer every resource to the visitors of the bindings that name it as their
/// dependent, then configure it. A resource is configured only after all of
/// its bindings have been applied.
pub fn wire(configs: &mut [DeploymentConfig], bindings: &[DependencyBinding]) -> Result<WiringSummary> {
    let mut summary = WiringSummary::default();

    for config in configs.iter_mut() {
        for resource in config.resources.iter_mut() {
            let identity = resource.identity();

            for binding in bindings.iter().filter(|b| b.depended_on_by == identity) {
                let Some(visitor) = &binding.visitor else {
                    continue;
                };
                let visit = visitor
                    .configure_resource(&mut **resource)
                    .map_err(|source| ResolveError::Wiring {
                        binding: binding.identity.to_string(),
                        resource: identity.to_string(),
                        source,
                    })?;
                match visit {
                    Visit::Applied => {
                        debug!("Bound {} to {}", binding.identity, identity);
                        summary.applied += 1;
                    }
                    Visit::NotApplicable => summary.not_applicable += 1,
                }
            }

            resource
                .configure()
                .map_err(|source| ResolveError::Configure {
                    resource: identity.to_string(),
                    source,
                })?;
            summary.configured += 1;
        }
    }

    info!(
        "Wired {} bindings, configured {} resources",
        summary.applied, summary.configured
    );
    Ok(summary)
}
