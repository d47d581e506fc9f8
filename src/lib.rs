//! Infralink - deployment resolution, dependency binding and secret provisioning
//!
//! Service and environment definitions are resolved into one wired resource
//! graph per provider runtime. Secrets the graph needs are generated and
//! encrypted for every registered operator key before provisioning.

pub mod cli;
pub mod config;
pub mod definitions;
pub mod deploy;
pub(crate) mod fs;
pub mod resolve;
pub mod runtime;
pub mod secrets;
pub mod types;

pub use config::Settings;
pub use deploy::DeploymentManager;
pub use types::*;
