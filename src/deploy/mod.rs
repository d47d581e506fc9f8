pub mod error;
pub mod manager;

pub use error::*;
pub use manager::{DeploymentManager, ExecutionReport};
