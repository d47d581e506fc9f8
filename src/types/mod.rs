pub mod deployment;
pub mod env_vars;
pub mod environment;
pub mod resource;
pub mod secret;
pub mod service;

pub use deployment::*;
pub use env_vars::*;
pub use environment::*;
pub use resource::*;
pub use secret::*;
pub use service::*;
