pub mod error;
pub mod interface;
pub mod registry;

pub use error::*;
pub use interface::*;
pub use registry::*;
