pub mod envelope;
pub mod error;
pub mod generate;
pub mod keys;
pub mod session;
pub mod store;
pub mod vault;

pub use error::*;
pub use generate::*;
pub use keys::*;
pub use session::*;
pub use store::*;
pub use vault::*;
