pub mod types;
pub mod coerce;
pub mod loader;
pub mod validator;
pub mod resolved;

#[cfg(test)]
pub(crate) mod fixture;

pub use types::*;
pub use loader::*;
pub use validator::*;
pub use resolved::*;
