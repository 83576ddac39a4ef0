//! SQL AST and its single renderer: identifiers from the catalog only, values as parameters.

pub mod ast;
mod builder;
pub mod params;
pub use ast::*;
pub use builder::*;
pub use params::*;
