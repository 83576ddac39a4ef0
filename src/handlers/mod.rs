//! HTTP handlers for the list surface.

pub mod lists;
pub use lists::*;
