//! List services: item reads, metadata, mutations and site users. Each takes the catalog snapshot and store explicitly.

pub mod items;
pub mod list;
pub mod metadata;
pub mod mutation;
pub mod users;

pub use items::{ItemService, PreparedRead};
pub use list::ListKey;
pub use metadata::{entity_type_full_name, list_metadata, ListMetadata};
pub use mutation::{Mutation, MutationBuilder, MutationKind, MutationService};
pub use users::{UserDirectory, UserService};
