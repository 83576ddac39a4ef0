//! RavenPoint: a SharePoint-style list/item REST dialect over PostgreSQL.
//!
//! `$select` / `$filter` / `$expand` requests are planned against a catalog of lists and
//! relationships, rendered to parameterized SQL, and the joined rows reshaped into nested items.

pub mod case;
pub mod catalog;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use catalog::{load_from_pool, validate, Catalog, SchemaCatalog};
pub use error::{AppError, CatalogError};
pub use routes::{app, common_routes, list_routes, API_PREFIX};
pub use service::{ItemService, ListKey, MutationService};
pub use settings::Settings;
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_sys_tables, ListStore, PgStore};
