//! Shared application state for all routes. The catalog snapshot is swapped on reload.

use crate::catalog::Catalog;
use crate::error::AppError;
use crate::service::UserDirectory;
use crate::store::ListStore;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ListStore>,
    /// Schema the catalog was loaded from; reloads read the same schema.
    pub schema: String,
    pub users: UserDirectory,
    catalog: Arc<RwLock<Arc<Catalog>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn ListStore>, schema: impl Into<String>, catalog: Catalog) -> Self {
        AppState {
            store,
            schema: schema.into(),
            users: UserDirectory::default(),
            catalog: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    pub fn with_users(mut self, users: UserDirectory) -> Self {
        self.users = users;
        self
    }

    /// Snapshot for one request. Reloads never change a snapshot already handed out.
    pub fn catalog(&self) -> Arc<Catalog> {
        let guard = self.catalog.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn replace_catalog(&self, catalog: Catalog) {
        let mut guard = self.catalog.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(catalog);
    }

    /// Load a fresh catalog from the store and swap it in. On failure the current snapshot stays.
    pub async fn reload_catalog(&self) -> Result<Arc<Catalog>, AppError> {
        let fresh = self.store.load_catalog(&self.schema).await?;
        tracing::info!(schema = %self.schema, lists = fresh.tables().len(), "catalog reloaded");
        self.replace_catalog(fresh);
        Ok(self.catalog())
    }
}
