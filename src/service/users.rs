//! Simulated site users. They live in a plain relation (`rpusers` unless configured) that is read
//! through the item pipeline without being registered as a list.

use crate::catalog::{SchemaCatalog, TableDescriptor};
use crate::error::AppError;
use crate::response::ItemsBody;
use crate::service::ItemService;
use crate::store::ListStore;
use serde_json::Value;

pub const DEFAULT_USERS_RELATION: &str = "rpusers";
pub const DEFAULT_CURRENT_USER_ID: &str = "1";

/// Where users are stored and which one is "current".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDirectory {
    pub relation: String,
    pub current_user_id: String,
}

impl Default for UserDirectory {
    fn default() -> Self {
        UserDirectory::new(DEFAULT_USERS_RELATION, DEFAULT_CURRENT_USER_ID)
    }
}

impl UserDirectory {
    pub fn new(relation: impl Into<String>, current_user_id: impl Into<String>) -> Self {
        UserDirectory {
            relation: relation.into(),
            current_user_id: current_user_id.into(),
        }
    }

    /// The users relation addressed as a list; missing relation is a missing list.
    pub fn table(&self, catalog: &dyn SchemaCatalog) -> Result<TableDescriptor, AppError> {
        if catalog.relation(&self.relation).is_none() {
            return Err(AppError::ListNotFound(self.relation.clone()));
        }
        Ok(TableDescriptor {
            id: self.relation.clone(),
            table_name: self.relation.clone(),
            table_db_name: self.relation.clone(),
        })
    }
}

pub struct UserService<'a> {
    catalog: &'a dyn SchemaCatalog,
    items: ItemService<'a>,
    directory: &'a UserDirectory,
}

impl<'a> UserService<'a> {
    pub fn new(catalog: &'a dyn SchemaCatalog, store: &'a dyn ListStore, directory: &'a UserDirectory) -> Self {
        UserService {
            catalog,
            items: ItemService::new(catalog, store),
            directory,
        }
    }

    /// `web/SiteUsers`: every user, with the same `$select`/`$filter`/`$expand`/`$top` handling as list items.
    pub async fn site_users(&self, pairs: &[(String, String)]) -> Result<ItemsBody, AppError> {
        let table = self.directory.table(self.catalog)?;
        let mut body = self.items.read_table(&table, pairs).await?;
        body.list_title = Some(table.table_name);
        Ok(body)
    }

    /// `web/getuserbyid('{id}')`
    pub async fn by_id(&self, raw_id: &str) -> Result<Value, AppError> {
        let table = self.directory.table(self.catalog)?;
        self.items.read_one_in(&table, &table.table_name, raw_id).await
    }

    /// `web/currentUser`
    pub async fn current(&self) -> Result<Value, AppError> {
        self.by_id(&self.directory.current_user_id).await
    }
}
