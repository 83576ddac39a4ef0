//! How a request addresses a list: by catalog id or by display title.

use crate::catalog::{SchemaCatalog, TableDescriptor};
use crate::error::AppError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListKey {
    /// `Lists(guid'{id}')`
    Id(String),
    /// `lists/GetByTitle('{title}')`
    Title(String),
}

impl ListKey {
    pub fn as_str(&self) -> &str {
        match self {
            ListKey::Id(s) | ListKey::Title(s) => s,
        }
    }

    pub fn resolve<'a>(&self, catalog: &'a dyn SchemaCatalog) -> Result<&'a TableDescriptor, AppError> {
        let found = match self {
            ListKey::Id(id) => catalog.resolve_table_by_id(id),
            ListKey::Title(title) => catalog.resolve_table_by_name(title),
        };
        found.ok_or_else(|| AppError::ListNotFound(self.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixture::okr_catalog;

    #[test]
    fn resolves_by_id_or_title_only() {
        let catalog = okr_catalog();
        assert_eq!(ListKey::Id("users-guid".into()).resolve(&catalog).unwrap().table_db_name, "users");
        assert_eq!(ListKey::Title("Users".into()).resolve(&catalog).unwrap().table_db_name, "users");
        let err = ListKey::Title("users-guid".into()).resolve(&catalog).unwrap_err();
        assert!(matches!(err, AppError::ListNotFound(n) if n == "users-guid"));
    }
}
