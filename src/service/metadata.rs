//! List metadata reads.

use crate::case::to_pascal_case;
use crate::catalog::{SchemaCatalog, TableDescriptor};
use crate::error::AppError;
use crate::query::params::{check_keys, split_list, SELECT};
use crate::service::ListKey;
use serde::Serialize;
use serde_json::{Map, Value};

/// Properties a metadata `$select` may name.
pub const METADATA_PROPERTIES: [&str; 4] = ["Id", "table_name", "table_db_name", "ListItemEntityTypeFullName"];

/// `SP.Data.{PascalCase(table_db_name)}ListItem`
pub fn entity_type_full_name(table_db_name: &str) -> String {
    format!("SP.Data.{}ListItem", to_pascal_case(table_db_name))
}

#[allow(non_snake_case)]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListMetadata {
    pub Id: String,
    pub table_name: String,
    pub table_db_name: String,
    pub ListItemEntityTypeFullName: String,
}

impl From<&TableDescriptor> for ListMetadata {
    fn from(t: &TableDescriptor) -> Self {
        ListMetadata {
            Id: t.id.clone(),
            table_name: t.table_name.clone(),
            table_db_name: t.table_db_name.clone(),
            ListItemEntityTypeFullName: entity_type_full_name(&t.table_db_name),
        }
    }
}

/// Metadata of one list, optionally narrowed by `$select`. `Id` is always present.
pub fn list_metadata(
    catalog: &dyn SchemaCatalog,
    list: &ListKey,
    pairs: &[(String, String)],
) -> Result<Map<String, Value>, AppError> {
    check_keys(pairs, &[SELECT])?;
    let table = list.resolve(catalog)?;
    let full = match serde_json::to_value(ListMetadata::from(table)) {
        Ok(Value::Object(m)) => m,
        _ => Map::new(),
    };
    let wanted = pairs
        .iter()
        .find(|(k, _)| k == SELECT)
        .map(|(_, v)| split_list(v))
        .unwrap_or_default();
    if wanted.is_empty() {
        return Ok(full);
    }
    if let Some(bad) = wanted.iter().find(|p| !METADATA_PROPERTIES.contains(&p.as_str())) {
        return Err(AppError::invalid_parameter(
            SELECT,
            format!("'{}' is not a list property; use {}", bad, METADATA_PROPERTIES.join(", ")),
        ));
    }
    let mut out = Map::new();
    for key in std::iter::once("Id").chain(wanted.iter().map(String::as_str)) {
        if let Some(v) = full.get(key) {
            out.insert(key.to_string(), v.clone());
        }
    }
    Ok(out)
}
