//! Catalog validation: uniqueness and referential integrity against the store schema.

use crate::catalog::{Catalog, SchemaCatalog};
use crate::error::CatalogError;
use std::collections::HashSet;

/// Primary key column every list relation must carry.
pub const ID_COLUMN: &str = "Id";

fn require_column(catalog: &Catalog, relation: &str, column: &str) -> Result<(), CatalogError> {
    let rel = catalog
        .relation(relation)
        .ok_or_else(|| CatalogError::MissingRelation(relation.to_string()))?;
    if rel.column(column).is_none() {
        return Err(CatalogError::MissingColumn {
            relation: relation.to_string(),
            column: column.to_string(),
        });
    }
    Ok(())
}

pub fn validate(catalog: &Catalog) -> Result<(), CatalogError> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for t in catalog.tables() {
        if !ids.insert(t.id.as_str()) {
            return Err(CatalogError::DuplicateList {
                kind: "id",
                value: t.id.clone(),
            });
        }
        if !names.insert(t.table_name.as_str()) {
            return Err(CatalogError::DuplicateList {
                kind: "table_name",
                value: t.table_name.clone(),
            });
        }
        require_column(catalog, &t.table_db_name, ID_COLUMN)?;
    }

    let mut edges = HashSet::new();
    for r in catalog.relationships() {
        if !edges.insert((r.table_left.as_str(), r.table_left_on.as_str())) {
            return Err(CatalogError::DuplicateRelationship {
                table: r.table_left.clone(),
                column: r.table_left_on.clone(),
            });
        }
        require_column(catalog, &r.table_lookup, &r.table_lookup_on)?;
        if r.is_multi {
            require_column(catalog, &r.table_left, ID_COLUMN)?;
            let junction = r.junction_relation();
            require_column(catalog, &junction, &r.junction_left_column())?;
            require_column(catalog, &junction, &r.junction_lookup_column())?;
        } else {
            require_column(catalog, &r.table_left, &r.table_left_on)?;
        }
    }

    for m in catalog.field_mappings() {
        require_column(catalog, &m.table_db_name, &m.storage_column)?;
    }

    Ok(())
}
