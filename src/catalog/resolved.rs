//! Read-only catalog snapshot used by the query pipeline and mutation builder.

use crate::catalog::types::{FieldMapping, RelationInfo, RelationshipDescriptor, TableDescriptor};
use std::collections::HashMap;

/// Lookup contract the translator pipeline depends on. Results are a snapshot valid for one request.
pub trait SchemaCatalog: Send + Sync {
    /// Store schema holding every relation named by this catalog.
    fn schema(&self) -> &str;

    fn resolve_table_by_id(&self, id: &str) -> Option<&TableDescriptor>;

    fn resolve_table_by_name(&self, name: &str) -> Option<&TableDescriptor>;

    /// Zero or one relationship leaving `table_db_name.column`.
    fn relationship_from(&self, table_db_name: &str, column: &str) -> Option<&RelationshipDescriptor>;

    fn relation(&self, name: &str) -> Option<&RelationInfo>;

    /// Storage column for a payload field: the explicit mapping when one exists, else the field itself.
    fn storage_column<'a>(&'a self, table_db_name: &str, payload_field: &'a str) -> &'a str;
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    schema: String,
    tables: Vec<TableDescriptor>,
    relationships: Vec<RelationshipDescriptor>,
    field_mappings: Vec<FieldMapping>,
    relations: HashMap<String, RelationInfo>,
}

impl Catalog {
    pub fn new(
        schema: impl Into<String>,
        tables: Vec<TableDescriptor>,
        relationships: Vec<RelationshipDescriptor>,
        field_mappings: Vec<FieldMapping>,
        relations: Vec<RelationInfo>,
    ) -> Self {
        Catalog {
            schema: schema.into(),
            tables,
            relationships,
            field_mappings,
            relations: relations.into_iter().map(|r| (r.name.clone(), r)).collect(),
        }
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    pub fn relationships(&self) -> &[RelationshipDescriptor] {
        &self.relationships
    }

    pub fn field_mappings(&self) -> &[FieldMapping] {
        &self.field_mappings
    }
}

impl SchemaCatalog for Catalog {
    fn schema(&self) -> &str {
        &self.schema
    }

    fn resolve_table_by_id(&self, id: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.id == id)
    }

    fn resolve_table_by_name(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.table_name == name)
    }

    fn relationship_from(&self, table_db_name: &str, column: &str) -> Option<&RelationshipDescriptor> {
        self.relationships
            .iter()
            .find(|r| r.table_left == table_db_name && r.table_left_on == column)
    }

    fn relation(&self, name: &str) -> Option<&RelationInfo> {
        self.relations.get(name)
    }

    fn storage_column<'a>(&'a self, table_db_name: &str, payload_field: &'a str) -> &'a str {
        self.field_mappings
            .iter()
            .find(|m| m.table_db_name == table_db_name && m.payload_field == payload_field)
            .map(|m| m.storage_column.as_str())
            .unwrap_or(payload_field)
    }
}
