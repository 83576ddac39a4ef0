//! Catalog rows as stored in the `_sys_*` relations, plus column metadata from `information_schema`.

use serde::{Deserialize, Serialize};

/// One logical list backed by one relation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub id: String,
    pub table_name: String,
    pub table_db_name: String,
}

/// Directed edge from an owning table's column to a lookup relation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    pub table_left: String,
    pub table_left_on: String,
    pub table_lookup: String,
    pub table_lookup_on: String,
    #[serde(default)]
    pub is_multi: bool,
}

impl RelationshipDescriptor {
    /// Junction relation realizing a multi-valued relationship: `{left}_{lookup}`.
    pub fn junction_relation(&self) -> String {
        format!("{}_{}", self.table_left, self.table_lookup)
    }

    /// Junction column referencing the owning row's `Id`.
    pub fn junction_left_column(&self) -> String {
        format!("{}_pk", self.table_left)
    }

    /// Junction column referencing the lookup row.
    pub fn junction_lookup_column(&self) -> String {
        format!("{}_pk", self.table_lookup)
    }
}

/// Explicit payload field to storage column mapping for one relation (e.g. `parentKrId` -> `parentKr`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub table_db_name: String,
    pub payload_field: String,
    pub storage_column: String,
}

/// Coarse classification of a PostgreSQL column type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
    Temporal,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: ColumnType,
    /// PostgreSQL type name for placeholder casts (e.g. "integer") when binding values.
    pub cast: Option<String>,
    /// Cast applied when reading, for types sqlx cannot decode into JSON directly (numeric, enums).
    pub read_cast: Option<&'static str>,
}

impl ColumnInfo {
    /// Build from an `information_schema.columns.data_type` value.
    pub fn from_data_type(name: &str, data_type: &str) -> Self {
        let lower = data_type.to_lowercase();
        let (column_type, cast, read_cast): (ColumnType, Option<&str>, Option<&'static str>) = match lower.as_str() {
            "smallint" | "integer" | "bigint" => (ColumnType::Integer, Some(lower.as_str()), None),
            "real" | "double precision" => (ColumnType::Float, Some(lower.as_str()), None),
            "numeric" | "decimal" => (ColumnType::Float, Some("numeric"), Some("float8")),
            "boolean" => (ColumnType::Boolean, Some("boolean"), None),
            "text" | "character varying" | "character" | "varchar" | "char" => (ColumnType::Text, Some("text"), None),
            "date" => (ColumnType::Temporal, Some("date"), None),
            "timestamp without time zone" | "timestamp" => (ColumnType::Temporal, Some("timestamp"), None),
            "timestamp with time zone" | "timestamptz" => (ColumnType::Temporal, Some("timestamptz"), None),
            "uuid" => (ColumnType::Other, Some("uuid"), None),
            "json" | "jsonb" => (ColumnType::Other, Some(lower.as_str()), None),
            // enums and other user-defined types are read back as text
            "user-defined" => (ColumnType::Text, None, Some("text")),
            _ => (ColumnType::Other, None, None),
        };
        ColumnInfo {
            name: name.to_string(),
            column_type,
            cast: cast.map(str::to_string),
            read_cast,
        }
    }
}

/// A relation in the store schema with its columns in ordinal order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl RelationInfo {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        RelationInfo {
            name: name.into(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_information_schema_types() {
        let c = ColumnInfo::from_data_type("minValue", "integer");
        assert_eq!(c.column_type, ColumnType::Integer);
        assert_eq!(c.cast.as_deref(), Some("integer"));
        assert!(c.read_cast.is_none());

        let c = ColumnInfo::from_data_type("ratio", "numeric");
        assert_eq!(c.column_type, ColumnType::Float);
        assert_eq!(c.read_cast, Some("float8"));

        let c = ColumnInfo::from_data_type("Title", "character varying");
        assert_eq!(c.column_type, ColumnType::Text);
        assert_eq!(c.cast.as_deref(), Some("text"));

        let c = ColumnInfo::from_data_type("status", "USER-DEFINED");
        assert_eq!(c.cast, None);
        assert_eq!(c.read_cast, Some("text"));
    }

    #[test]
    fn junction_naming_follows_left_lookup_convention() {
        let r = RelationshipDescriptor {
            table_left: "keyresults".into(),
            table_left_on: "tags".into(),
            table_lookup: "tags".into(),
            table_lookup_on: "Id".into(),
            is_multi: true,
        };
        assert_eq!(r.junction_relation(), "keyresults_tags");
        assert_eq!(r.junction_left_column(), "keyresults_pk");
        assert_eq!(r.junction_lookup_column(), "tags_pk");
    }
}
