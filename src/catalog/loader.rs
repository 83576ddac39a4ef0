//! Load the catalog snapshot from the `_sys_*` relations and `information_schema`.

use crate::catalog::types::{ColumnInfo, FieldMapping, RelationInfo, RelationshipDescriptor, TableDescriptor};
use crate::catalog::{validate, Catalog};
use crate::error::CatalogError;
use crate::store::qualified_sys_table;
use sqlx::PgPool;

/// Load and validate the catalog for `schema`. Catalog relations must already exist (ensure_sys_tables).
pub async fn load_from_pool(pool: &PgPool, schema: &str) -> Result<Catalog, CatalogError> {
    let sql = format!(
        "SELECT id, table_name, table_db_name FROM {} ORDER BY id",
        qualified_sys_table(schema, "_sys_tables")
    );
    tracing::debug!(sql = %sql, "query");
    let tables = sqlx::query_as::<_, (String, String, String)>(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| CatalogError::Load(e.to_string()))?
        .into_iter()
        .map(|(id, table_name, table_db_name)| TableDescriptor {
            id,
            table_name,
            table_db_name,
        })
        .collect::<Vec<_>>();

    let sql = format!(
        "SELECT table_left, table_left_on, table_lookup, table_lookup_on, is_multi FROM {} ORDER BY table_left, table_left_on",
        qualified_sys_table(schema, "_sys_relationships")
    );
    tracing::debug!(sql = %sql, "query");
    let relationships = sqlx::query_as::<_, (String, String, String, String, bool)>(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| CatalogError::Load(e.to_string()))?
        .into_iter()
        .map(
            |(table_left, table_left_on, table_lookup, table_lookup_on, is_multi)| RelationshipDescriptor {
                table_left,
                table_left_on,
                table_lookup,
                table_lookup_on,
                is_multi,
            },
        )
        .collect::<Vec<_>>();

    let sql = format!(
        "SELECT table_db_name, payload_field, storage_column FROM {} ORDER BY table_db_name, payload_field",
        qualified_sys_table(schema, "_sys_field_mappings")
    );
    tracing::debug!(sql = %sql, "query");
    let field_mappings = sqlx::query_as::<_, (String, String, String)>(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| CatalogError::Load(e.to_string()))?
        .into_iter()
        .map(|(table_db_name, payload_field, storage_column)| FieldMapping {
            table_db_name,
            payload_field,
            storage_column,
        })
        .collect::<Vec<_>>();

    let sql = "SELECT table_name::text, column_name::text, data_type::text FROM information_schema.columns \
               WHERE table_schema = $1 ORDER BY table_name, ordinal_position";
    tracing::debug!(sql = %sql, schema = %schema, "query");
    let columns = sqlx::query_as::<_, (String, String, String)>(sql)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| CatalogError::Load(e.to_string()))?;
    let relations = group_columns(columns);

    let catalog = Catalog::new(schema, tables, relationships, field_mappings, relations);
    validate(&catalog)?;
    tracing::info!(
        schema = %schema,
        lists = catalog.tables().len(),
        relationships = catalog.relationships().len(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Rows arrive ordered by relation then ordinal position; fold consecutive rows into relations.
fn group_columns(rows: Vec<(String, String, String)>) -> Vec<RelationInfo> {
    let mut out: Vec<RelationInfo> = Vec::new();
    for (relation, column, data_type) in rows {
        let info = ColumnInfo::from_data_type(&column, &data_type);
        match out.last_mut() {
            Some(last) if last.name == relation => last.columns.push(info),
            _ => out.push(RelationInfo::new(relation, vec![info])),
        }
    }
    out
}
