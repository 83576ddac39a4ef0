//! Create/update/delete: payload validation against the catalog, statement building, execution.

use crate::catalog::{ColumnInfo, RelationInfo, SchemaCatalog, TableDescriptor, ID_COLUMN};
use crate::error::AppError;
use crate::query::planner::relation_of;
use crate::response::MutationBody;
use crate::service::metadata::entity_type_full_name;
use crate::service::ListKey;
use crate::sql::{self, Assignment, QueryBuf};
use crate::store::ListStore;
use serde_json::{Map, Value};

/// Payload key carrying the SharePoint entity type; never written.
pub const METADATA_KEY: &str = "__metadata";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    /// Update and delete address an existing item; matching nothing is "item not found".
    pub fn requires_match(&self) -> bool {
        !matches!(self, MutationKind::Create)
    }
}

/// One statement ready for [`ListStore::apply`].
#[derive(Clone, Debug, PartialEq)]
pub struct Mutation {
    pub kind: MutationKind,
    pub table: String,
    pub statement: QueryBuf,
}

/// Parse an item id according to the list's `Id` column type.
pub(crate) fn parse_item_id(relation: &RelationInfo, raw: &str) -> Result<Value, AppError> {
    let raw = raw.trim();
    match relation.column(ID_COLUMN) {
        Some(column) => column
            .parse_text(raw)
            .map_err(|m| AppError::invalid_parameter(ID_COLUMN, format!("{} as an item id", m))),
        None => Ok(Value::String(raw.to_string())),
    }
}

pub(crate) fn id_cast(relation: &RelationInfo) -> Option<&str> {
    relation.column(ID_COLUMN).and_then(|c| c.cast.as_deref())
}

/// Builds statements for one list. Pure: nothing here touches the store.
pub struct MutationBuilder<'a> {
    catalog: &'a dyn SchemaCatalog,
    table: &'a TableDescriptor,
    relation: &'a RelationInfo,
}

impl<'a> MutationBuilder<'a> {
    pub fn new(catalog: &'a dyn SchemaCatalog, table: &'a TableDescriptor) -> Result<Self, AppError> {
        let relation = relation_of(catalog, &table.table_db_name)?;
        Ok(MutationBuilder {
            catalog,
            table,
            relation,
        })
    }

    fn payload_object<'p>(&self, payload: &'p Value) -> Result<&'p Map<String, Value>, AppError> {
        let obj = payload
            .as_object()
            .ok_or_else(|| AppError::InvalidMutation("payload must be a JSON object".into()))?;
        if let Some(t) = obj.get(METADATA_KEY).and_then(|m| m.get("type")) {
            let expected = entity_type_full_name(&self.table.table_db_name);
            if t.as_str() != Some(expected.as_str()) {
                return Err(AppError::InvalidMutation(format!(
                    "__metadata.type must be '{}', got {}",
                    expected, t
                )));
            }
        }
        Ok(obj)
    }

    fn bind_value(column: &ColumnInfo, field: &str, value: &Value) -> Result<Value, AppError> {
        column
            .payload_value(value)
            .map_err(|m| AppError::InvalidMutation(format!("field '{}': {}", field, m)))
    }

    fn assignments(&self, payload: &Map<String, Value>) -> Result<Vec<Assignment>, AppError> {
        let mut out: Vec<Assignment> = Vec::new();
        for (field, value) in payload {
            if field == ID_COLUMN || field == METADATA_KEY {
                continue;
            }
            let storage = self.catalog.storage_column(&self.table.table_db_name, field);
            let column = self.relation.column(storage).ok_or_else(|| {
                AppError::InvalidMutation(format!(
                    "field '{}' does not match any column of list '{}'",
                    field, self.table.table_name
                ))
            })?;
            if out.iter().any(|a| a.column == column.name) {
                return Err(AppError::InvalidMutation(format!(
                    "column '{}' is set more than once",
                    column.name
                )));
            }
            out.push(Assignment {
                column: column.name.clone(),
                value: Self::bind_value(column, field, value)?,
                cast: column.cast.clone(),
            });
        }
        Ok(out)
    }

    fn mutation(&self, kind: MutationKind, statement: QueryBuf) -> Mutation {
        Mutation {
            kind,
            table: self.table.table_db_name.clone(),
            statement,
        }
    }

    pub fn parse_id(&self, raw: &str) -> Result<Value, AppError> {
        parse_item_id(self.relation, raw)
    }

    pub fn create(&self, payload: &Value) -> Result<Mutation, AppError> {
        let obj = self.payload_object(payload)?;
        let assignments = self.assignments(obj)?;
        let q = sql::insert(self.catalog.schema(), &self.table.table_db_name, &assignments, ID_COLUMN);
        Ok(self.mutation(MutationKind::Create, q))
    }

    pub fn update(&self, id: &Value, payload: &Value) -> Result<Mutation, AppError> {
        let obj = self.payload_object(payload)?;
        let assignments = self.assignments(obj)?;
        if assignments.is_empty() {
            return Err(AppError::InvalidMutation("no fields to update".into()));
        }
        let q = sql::update(
            self.catalog.schema(),
            &self.table.table_db_name,
            &assignments,
            ID_COLUMN,
            id,
            id_cast(self.relation),
        );
        Ok(self.mutation(MutationKind::Update, q))
    }

    pub fn delete(&self, id: &Value) -> Result<Mutation, AppError> {
        let q = sql::delete(
            self.catalog.schema(),
            &self.table.table_db_name,
            ID_COLUMN,
            id,
            id_cast(self.relation),
        );
        Ok(self.mutation(MutationKind::Delete, q))
    }
}

/// `{ Id, ...payload }` with the payload's own `Id` dropped.
fn echo(id: Value, payload: &Value) -> Value {
    let mut d = Map::new();
    d.insert(ID_COLUMN.to_string(), id);
    if let Some(obj) = payload.as_object() {
        for (k, v) in obj {
            if k != ID_COLUMN {
                d.insert(k.clone(), v.clone());
            }
        }
    }
    Value::Object(d)
}

pub struct MutationService<'a> {
    catalog: &'a dyn SchemaCatalog,
    store: &'a dyn ListStore,
}

impl<'a> MutationService<'a> {
    pub fn new(catalog: &'a dyn SchemaCatalog, store: &'a dyn ListStore) -> Self {
        MutationService { catalog, store }
    }

    fn not_found(list: &ListKey, id: &Value) -> AppError {
        AppError::ItemNotFound {
            list: list.as_str().to_string(),
            id: match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }

    pub async fn create(&self, list: &ListKey, payload: &Value) -> Result<MutationBody, AppError> {
        let table = list.resolve(self.catalog)?;
        let m = MutationBuilder::new(self.catalog, table)?.create(payload)?;
        let ids = self.store.apply(&m).await?;
        let id = ids.into_iter().next().unwrap_or(Value::Null);
        tracing::info!(list = %table.table_db_name, id = %id, "item created");
        Ok(MutationBody {
            d: echo(id, payload),
            message: "Successfully added item.".to_string(),
        })
    }

    pub async fn update(&self, list: &ListKey, raw_id: &str, payload: &Value) -> Result<MutationBody, AppError> {
        let table = list.resolve(self.catalog)?;
        let builder = MutationBuilder::new(self.catalog, table)?;
        let id = builder.parse_id(raw_id)?;
        let m = builder.update(&id, payload)?;
        if self.store.apply(&m).await?.is_empty() {
            return Err(Self::not_found(list, &id));
        }
        tracing::info!(list = %table.table_db_name, id = %id, "item updated");
        Ok(MutationBody {
            message: format!("Successfully updated item {}", raw_id.trim()),
            d: echo(id, payload),
        })
    }

    pub async fn delete(&self, list: &ListKey, raw_id: &str) -> Result<MutationBody, AppError> {
        let table = list.resolve(self.catalog)?;
        let builder = MutationBuilder::new(self.catalog, table)?;
        let id = builder.parse_id(raw_id)?;
        let m = builder.delete(&id)?;
        if self.store.apply(&m).await?.is_empty() {
            return Err(Self::not_found(list, &id));
        }
        tracing::info!(list = %table.table_db_name, id = %id, "item deleted");
        Ok(MutationBody {
            message: format!("Successfully deleted item {}", raw_id.trim()),
            d: echo(id, &Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixture::okr_catalog;
    use crate::catalog::Catalog;
    use serde_json::json;

    fn builder(catalog: &Catalog) -> MutationBuilder<'_> {
        let table = catalog.resolve_table_by_id("kr-guid").unwrap();
        MutationBuilder::new(catalog, table).unwrap()
    }

    #[test]
    fn create_skips_reserved_keys_and_maps_fields() {
        let catalog = okr_catalog();
        let m = builder(&catalog)
            .create(&json!({
                "__metadata": {"type": "SP.Data.KeyresultsListItem"},
                "Id": 99,
                "Title": "T",
                "minValue": "0",
                "parentObjectiveId": 4
            }))
            .unwrap();
        assert_eq!(m.kind, MutationKind::Create);
        assert_eq!(
            m.statement.sql,
            "INSERT INTO \"public\".\"keyresults\" (\"Title\", \"minValue\", \"parentObjective\") \
             VALUES ($1::text, $2::integer, $3::integer) RETURNING \"Id\""
        );
        assert_eq!(m.statement.params, vec![json!("T"), json!(0), json!(4)]);
    }

    #[test]
    fn unmapped_id_suffix_is_not_stripped() {
        let catalog = okr_catalog();
        let err = builder(&catalog).create(&json!({"ownerId": 1})).unwrap_err();
        assert!(matches!(err, AppError::InvalidMutation(m) if m.contains("ownerId")));
    }

    #[test]
    fn wrong_entity_type_is_rejected() {
        let catalog = okr_catalog();
        let err = builder(&catalog)
            .create(&json!({"__metadata": {"type": "SP.Data.UsersListItem"}, "Title": "x"}))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidMutation(_)));
    }

    #[test]
    fn numeric_columns_reject_non_numbers() {
        let catalog = okr_catalog();
        let err = builder(&catalog).create(&json!({"minValue": "lots"})).unwrap_err();
        assert!(matches!(err, AppError::InvalidMutation(_)));
        let err = builder(&catalog).create(&json!({"minValue": [1]})).unwrap_err();
        assert!(matches!(err, AppError::InvalidMutation(_)));
    }

    #[test]
    fn integer_columns_refuse_lossy_values() {
        let catalog = okr_catalog();
        for payload in [
            json!({"Title": "frac", "minValue": 2.5}),
            json!({"minValue": "2.5"}),
            json!({"minValue": 3_000_000_000i64}),
            json!({"due": "notadate"}),
            json!({"done": "maybe"}),
        ] {
            let err = builder(&catalog).create(&payload).unwrap_err();
            assert!(matches!(err, AppError::InvalidMutation(_)), "{} -> {:?}", payload, err);
        }
        let m = builder(&catalog)
            .create(&json!({"minValue": -3, "due": "2024-06-30", "done": false}))
            .unwrap();
        assert_eq!(m.statement.params, vec![json!(-3), json!("2024-06-30"), json!(false)]);
    }

    #[test]
    fn out_of_range_item_id_is_invalid() {
        let catalog = okr_catalog();
        let b = builder(&catalog);
        assert!(matches!(b.parse_id("4294967296"), Err(AppError::InvalidParameter { .. })));
        assert!(matches!(b.parse_id("1.5"), Err(AppError::InvalidParameter { .. })));
    }

    #[test]
    fn field_and_mapped_field_cannot_both_be_set() {
        let catalog = okr_catalog();
        let err = builder(&catalog)
            .create(&json!({"parentObjective": 1, "parentObjectiveId": 2}))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidMutation(_)));
    }

    #[test]
    fn update_and_delete_are_keyed_by_typed_id() {
        let catalog = okr_catalog();
        let b = builder(&catalog);
        let id = b.parse_id(" 7 ").unwrap();
        assert_eq!(id, json!(7));
        let m = b.update(&id, &json!({"maxValue": 10})).unwrap();
        assert!(m.kind.requires_match());
        assert_eq!(
            m.statement.sql,
            "UPDATE \"public\".\"keyresults\" SET \"maxValue\" = $1::integer WHERE \"Id\" = $2::integer RETURNING \"Id\""
        );
        let m = b.delete(&id).unwrap();
        assert_eq!(m.statement.params, vec![json!(7)]);

        assert!(matches!(b.parse_id("abc"), Err(AppError::InvalidParameter { .. })));
        assert!(matches!(b.update(&id, &json!({"Id": 7})), Err(AppError::InvalidMutation(_))));
    }
}
