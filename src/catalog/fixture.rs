//! Small objectives/key-results catalog shared by unit tests.

use crate::catalog::{Catalog, ColumnInfo, FieldMapping, RelationInfo, RelationshipDescriptor, TableDescriptor};

fn relation(name: &str, columns: &[(&str, &str)]) -> RelationInfo {
    RelationInfo::new(
        name,
        columns
            .iter()
            .map(|(c, t)| ColumnInfo::from_data_type(c, t))
            .collect(),
    )
}

fn table(id: &str, name: &str, db_name: &str) -> TableDescriptor {
    TableDescriptor {
        id: id.into(),
        table_name: name.into(),
        table_db_name: db_name.into(),
    }
}

fn rel(left: &str, on: &str, lookup: &str, multi: bool) -> RelationshipDescriptor {
    RelationshipDescriptor {
        table_left: left.into(),
        table_left_on: on.into(),
        table_lookup: lookup.into(),
        table_lookup_on: "Id".into(),
        is_multi: multi,
    }
}

pub(crate) fn okr_catalog() -> Catalog {
    Catalog::new(
        "public",
        vec![
            table("obj-guid", "Objectives", "objectives"),
            table("kr-guid", "Key Results", "keyresults"),
            table("users-guid", "Users", "users"),
            table("tags-guid", "Tags", "tags"),
        ],
        vec![
            rel("keyresults", "parentObjective", "objectives", false),
            rel("keyresults", "owner", "users", false),
            rel("keyresults", "tags", "tags", true),
            rel("objectives", "owner", "users", false),
        ],
        vec![FieldMapping {
            table_db_name: "keyresults".into(),
            payload_field: "parentObjectiveId".into(),
            storage_column: "parentObjective".into(),
        }],
        vec![
            relation(
                "objectives",
                &[("Id", "integer"), ("Title", "text"), ("owner", "integer"), ("team", "text")],
            ),
            relation(
                "keyresults",
                &[
                    ("Id", "integer"),
                    ("Title", "text"),
                    ("minValue", "integer"),
                    ("maxValue", "integer"),
                    ("currentValue", "numeric"),
                    ("parentObjective", "integer"),
                    ("owner", "integer"),
                    ("due", "date"),
                    ("done", "boolean"),
                ],
            ),
            relation(
                "users",
                &[("Id", "integer"), ("Title", "text"), ("status", "text"), ("email", "text")],
            ),
            relation("tags", &[("Id", "integer"), ("Title", "text")]),
            relation("keyresults_tags", &[("keyresults_pk", "integer"), ("tags_pk", "integer")]),
        ],
    )
}
