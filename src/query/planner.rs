//! Join planning: resolve `$expand` against the relationship catalog and build the SELECT plus
//! the result shape.

use crate::catalog::{RelationInfo, SchemaCatalog, TableDescriptor, ID_COLUMN};
use crate::error::{AppError, CatalogError};
use crate::query::params::{JoinColumn, QueryRequest, SELECT};
use crate::query::shape::{OutputField, ResultShape, SubField};
use crate::sql::{ColumnRef, Join, Select, SelectExpr};
use serde::Serialize;
use serde_json::{Map, Value};

/// Hidden alias carrying the base row key when rows must be grouped.
pub const ROW_KEY_ALIAS: &str = "#row";

/// Where an expand column leads.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JoinTarget {
    pub table: String,
    pub table_pk: String,
    pub is_multi: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedJoin {
    /// Expand column; also the SQL alias of the joined lookup relation.
    pub expand: String,
    pub target: JoinTarget,
}

#[derive(Clone, Debug)]
pub struct JoinPlan {
    pub base_table: String,
    pub joins: Vec<PlannedJoin>,
    pub select: Select,
    pub shape: ResultShape,
}

impl JoinPlan {
    pub fn join_for(&self, expand: &str) -> Option<&PlannedJoin> {
        self.joins.iter().find(|j| j.expand == expand)
    }

    /// `{ expandCol: { table, table_pk, is_multi } }` for diagnostics.
    pub fn joins_json(&self) -> Value {
        let mut m = Map::new();
        for j in &self.joins {
            m.insert(
                j.expand.clone(),
                serde_json::to_value(&j.target).unwrap_or(Value::Null),
            );
        }
        Value::Object(m)
    }
}

fn marker_alias(expand: &str) -> String {
    format!("{}#key", expand)
}

fn link_alias(expand: &str) -> String {
    format!("{}__link", expand)
}

pub(crate) fn relation_of<'a>(catalog: &'a dyn SchemaCatalog, name: &str) -> Result<&'a RelationInfo, AppError> {
    catalog
        .relation(name)
        .ok_or_else(|| AppError::Catalog(CatalogError::MissingRelation(name.to_string())))
}

fn base_column(relation: &RelationInfo, column: &str) -> Result<SelectExpr, AppError> {
    let info = relation.column(column).ok_or_else(|| {
        AppError::invalid_parameter(SELECT, format!("column '{}' does not exist on this list", column))
    })?;
    Ok(SelectExpr {
        column: ColumnRef::new(&relation.name, &info.name),
        read_cast: info.read_cast,
        alias: info.name.clone(),
    })
}

fn join_column(lookup: &RelationInfo, jc: &JoinColumn) -> Result<SelectExpr, AppError> {
    let info = lookup.column(&jc.target).ok_or_else(|| {
        AppError::invalid_parameter(
            SELECT,
            format!("column '{}' does not exist on the list behind '{}'", jc.target, jc.expand),
        )
    })?;
    Ok(SelectExpr {
        column: ColumnRef::new(&jc.expand, &info.name),
        read_cast: info.read_cast,
        alias: jc.alias(),
    })
}

/// Plan the read of `table`. The returned SELECT has no WHERE clause yet; the filter translator
/// resolves columns against this plan and fills it in.
pub fn plan(
    catalog: &dyn SchemaCatalog,
    table: &TableDescriptor,
    request: &QueryRequest,
) -> Result<JoinPlan, AppError> {
    let base_name = table.table_db_name.as_str();
    let base = relation_of(catalog, base_name)?;

    let mut joins = Vec::new();
    let mut sql_joins = Vec::new();
    for expand in &request.expand_cols {
        let rel = catalog
            .relationship_from(base_name, expand)
            .ok_or_else(|| AppError::UnknownRelationship(expand.clone()))?;
        let right = ColumnRef::new(expand, &rel.table_lookup_on);
        if rel.is_multi {
            let link = link_alias(expand);
            sql_joins.push(Join {
                table: rel.junction_relation(),
                alias: link.clone(),
                left: ColumnRef::new(base_name, ID_COLUMN),
                right: ColumnRef::new(&link, rel.junction_left_column()),
            });
            sql_joins.push(Join {
                table: rel.table_lookup.clone(),
                alias: expand.clone(),
                left: ColumnRef::new(&link, rel.junction_lookup_column()),
                right,
            });
        } else {
            sql_joins.push(Join {
                table: rel.table_lookup.clone(),
                alias: expand.clone(),
                left: ColumnRef::new(base_name, &rel.table_left_on),
                right,
            });
        }
        joins.push(PlannedJoin {
            expand: expand.clone(),
            target: JoinTarget {
                table: rel.table_lookup.clone(),
                table_pk: rel.table_lookup_on.clone(),
                is_multi: rel.is_multi,
            },
        });
    }

    // Expanded columns are represented by their nested value, never by the raw key.
    let main: Vec<&str> = if request.main_cols.is_empty() {
        base.columns.iter().map(|c| c.name.as_str()).collect()
    } else {
        request.main_cols.iter().map(String::as_str).collect()
    };
    let mut columns = Vec::new();
    let mut fields = Vec::new();
    for col in main {
        let expr = base_column(base, col)?;
        if request.expand_cols.iter().any(|e| e == col) {
            continue;
        }
        fields.push(OutputField::Scalar { key: expr.alias.clone() });
        columns.push(expr);
    }

    let mut has_array = false;
    for j in &joins {
        let lookup = relation_of(catalog, &j.target.table)?;
        let mut subs = Vec::new();
        for jc in request.join_cols_for(&j.expand) {
            let expr = join_column(lookup, jc)?;
            subs.push(SubField {
                name: jc.target.clone(),
                alias: expr.alias.clone(),
            });
            columns.push(expr);
        }
        if j.target.is_multi {
            has_array = true;
            let marker = marker_alias(&j.expand);
            columns.push(SelectExpr {
                column: ColumnRef::new(&j.expand, &j.target.table_pk),
                read_cast: None,
                alias: marker.clone(),
            });
            fields.push(OutputField::Array {
                key: j.expand.clone(),
                fields: subs,
                marker,
            });
        } else {
            fields.push(OutputField::Nested {
                key: j.expand.clone(),
                fields: subs,
            });
        }
    }

    let row_key = if has_array {
        columns.push(SelectExpr {
            column: ColumnRef::new(base_name, ID_COLUMN),
            read_cast: None,
            alias: ROW_KEY_ALIAS.to_string(),
        });
        Some(ROW_KEY_ALIAS.to_string())
    } else {
        None
    };

    Ok(JoinPlan {
        base_table: base_name.to_string(),
        joins,
        select: Select {
            schema: catalog.schema().to_string(),
            table: base_name.to_string(),
            columns,
            joins: sql_joins,
            filter: None,
            order_by: Some(ColumnRef::new(base_name, ID_COLUMN)),
        },
        shape: ResultShape { fields, row_key },
    })
}
