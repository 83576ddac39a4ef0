//! List item reads: parse, plan, filter, render, fetch, shape.

use crate::catalog::{SchemaCatalog, TableDescriptor, ID_COLUMN};
use crate::error::AppError;
use crate::query::{plan, translate, JoinPlan, QueryRequest};
use crate::query::planner::relation_of;
use crate::response::{Diagnostics, ItemsBody};
use crate::service::mutation::{id_cast, parse_item_id};
use crate::service::ListKey;
use crate::sql::{render_select, ColumnRef, CompareOp, Predicate, QueryBuf};
use crate::store::ListStore;
use serde_json::Value;

/// A planned read: the SQL to run and the plan whose shape applies to its rows.
#[derive(Debug)]
pub struct PreparedRead {
    pub query: QueryBuf,
    pub plan: JoinPlan,
}

pub struct ItemService<'a> {
    catalog: &'a dyn SchemaCatalog,
    store: &'a dyn ListStore,
}

impl<'a> ItemService<'a> {
    pub fn new(catalog: &'a dyn SchemaCatalog, store: &'a dyn ListStore) -> Self {
        ItemService { catalog, store }
    }

    /// Everything up to execution. Fails before any SQL exists when the request is invalid.
    pub fn prepare(&self, table: &TableDescriptor, request: &QueryRequest) -> Result<PreparedRead, AppError> {
        let mut plan = plan(self.catalog, table, request)?;
        if let Some(ref f) = request.filter_query {
            let filter = translate(f, &plan, self.catalog)?;
            plan.select.filter = filter;
        }
        let query = render_select(&plan.select);
        Ok(PreparedRead { query, plan })
    }

    pub async fn read(&self, list: &ListKey, pairs: &[(String, String)]) -> Result<ItemsBody, AppError> {
        let table = list.resolve(self.catalog)?;
        let mut body = self.read_table(table, pairs).await?;
        match list {
            ListKey::Id(id) => body.list_id = Some(id.clone()),
            ListKey::Title(title) => body.list_title = Some(title.clone()),
        }
        Ok(body)
    }

    /// Items of `table` with neither `listId` nor `listTitle` set.
    pub async fn read_table(&self, table: &TableDescriptor, pairs: &[(String, String)]) -> Result<ItemsBody, AppError> {
        let request = QueryRequest::parse(pairs)?;
        let PreparedRead { query, plan } = self.prepare(table, &request)?;
        let rows = self.store.fetch_rows(&query).await?;
        let value = plan.shape.apply(rows);
        tracing::debug!(list = %table.table_db_name, rows = value.len(), "items read");

        let diagnostics = if request.is_unconstrained() {
            None
        } else {
            Some(Diagnostics {
                joins: plan.joins_json(),
                request,
                sql_query: query.sql,
                params: query.params,
            })
        };
        Ok(ItemsBody {
            list_id: None,
            list_title: None,
            value,
            diagnostics,
        })
    }

    /// One item by id, every base column.
    pub async fn read_one(&self, list: &ListKey, raw_id: &str) -> Result<Value, AppError> {
        let table = list.resolve(self.catalog)?;
        self.read_one_in(table, list.as_str(), raw_id).await
    }

    /// One row of `table` by id; `label` names the list in `ItemNotFound`.
    pub async fn read_one_in(&self, table: &TableDescriptor, label: &str, raw_id: &str) -> Result<Value, AppError> {
        let relation = relation_of(self.catalog, &table.table_db_name)?;
        let id = parse_item_id(relation, raw_id)?;
        let mut plan = plan(self.catalog, table, &QueryRequest::default())?;
        plan.select.filter = Some(Predicate::Compare {
            column: ColumnRef::new(&table.table_db_name, ID_COLUMN),
            op: CompareOp::Eq,
            value: id,
            cast: id_cast(relation).map(str::to_string),
        });
        let query = render_select(&plan.select);
        let rows = self.store.fetch_rows(&query).await?;
        plan.shape
            .apply(rows)
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ItemNotFound {
                list: label.to_string(),
                id: raw_id.trim().to_string(),
            })
    }
}
