//! PostgreSQL store: `_sys_*` catalog DDL, database bootstrap, and the [`ListStore`] seam the
//! services execute through.

use crate::catalog::{load_from_pool, Catalog, ID_COLUMN};
use crate::error::AppError;
use crate::service::Mutation;
use crate::sql::{quoted, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{ConnectOptions, PgPool, Postgres};
use std::str::FromStr;

/// Schema-qualified name of a catalog relation, e.g. `"public"."_sys_tables"`.
pub fn qualified_sys_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

/// Create the schema and the catalog relations if missing. Seeding them is left to the caller.
pub async fn ensure_sys_tables(pool: &PgPool, schema: &str) -> Result<(), AppError> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
        .execute(pool)
        .await?;

    let ddl = [
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                table_name TEXT NOT NULL UNIQUE,
                table_db_name TEXT NOT NULL
            )
            "#,
            qualified_sys_table(schema, "_sys_tables")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                table_left TEXT NOT NULL,
                table_left_on TEXT NOT NULL,
                table_lookup TEXT NOT NULL,
                table_lookup_on TEXT NOT NULL,
                is_multi BOOLEAN NOT NULL DEFAULT FALSE,
                PRIMARY KEY (table_left, table_left_on)
            )
            "#,
            qualified_sys_table(schema, "_sys_relationships")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                table_db_name TEXT NOT NULL,
                payload_field TEXT NOT NULL,
                storage_column TEXT NOT NULL,
                PRIMARY KEY (table_db_name, payload_field)
            )
            "#,
            qualified_sys_table(schema, "_sys_field_mappings")
        ),
    ];
    for stmt in &ddl {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Split a connection URL into the admin URL (same server, `postgres` database) and the database name.
fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = url[scheme_end..]
        .find('/')
        .map(|i| scheme_end + i + 1)
        .ok_or_else(|| AppError::Db(sqlx::Error::Configuration("DATABASE_URL has no database path".into())))?;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let (db_name, query) = match path_and_query.split_once('?') {
        Some((db, q)) => (db.trim(), Some(q)),
        None => (path_and_query.trim(), None),
    };
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = match query {
        Some(q) => format!("{}postgres?{}", base, q),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name.to_string()))
}

/// Store seam for the item and mutation services.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Run a SELECT and return each row as an alias -> value map, in result order.
    async fn fetch_rows(&self, query: &QueryBuf) -> Result<Vec<Map<String, Value>>, AppError>;

    /// Run one mutation in its own transaction and return the `Id` of every affected row.
    /// A mutation that must match a row and matched none is rolled back and returns no ids.
    /// Execution failures roll back and surface as `InvalidMutation`.
    async fn apply(&self, mutation: &Mutation) -> Result<Vec<Value>, AppError>;

    async fn ping(&self) -> Result<(), AppError>;

    async fn load_catalog(&self, schema: &str) -> Result<Catalog, AppError>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

fn bind_all<'q>(q: &'q QueryBuf) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

#[async_trait]
impl ListStore for PgStore {
    async fn fetch_rows(&self, q: &QueryBuf) -> Result<Vec<Map<String, Value>>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(q).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn apply(&self, mutation: &Mutation) -> Result<Vec<Value>, AppError> {
        let q = &mutation.statement;
        tracing::debug!(sql = %q.sql, params = ?q.params, kind = ?mutation.kind, "query (tx)");
        let mut tx = self.pool.begin().await?;
        let rows = match bind_all(q).fetch_all(&mut *tx).await {
            Ok(rows) => rows,
            Err(e) => {
                tx.rollback().await?;
                tracing::warn!(table = %mutation.table, error = %e, "mutation rolled back");
                return Err(AppError::InvalidMutation(e.to_string()));
            }
        };
        let ids: Vec<Value> = rows.iter().map(|r| cell_to_value(r, ID_COLUMN)).collect();
        if ids.is_empty() && mutation.kind.requires_match() {
            tx.rollback().await?;
            return Ok(ids);
        }
        tx.commit().await?;
        Ok(ids)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn load_catalog(&self, schema: &str) -> Result<Catalog, AppError> {
        Ok(load_from_pool(&self.pool, schema).await?)
    }
}

fn row_to_json(row: &PgRow) -> Map<String, Value> {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

/// Decode one cell by trying the types list columns use; unknown types and NULL become `null`.
fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        return serde_json::Number::from_f64(n as f64).map(Value::Number).unwrap_or(Value::Null);
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        return serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null);
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
