//! `PgStore` against a live PostgreSQL. Ignored by default; run with
//! `DATABASE_URL=postgres://... cargo test --test pg_store -- --ignored`.
//! Each test works in its own throwaway schema.

use ravenpoint::service::{ItemService, ListKey, MutationService};
use ravenpoint::{ensure_sys_tables, AppError, Catalog, ListStore, PgStore};
use serde_json::{json, Value};
use sqlx::PgPool;

struct Scratch {
    pool: PgPool,
    schema: String,
    store: PgStore,
    catalog: Catalog,
}

impl Scratch {
    async fn open() -> Option<Scratch> {
        let url = std::env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty())?;
        let pool = PgPool::connect(&url).await.expect("connect to DATABASE_URL");
        let schema = format!("rp_test_{}", uuid::Uuid::new_v4().simple());
        ensure_sys_tables(&pool, &schema).await.expect("sys tables");
        for stmt in [
            format!(
                r#"CREATE TABLE "{}"."keyresults" ("Id" SERIAL PRIMARY KEY, "Title" TEXT NOT NULL, "minValue" INTEGER, "due" DATE)"#,
                schema
            ),
            format!(
                r#"INSERT INTO "{}"."_sys_tables" (id, table_name, table_db_name) VALUES ('kr-guid', 'Key Results', 'keyresults')"#,
                schema
            ),
            format!(
                r#"INSERT INTO "{}"."keyresults" ("Title", "minValue") VALUES ('a', 5), ('b', 6), ('c', 7)"#,
                schema
            ),
        ] {
            sqlx::query(&stmt).execute(&pool).await.expect("fixture");
        }
        let store = PgStore::new(pool.clone());
        let catalog = store.load_catalog(&schema).await.expect("catalog");
        Some(Scratch {
            pool,
            schema,
            store,
            catalog,
        })
    }

    async fn count(&self) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&format!(r#"SELECT COUNT(*) FROM "{}"."keyresults""#, self.schema))
            .fetch_one(&self.pool)
            .await
            .unwrap();
        n
    }

    async fn close(self) {
        sqlx::query(&format!(r#"DROP SCHEMA "{}" CASCADE"#, self.schema))
            .execute(&self.pool)
            .await
            .unwrap();
    }
}

fn kr() -> ListKey {
    ListKey::Id("kr-guid".into())
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[tokio::test]
#[ignore]
async fn fractional_filter_keeps_boundary_rows() {
    let Some(s) = Scratch::open().await else { return };
    let items = ItemService::new(&s.catalog, &s.store);
    let body = items
        .read(&kr(), &pairs(&[("$select", "Title"), ("$filter", "minValue gt 5.5")]))
        .await
        .unwrap();
    assert_eq!(body.value, vec![json!({"Title": "b"}), json!({"Title": "c"})]);

    let body = items
        .read(&kr(), &pairs(&[("$select", "Title"), ("$filter", "minValue lt 3000000000")]))
        .await
        .unwrap();
    assert_eq!(body.value.len(), 3);

    let err = items
        .read(&kr(), &pairs(&[("$filter", "due eq notadate")]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MalformedFilter(_)), "{:?}", err);
    s.close().await;
}

#[tokio::test]
#[ignore]
async fn failed_execution_rolls_back_as_invalid_mutation() {
    let Some(s) = Scratch::open().await else { return };
    let svc = MutationService::new(&s.catalog, &s.store);
    let err = svc.create(&kr(), &json!({"minValue": 1})).await.unwrap_err();
    assert!(matches!(&err, AppError::InvalidMutation(m) if m.contains("Title")), "{:?}", err);
    assert_eq!(s.count().await, 3);

    let err = svc.update(&kr(), "99", &json!({"minValue": 1})).await.unwrap_err();
    assert!(matches!(err, AppError::ItemNotFound { .. }));
    let err = svc.delete(&kr(), "99").await.unwrap_err();
    assert!(matches!(err, AppError::ItemNotFound { .. }));
    assert_eq!(s.count().await, 3);
    s.close().await;
}

#[tokio::test]
#[ignore]
async fn created_item_reads_back_as_echoed() {
    let Some(s) = Scratch::open().await else { return };
    let svc = MutationService::new(&s.catalog, &s.store);
    let err = svc.create(&kr(), &json!({"Title": "frac", "minValue": 2.5})).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidMutation(_)));

    let out = svc
        .create(&kr(), &json!({"Title": "d", "minValue": 2, "due": "2024-06-30"}))
        .await
        .unwrap();
    let id = out.d["Id"].clone();
    let item = ItemService::new(&s.catalog, &s.store)
        .read_one(&kr(), &id.to_string())
        .await
        .unwrap();
    for key in ["Title", "minValue", "due"] {
        assert_eq!(item[key], out.d[key], "{}", key);
    }
    assert_eq!(item["Id"], id);
    assert_ne!(id, Value::Null);
    s.close().await;
}
