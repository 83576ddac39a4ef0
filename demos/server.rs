//! Example server: reads settings from the environment (and `.env`), ensures the database and the
//! `_sys_*` catalog relations exist, loads the catalog, and serves the list API.

use ravenpoint::service::UserDirectory;
use ravenpoint::{app, ensure_database_exists, ensure_sys_tables, load_from_pool, AppState, PgStore, Settings};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ravenpoint=info".parse()?))
        .init();

    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;

    ensure_sys_tables(&pool, &settings.schema).await?;
    let catalog = load_from_pool(&pool, &settings.schema).await?;
    let state = AppState::new(Arc::new(PgStore::new(pool)), settings.schema.clone(), catalog)
        .with_users(UserDirectory::new(settings.users_relation, settings.current_user_id));

    let listener = TcpListener::bind(settings.bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
