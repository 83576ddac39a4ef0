//! Environment configuration. Call `dotenvy::dotenv()` first to pick up a `.env` file.

use crate::service::users::{DEFAULT_CURRENT_USER_ID, DEFAULT_USERS_RELATION};
use std::net::SocketAddr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/ravenpoint";
pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    /// Schema holding the `_sys_*` catalog relations and every list relation.
    pub schema: String,
    pub bind: SocketAddr,
    pub max_connections: u32,
    /// Relation behind `web/SiteUsers`, `web/currentUser` and `web/getuserbyid`.
    pub users_relation: String,
    pub current_user_id: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env` over an arbitrary source; unset and blank values take the defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let bind_raw = get("RAVENPOINT_BIND").unwrap_or_else(|| DEFAULT_BIND.into());
        let bind = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| format!("RAVENPOINT_BIND '{}': {}", bind_raw, e))?;
        let max_connections = match get("RAVENPOINT_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("RAVENPOINT_MAX_CONNECTIONS '{}' must be a positive integer", v))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            schema: get("RAVENPOINT_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.into()),
            bind,
            max_connections,
            users_relation: get("RAVENPOINT_USERS_TABLE").unwrap_or_else(|| DEFAULT_USERS_RELATION.into()),
            current_user_id: get("RAVENPOINT_CURRENT_USER_ID").unwrap_or_else(|| DEFAULT_CURRENT_USER_ID.into()),
        })
    }
}
