//! Router assembly.

pub mod common;
pub mod list;

pub use common::common_routes;
pub use list::list_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

/// Prefix of the SharePoint-style API.
pub const API_PREFIX: &str = "/ravenpoint/_api";

/// Request bodies above this size are rejected with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Full application: common routes at the root, list routes under [`API_PREFIX`].
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .nest(API_PREFIX, list_routes(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
}
