//! List routes. SharePoint addresses carry quotes and parentheses, so everything under `/web`
//! is one wildcard route parsed by [`WebAddress`](crate::extractors::WebAddress).

use crate::handlers::lists::{context_info, get_web, hello, post_web};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn list_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/contextinfo", post(context_info))
        .route("/web/*address", get(get_web).post(post_web))
        .with_state(state)
}
