//! SharePoint-style handlers: hello, context info, list metadata, item reads and mutations, site users.

use crate::error::AppError;
use crate::extractors::{ListAddress, ListResource, RequestDigest, UserResource, WebAddress, FORM_DIGEST_VALUE};
use crate::query::params::check_keys;
use crate::response::{envelope, success_created, success_ok};
use crate::service::{list_metadata, ItemService, MutationService, UserService};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Header selecting update (`MERGE`) over delete on `POST .../items({id})`.
pub const HTTP_METHOD_HEADER: &str = "X-HTTP-Method";

pub async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello World!" }))
}

pub async fn context_info() -> Json<Value> {
    Json(json!({ "FormDigestValue": FORM_DIGEST_VALUE }))
}

fn is_merge(headers: &HeaderMap) -> bool {
    headers
        .get(HTTP_METHOD_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().eq_ignore_ascii_case("MERGE"))
        .unwrap_or(false)
}

fn json_body(body: &Bytes) -> Result<Value, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::InvalidMutation(format!("body is not valid JSON: {}", e)))
}

/// GET list metadata, list items, one item, or site users.
pub async fn get_web(
    State(state): State<AppState>,
    address: WebAddress,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    match address {
        WebAddress::List(list) => get_list(&state, list, &pairs).await,
        WebAddress::User(user) => get_user(&state, user, &pairs).await,
    }
}

async fn get_list(state: &AppState, address: ListAddress, pairs: &[(String, String)]) -> Result<Response, AppError> {
    let catalog = state.catalog();
    match address.resource {
        ListResource::Metadata => {
            let m = list_metadata(catalog.as_ref(), &address.list, pairs)?;
            Ok(envelope(m).into_response())
        }
        ListResource::Items => {
            let body = ItemService::new(catalog.as_ref(), state.store.as_ref())
                .read(&address.list, pairs)
                .await?;
            Ok(success_ok(body).into_response())
        }
        ListResource::Item(id) => {
            check_keys(pairs, &[])?;
            let item = ItemService::new(catalog.as_ref(), state.store.as_ref())
                .read_one(&address.list, &id)
                .await?;
            Ok(envelope(item).into_response())
        }
    }
}

async fn get_user(state: &AppState, user: UserResource, pairs: &[(String, String)]) -> Result<Response, AppError> {
    let catalog = state.catalog();
    let svc = UserService::new(catalog.as_ref(), state.store.as_ref(), &state.users);
    match user {
        UserResource::All => Ok(success_ok(svc.site_users(pairs).await?).into_response()),
        UserResource::Current => {
            check_keys(pairs, &[])?;
            Ok(envelope(svc.current().await?).into_response())
        }
        UserResource::ById(id) => {
            check_keys(pairs, &[])?;
            Ok(envelope(svc.by_id(&id).await?).into_response())
        }
    }
}

/// POST `.../items` creates; POST `.../items({id})` updates with `X-HTTP-Method: MERGE`, else deletes.
pub async fn post_web(
    State(state): State<AppState>,
    _digest: RequestDigest,
    address: WebAddress,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let WebAddress::List(address) = address else {
        return Err(AppError::NotFound("site users are read-only".into()));
    };
    let catalog = state.catalog();
    let svc = MutationService::new(catalog.as_ref(), state.store.as_ref());
    match address.resource {
        ListResource::Metadata => Err(AppError::NotFound("list metadata is read-only".into())),
        ListResource::Items => {
            let payload = json_body(&body)?;
            let out = svc.create(&address.list, &payload).await?;
            Ok(success_created(out).into_response())
        }
        ListResource::Item(id) if is_merge(&headers) => {
            let payload = json_body(&body)?;
            let out = svc.update(&address.list, &id, &payload).await?;
            Ok(success_ok(out).into_response())
        }
        ListResource::Item(id) => {
            let out = svc.delete(&address.list, &id).await?;
            Ok(success_ok(out).into_response())
        }
    }
}
