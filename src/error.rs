//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Inconsistent or unreadable catalog. Always a server fault.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog load: {0}")]
    Load(String),
    #[error("duplicate list {kind}: '{value}'")]
    DuplicateList { kind: &'static str, value: String },
    #[error("missing relation: {0}")]
    MissingRelation(String),
    #[error("missing column: {relation}.{column}")]
    MissingColumn { relation: String, column: String },
    #[error("more than one relationship from {table}.{column}")]
    DuplicateRelationship { table: String, column: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("unrecognized query parameter '{0}'; use only $select, $filter, $expand or $top")]
    UnrecognizedParameter(String),
    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("the query to field '{0}' is not valid: $select must name its target fields as '{0}/<field>' and $expand must contain '{0}'")]
    ExpandSelectMismatch(String),
    #[error("relationship from field '{0}' does not exist")]
    UnknownRelationship(String),
    #[error("unknown filter column '{0}'")]
    UnknownFilterColumn(String),
    #[error("malformed filter: {0}")]
    MalformedFilter(String),
    #[error("list does not exist: {0}")]
    ListNotFound(String),
    #[error("item {id} does not exist in list {list}")]
    ItemNotFound { list: String, id: String },
    #[error("invalid request: {0}")]
    InvalidMutation(String),
    #[error("X-RequestDigest header is required")]
    MissingDigest,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

impl AppError {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        AppError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable snake_case code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Catalog(_) => "catalog_error",
            AppError::UnrecognizedParameter(_) => "unrecognized_parameter",
            AppError::InvalidParameter { .. } => "invalid_parameter",
            AppError::ExpandSelectMismatch(_) => "expand_select_mismatch",
            AppError::UnknownRelationship(_) => "unknown_relationship",
            AppError::UnknownFilterColumn(_) => "unknown_filter_column",
            AppError::MalformedFilter(_) => "malformed_filter",
            AppError::ListNotFound(_) => "list_not_found",
            AppError::ItemNotFound { .. } => "item_not_found",
            AppError::InvalidMutation(_) => "invalid_mutation",
            AppError::MissingDigest => "missing_digest",
            AppError::NotFound(_) => "not_found",
            AppError::Db(_) => "database_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Catalog(_) | AppError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ListNotFound(_) | AppError::ItemNotFound { .. } | AppError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::MissingDigest => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_never_server_faults() {
        let client = [
            AppError::UnrecognizedParameter("$orderby".into()),
            AppError::invalid_parameter("$top", "not a number"),
            AppError::ExpandSelectMismatch("owner".into()),
            AppError::UnknownRelationship("owner".into()),
            AppError::UnknownFilterColumn("nope".into()),
            AppError::MalformedFilter("(".into()),
            AppError::ListNotFound("x".into()),
            AppError::ItemNotFound { list: "x".into(), id: "1".into() },
            AppError::InvalidMutation("bad".into()),
            AppError::MissingDigest,
        ];
        for err in client {
            assert!(err.status().is_client_error(), "{} should be 4xx", err.code());
        }
        assert!(AppError::Catalog(CatalogError::Load("x".into())).status().is_server_error());
    }

    #[test]
    fn mismatch_message_names_the_column() {
        let msg = AppError::ExpandSelectMismatch("owner".into()).to_string();
        assert!(msg.contains("'owner'"));
        assert!(msg.contains("owner/<field>"));
    }
}
