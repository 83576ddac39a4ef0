//! Response envelopes in the SharePoint `{ d: ... }` style.

use crate::query::QueryRequest;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct Envelope<T> {
    pub d: T,
}

/// Body of create/update/delete responses.
#[derive(Debug, Serialize)]
pub struct MutationBody {
    pub d: Value,
    pub message: String,
}

/// Body of list item reads. Exactly one of `listId` / `listTitle` is set, echoing how the list was addressed.
#[derive(Debug, Serialize)]
pub struct ItemsBody {
    #[serde(rename = "listId", skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    #[serde(rename = "listTitle", skip_serializing_if = "Option::is_none")]
    pub list_title: Option<String>,
    pub value: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

/// The parsed request plus the SQL that answered it. Values appear as `$n` placeholders in
/// `sql_query` and in order in `params`.
#[derive(Debug, Serialize)]
pub struct Diagnostics {
    #[serde(flatten)]
    pub request: QueryRequest,
    pub sql_query: String,
    pub params: Vec<Value>,
    pub joins: Value,
}

pub fn envelope<T: Serialize>(d: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::OK, Json(Envelope { d }))
}

pub fn success_ok<T: Serialize>(body: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(body))
}

pub fn success_created<T: Serialize>(body: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unconstrained_read_has_no_diagnostics() {
        let body = ItemsBody {
            list_id: Some("kr-guid".into()),
            list_title: None,
            value: vec![json!({"Id": 1})],
            diagnostics: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"listId": "kr-guid", "value": [{"Id": 1}]})
        );
    }

    #[test]
    fn diagnostics_flatten_the_request() {
        let req = QueryRequest::parse(&[("$select".to_string(), "Title".to_string())]).unwrap();
        let d = Diagnostics {
            request: req,
            sql_query: "SELECT 1".into(),
            params: vec![],
            joins: json!({}),
        };
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["main_cols"], json!(["Title"]));
        assert_eq!(v["top"], Value::Null);
        assert_eq!(v["sql_query"], json!("SELECT 1"));
    }
}
