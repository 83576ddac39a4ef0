//! Parse SharePoint-style addresses from the `/web/*address` wildcard.
//!
//! ```text
//! Lists(guid'{id}')[/items[({itemId})]]
//! lists/GetByTitle('{title}')[/items[({itemId})]]
//! SiteUsers | currentUser | getuserbyid('{id}')
//! ```

use crate::error::AppError;
use crate::service::ListKey;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListResource {
    Metadata,
    Items,
    Item(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListAddress {
    pub list: ListKey,
    pub resource: ListResource,
}

fn address_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?i:lists)(?:\(guid'(?P<id>[^']+)'\)|/(?i:getbytitle)\('(?P<title>(?:[^']|'')+)'\))(?:/(?P<items>(?i:items))(?:\((?P<item>[^)]+)\))?)?/?$",
        )
        .ok()
    })
    .as_ref()
}

impl ListAddress {
    /// `None` when `tail` is not a list address.
    pub fn parse(tail: &str) -> Option<Self> {
        let caps = address_regex()?.captures(tail.trim_start_matches('/'))?;
        let list = match (caps.name("id"), caps.name("title")) {
            (Some(id), _) => ListKey::Id(id.as_str().to_string()),
            (None, Some(title)) => ListKey::Title(title.as_str().replace("''", "'")),
            (None, None) => return None,
        };
        let resource = match (caps.name("items"), caps.name("item")) {
            (None, _) => ListResource::Metadata,
            (Some(_), None) => ListResource::Items,
            (Some(_), Some(item)) => ListResource::Item(item.as_str().trim().to_string()),
        };
        Some(ListAddress { list, resource })
    }
}

/// Site user resources; keywords are case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserResource {
    All,
    Current,
    ById(String),
}

fn user_by_id_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?i:getuserbyid)\('?(?P<id>[^')]+)'?\)/?$").ok())
        .as_ref()
}

impl UserResource {
    pub fn parse(tail: &str) -> Option<Self> {
        let tail = tail.trim_start_matches('/');
        let bare = tail.trim_end_matches('/');
        if bare.eq_ignore_ascii_case("siteusers") {
            return Some(UserResource::All);
        }
        if bare.eq_ignore_ascii_case("currentuser") {
            return Some(UserResource::Current);
        }
        let caps = user_by_id_regex()?.captures(tail)?;
        Some(UserResource::ById(caps.name("id")?.as_str().trim().to_string()))
    }
}

/// Everything routable under `/web`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebAddress {
    List(ListAddress),
    User(UserResource),
}

impl WebAddress {
    pub fn parse(tail: &str) -> Option<Self> {
        ListAddress::parse(tail)
            .map(WebAddress::List)
            .or_else(|| UserResource::parse(tail).map(WebAddress::User))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for WebAddress
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(tail) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::NotFound(e.to_string()))?;
        WebAddress::parse(&tail).ok_or_else(|| AppError::NotFound(format!("web/{}", tail)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_guid() {
        assert_eq!(
            ListAddress::parse("Lists(guid'kr-guid')"),
            Some(ListAddress {
                list: ListKey::Id("kr-guid".into()),
                resource: ListResource::Metadata
            })
        );
        assert_eq!(
            ListAddress::parse("/Lists(guid'kr-guid')/items(12)").map(|a| a.resource),
            Some(ListResource::Item("12".into()))
        );
    }

    #[test]
    fn by_title_with_escaped_quote() {
        let a = ListAddress::parse("lists/GetByTitle('Bob''s Goals')/items").unwrap();
        assert_eq!(a.list, ListKey::Title("Bob's Goals".into()));
        assert_eq!(a.resource, ListResource::Items);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert!(ListAddress::parse("lists(guid'x')/Items").is_some());
        assert!(ListAddress::parse("Lists/getbytitle('Users')").is_some());
    }

    #[test]
    fn rejects_other_addresses() {
        for tail in [
            "Lists",
            "Lists(guid'')",
            "Lists(guid'x')/fields",
            "lists/GetByTitle(Users)",
            "Lists(guid'x')/items()",
            "currentUser",
        ] {
            assert_eq!(ListAddress::parse(tail), None, "{}", tail);
        }
    }

    #[test]
    fn user_addresses() {
        assert_eq!(WebAddress::parse("SiteUsers"), Some(WebAddress::User(UserResource::All)));
        assert_eq!(WebAddress::parse("/currentuser"), Some(WebAddress::User(UserResource::Current)));
        assert_eq!(
            WebAddress::parse("getuserbyid('3')"),
            Some(WebAddress::User(UserResource::ById("3".into())))
        );
        assert_eq!(UserResource::parse("GetUserById(12)"), Some(UserResource::ById("12".into())));
        for tail in ["getuserbyid()", "getuserbyid('')", "SiteUsers/items", "users"] {
            assert_eq!(WebAddress::parse(tail), None, "{}", tail);
        }
        assert!(matches!(WebAddress::parse("Lists(guid'x')"), Some(WebAddress::List(_))));
    }
}
