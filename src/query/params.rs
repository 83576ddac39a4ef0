//! `$select` / `$filter` / `$expand` / `$top` parsing and expand/select cross-validation.

use crate::error::AppError;
use serde::{Serialize, Serializer};

pub const SELECT: &str = "$select";
pub const FILTER: &str = "$filter";
pub const EXPAND: &str = "$expand";
pub const TOP: &str = "$top";

/// `expandCol/targetCol` entry of `$select`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinColumn {
    pub expand: String,
    pub target: String,
}

impl JoinColumn {
    /// Output alias of the joined column: `{expand}__{target}`.
    pub fn alias(&self) -> String {
        format!("{}__{}", self.expand, self.target)
    }
}

impl Serialize for JoinColumn {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&format_args!("{}/{}", self.expand, self.target))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryRequest {
    pub main_cols: Vec<String>,
    pub expand_cols: Vec<String>,
    pub join_cols: Vec<JoinColumn>,
    pub filter_query: Option<String>,
    pub top: Option<u64>,
    #[serde(skip)]
    shaped: bool,
}

/// Split a comma list, trimming entries and dropping empty ones and repeats.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !out.iter().any(|c| c == part) {
            out.push(part.to_string());
        }
    }
    out
}

/// Reject anything outside `allowed` and keys given more than once.
pub(crate) fn check_keys(pairs: &[(String, String)], allowed: &[&str]) -> Result<(), AppError> {
    for (i, (key, _)) in pairs.iter().enumerate() {
        if !allowed.contains(&key.as_str()) {
            return Err(AppError::UnrecognizedParameter(key.clone()));
        }
        if pairs[..i].iter().any(|(k, _)| k == key) {
            return Err(AppError::invalid_parameter(key, "given more than once"));
        }
    }
    Ok(())
}

impl QueryRequest {
    pub fn parse(pairs: &[(String, String)]) -> Result<Self, AppError> {
        check_keys(pairs, &[SELECT, FILTER, EXPAND, TOP])?;
        let mut req = QueryRequest::default();
        for (key, value) in pairs {
            match key.as_str() {
                SELECT => {
                    req.shaped = true;
                    for entry in split_list(value) {
                        match entry.split_once('/') {
                            Some((_, rest)) if rest.contains('/') => {
                                return Err(AppError::invalid_parameter(
                                    SELECT,
                                    format!("'{}' expands more than one level", entry),
                                ));
                            }
                            Some((expand, target)) => {
                                let (expand, target) = (expand.trim(), target.trim());
                                if expand.is_empty() || target.is_empty() {
                                    return Err(AppError::invalid_parameter(
                                        SELECT,
                                        format!("'{}' must be written as expandColumn/targetColumn", entry),
                                    ));
                                }
                                let jc = JoinColumn {
                                    expand: expand.to_string(),
                                    target: target.to_string(),
                                };
                                if !req.join_cols.contains(&jc) {
                                    req.join_cols.push(jc);
                                }
                            }
                            None => req.main_cols.push(entry),
                        }
                    }
                }
                EXPAND => {
                    req.shaped = true;
                    req.expand_cols = split_list(value);
                }
                FILTER => {
                    req.shaped = true;
                    req.filter_query = Some(value.clone());
                }
                TOP => {
                    let top = value.trim().parse::<u64>().map_err(|_| {
                        AppError::invalid_parameter(TOP, format!("'{}' is not a non-negative integer", value))
                    })?;
                    req.top = Some(top);
                }
                _ => {}
            }
        }
        req.cross_validate()?;
        Ok(req)
    }

    fn cross_validate(&self) -> Result<(), AppError> {
        if let Some(jc) = self.join_cols.iter().find(|jc| !self.expand_cols.contains(&jc.expand)) {
            return Err(AppError::ExpandSelectMismatch(jc.expand.clone()));
        }
        if let Some(col) = self
            .expand_cols
            .iter()
            .find(|col| !self.join_cols.iter().any(|jc| &jc.expand == *col))
        {
            return Err(AppError::ExpandSelectMismatch(col.clone()));
        }
        Ok(())
    }

    /// No `$select`, `$filter` or `$expand`: the base relation is returned as stored.
    pub fn is_unconstrained(&self) -> bool {
        !self.shaped
    }

    /// Join columns belonging to one expansion, in `$select` order.
    pub fn join_cols_for<'a>(&'a self, expand: &'a str) -> impl Iterator<Item = &'a JoinColumn> + 'a {
        self.join_cols.iter().filter(move |jc| jc.expand == expand)
    }
}
