//! Query AST. Identifiers in these nodes come from the catalog; values are only ever bound.

use serde_json::Value;

/// `"relation"."column"`, where relation is a table name or a join alias.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnRef {
    pub relation: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(relation: impl Into<String>, column: impl Into<String>) -> Self {
        ColumnRef {
            relation: relation.into(),
            column: column.into(),
        }
    }
}

/// One output column: `expr[::read_cast] AS "alias"`.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectExpr {
    pub column: ColumnRef,
    pub read_cast: Option<&'static str>,
    pub alias: String,
}

/// `LEFT JOIN "schema"."table" AS "alias" ON left = right`.
#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    pub table: String,
    pub alias: String,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// OData operator keyword, case-insensitive.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "gt" => Some(CompareOp::Gt),
            "ge" => Some(CompareOp::Ge),
            "lt" => Some(CompareOp::Lt),
            "le" => Some(CompareOp::Le),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Compare {
        column: ColumnRef,
        op: CompareOp,
        value: Value,
        cast: Option<String>,
    },
    IsNull {
        column: ColumnRef,
        negated: bool,
    },
    /// Substring containment; `needle` is the raw client text, escaped at render time.
    Contains {
        column: ColumnRef,
        needle: String,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Select {
    pub schema: String,
    pub table: String,
    pub columns: Vec<SelectExpr>,
    pub joins: Vec<Join>,
    pub filter: Option<Predicate>,
    pub order_by: Option<ColumnRef>,
}

/// One `column = value` pair in INSERT or UPDATE.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Value,
    pub cast: Option<String>,
}
