//! Renders the query AST and mutation statements into parameterized SQL. The only place SQL text is produced.

use crate::sql::ast::{Assignment, ColumnRef, Join, Predicate, Select, SelectExpr};
use serde::Serialize;
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from catalog).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

fn column(c: &ColumnRef) -> String {
    format!("{}.{}", quoted(&c.relation), quoted(&c.column))
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Bind `v` and return its placeholder, cast to the column type when known.
    fn placeholder(&mut self, v: Value, cast: Option<&str>) -> String {
        let n = self.push_param(v);
        cast.map(|t| format!("${}::{}", n, t))
            .unwrap_or_else(|| format!("${}", n))
    }
}

fn select_expr(e: &SelectExpr) -> String {
    let expr = match e.read_cast {
        Some(t) => format!("{}::{}", column(&e.column), t),
        None => column(&e.column),
    };
    format!("{} AS {}", expr, quoted(&e.alias))
}

fn join_clause(schema: &str, j: &Join) -> String {
    format!(
        "LEFT JOIN {} AS {} ON {} = {}",
        qualified_table(schema, &j.table),
        quoted(&j.alias),
        column(&j.left),
        column(&j.right)
    )
}

/// LIKE pattern matching `needle` anywhere; `%`, `_` and `\` in the needle match literally.
fn contains_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn predicate(p: &Predicate, q: &mut QueryBuf) -> String {
    match p {
        Predicate::Compare { column: c, op, value, cast } => {
            let ph = q.placeholder(value.clone(), cast.as_deref());
            format!("{} {} {}", column(c), op.as_sql(), ph)
        }
        Predicate::IsNull { column: c, negated } => {
            format!("{} IS {}NULL", column(c), if *negated { "NOT " } else { "" })
        }
        Predicate::Contains { column: c, needle } => {
            let ph = q.placeholder(Value::String(contains_pattern(needle)), None);
            format!("{}::text LIKE {}", column(c), ph)
        }
        Predicate::And(items) => items
            .iter()
            .map(|i| match i {
                Predicate::Or(_) => format!("({})", predicate(i, q)),
                _ => predicate(i, q),
            })
            .collect::<Vec<_>>()
            .join(" AND "),
        Predicate::Or(items) => items
            .iter()
            .map(|i| predicate(i, q))
            .collect::<Vec<_>>()
            .join(" OR "),
    }
}

/// Render just a predicate; placeholders start at $1.
pub fn render_predicate(p: &Predicate) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = predicate(p, &mut q);
    q
}

/// SELECT with LEFT JOINs, optional WHERE and ORDER BY. The base table is aliased by its own name.
pub fn render_select(s: &Select) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols = s.columns.iter().map(select_expr).collect::<Vec<_>>().join(", ");
    let mut parts = vec![
        format!("SELECT {}", cols),
        format!("FROM {} AS {}", qualified_table(&s.schema, &s.table), quoted(&s.table)),
    ];
    parts.extend(s.joins.iter().map(|j| join_clause(&s.schema, j)));
    if let Some(ref p) = s.filter {
        let clause = predicate(p, &mut q);
        parts.push(format!("WHERE {}", clause));
    }
    if let Some(ref o) = s.order_by {
        parts.push(format!("ORDER BY {}", column(o)));
    }
    q.sql = parts.join(" ");
    q
}

/// INSERT one row; returns the key column of the new row.
pub fn insert(schema: &str, table: &str, assignments: &[Assignment], key: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let target = qualified_table(schema, table);
    if assignments.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", target, quoted(key));
        return q;
    }
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for a in assignments {
        cols.push(quoted(&a.column));
        placeholders.push(q.placeholder(a.value.clone(), a.cast.as_deref()));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        target,
        cols.join(", "),
        placeholders.join(", "),
        quoted(key)
    );
    q
}

/// UPDATE by key; returns the key of each updated row (zero rows means no such item).
pub fn update(
    schema: &str,
    table: &str,
    assignments: &[Assignment],
    key: &str,
    id: &Value,
    key_cast: Option<&str>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let sets = assignments
        .iter()
        .map(|a| {
            let ph = q.placeholder(a.value.clone(), a.cast.as_deref());
            format!("{} = {}", quoted(&a.column), ph)
        })
        .collect::<Vec<_>>();
    let id_ph = q.placeholder(id.clone(), key_cast);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(schema, table),
        sets.join(", "),
        quoted(key),
        id_ph,
        quoted(key)
    );
    q
}

/// DELETE by key.
pub fn delete(schema: &str, table: &str, key: &str, id: &Value, key_cast: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_ph = q.placeholder(id.clone(), key_cast);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(schema, table),
        quoted(key),
        id_ph,
        quoted(key)
    );
    q
}
