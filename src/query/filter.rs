//! `$filter` translation: recursive descent over a fixed grammar into a [`Predicate`].
//!
//! ```text
//! expr     := term ( "or" term )*
//! term     := factor ( "and" factor )*
//! factor   := "(" expr ")" | compare | contains
//! compare  := column op value                 op: eq ne gt ge lt le
//! contains := "substringof(" value "," column ")" | "contains(" column "," value ")"
//! column   := ident | ident "/" ident
//! value    := 'text' | number | word | null
//! ```
//!
//! Columns are resolved against the catalog and the join plan; literals only ever become bound
//! values. Anything the grammar does not cover is rejected as a whole.

use crate::catalog::{ColumnInfo, SchemaCatalog};
use crate::error::AppError;
use crate::query::planner::{relation_of, JoinPlan};
use crate::sql::{ColumnRef, CompareOp, Predicate};

const MAX_NESTING: usize = 64;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    LParen,
    RParen,
    Comma,
    /// Quoted literal, quotes removed and `''` unescaped.
    Str(String),
    /// Identifier, keyword, operator, number or bare literal.
    Word(String),
}

fn malformed(msg: impl Into<String>) -> AppError {
    AppError::MalformedFilter(msg.into())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '/' | '.' | '-' | ':' | '+')
}

fn tokenize(input: &str) -> Result<Vec<Token>, AppError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '\'' => {
                chars.next();
                let mut s = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    if c == '\'' {
                        if matches!(chars.peek(), Some((_, '\''))) {
                            chars.next();
                            s.push('\'');
                        } else {
                            closed = true;
                            break;
                        }
                    } else {
                        s.push(c);
                    }
                }
                if !closed {
                    return Err(malformed(format!("unterminated string starting at {}", i)));
                }
                tokens.push(Token::Str(s));
            }
            c if is_word_char(c) => {
                let mut w = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_word_char(c) {
                        break;
                    }
                    w.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(w));
            }
            other => return Err(malformed(format!("unexpected character '{}' at {}", other, i))),
        }
    }
    Ok(tokens)
}

/// Literal as written: quoted text is never a keyword or a number.
enum Literal {
    Quoted(String),
    Bare(String),
}

impl Literal {
    fn text(&self) -> &str {
        match self {
            Literal::Quoted(s) | Literal::Bare(s) => s,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Literal::Bare(s) if s.eq_ignore_ascii_case("null"))
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    plan: &'a JoinPlan,
    catalog: &'a dyn SchemaCatalog,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, want: Token, context: &str) -> Result<(), AppError> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            Some(t) => Err(malformed(format!("expected {:?} {}, found {:?}", want, context, t))),
            None => Err(malformed(format!("expected {:?} {}, found end of filter", want, context))),
        }
    }

    fn peek_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(kw))
    }

    fn expr(&mut self) -> Result<Predicate, AppError> {
        let mut items = vec![self.term()?];
        while self.peek_keyword("or") {
            self.pos += 1;
            items.push(self.term()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Predicate::Or(items) })
    }

    fn term(&mut self) -> Result<Predicate, AppError> {
        let mut items = vec![self.factor()?];
        while self.peek_keyword("and") {
            self.pos += 1;
            items.push(self.factor()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Predicate::And(items) })
    }

    fn factor(&mut self) -> Result<Predicate, AppError> {
        match self.next() {
            Some(Token::LParen) => {
                self.depth += 1;
                if self.depth > MAX_NESTING {
                    return Err(malformed("parentheses nested too deeply"));
                }
                let inner = self.expr()?;
                self.expect(Token::RParen, "to close group")?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("substringof") && self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                let needle = self.literal()?;
                self.expect(Token::Comma, "in substringof")?;
                let column = self.column_word()?;
                self.expect(Token::RParen, "to close substringof")?;
                self.contains(&column, needle)
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("contains") && self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                let column = self.column_word()?;
                self.expect(Token::Comma, "in contains")?;
                let needle = self.literal()?;
                self.expect(Token::RParen, "to close contains")?;
                self.contains(&column, needle)
            }
            Some(Token::Word(w)) => self.compare(&w),
            Some(t) => Err(malformed(format!("unexpected {:?}", t))),
            None => Err(malformed("unexpected end of filter")),
        }
    }

    fn column_word(&mut self) -> Result<String, AppError> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w),
            other => Err(malformed(format!("expected a column, found {:?}", other))),
        }
    }

    fn literal(&mut self) -> Result<Literal, AppError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Literal::Quoted(s)),
            Some(Token::Word(w)) => Ok(Literal::Bare(w)),
            Some(t) => Err(malformed(format!("expected a value, found {:?}", t))),
            None => Err(malformed("expected a value, found end of filter")),
        }
    }

    fn compare(&mut self, column: &str) -> Result<Predicate, AppError> {
        let op = match self.next() {
            Some(Token::Word(w)) => CompareOp::from_keyword(&w)
                .ok_or_else(|| malformed(format!("unknown operator '{}'", w)))?,
            Some(t) => return Err(malformed(format!("expected an operator after '{}', found {:?}", column, t))),
            None => return Err(malformed(format!("expected an operator after '{}'", column))),
        };
        let value = self.literal()?;
        let (col, info) = self.resolve(column)?;
        if value.is_null() {
            return match op {
                CompareOp::Eq => Ok(Predicate::IsNull { column: col, negated: false }),
                CompareOp::Ne => Ok(Predicate::IsNull { column: col, negated: true }),
                _ => Err(malformed(format!("null can only be compared with eq or ne on '{}'", column))),
            };
        }
        let (bound, cast) = info
            .filter_operand(value.text())
            .map_err(|m| malformed(format!("{} for column '{}'", m, column)))?;
        Ok(Predicate::Compare {
            column: col,
            op,
            value: bound,
            cast,
        })
    }

    fn contains(&self, column: &str, needle: Literal) -> Result<Predicate, AppError> {
        let (col, _) = self.resolve(column)?;
        Ok(Predicate::Contains {
            column: col,
            needle: needle.text().to_string(),
        })
    }

    /// Plain names resolve on the base relation; `expand/target` through the plan's join alias.
    fn resolve(&self, name: &str) -> Result<(ColumnRef, &'a ColumnInfo), AppError> {
        let unknown = || AppError::UnknownFilterColumn(name.to_string());
        match name.split_once('/') {
            None => {
                let base = relation_of(self.catalog, &self.plan.base_table)?;
                let info = base.column(name).ok_or_else(unknown)?;
                Ok((ColumnRef::new(&self.plan.base_table, &info.name), info))
            }
            Some((expand, target)) => {
                if target.contains('/') {
                    return Err(unknown());
                }
                let join = self.plan.join_for(expand).ok_or_else(unknown)?;
                let lookup = relation_of(self.catalog, &join.target.table)?;
                let info = lookup.column(target).ok_or_else(unknown)?;
                Ok((ColumnRef::new(&join.expand, &info.name), info))
            }
        }
    }
}

/// Translate a raw `$filter` string. Blank filters translate to no predicate.
pub fn translate(
    filter: &str,
    plan: &JoinPlan,
    catalog: &dyn SchemaCatalog,
) -> Result<Option<Predicate>, AppError> {
    let tokens = tokenize(filter)?;
    if tokens.is_empty() {
        return Ok(None);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        plan,
        catalog,
    };
    let predicate = parser.expr()?;
    if let Some(t) = parser.peek() {
        return Err(malformed(format!("unexpected {:?} after complete expression", t)));
    }
    Ok(Some(predicate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixture::okr_catalog;
    use crate::catalog::Catalog;
    use crate::query::params::QueryRequest;
    use crate::query::planner::plan;
    use crate::sql::render_predicate;
    use serde_json::{json, Value};

    fn plan_for(catalog: &Catalog, pairs: &[(&str, &str)]) -> JoinPlan {
        let pairs: Vec<(String, String)> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let req = QueryRequest::parse(&pairs).unwrap();
        let table = catalog.resolve_table_by_id("kr-guid").unwrap();
        plan(catalog, table, &req).unwrap()
    }

    fn render(filter: &str, pairs: &[(&str, &str)]) -> Result<(String, Vec<Value>), AppError> {
        let catalog = okr_catalog();
        let plan = plan_for(&catalog, pairs);
        let p = translate(filter, &plan, &catalog)?.expect("predicate");
        let q = render_predicate(&p);
        Ok((q.sql, q.params))
    }

    #[test]
    fn numeric_comparisons_bind_numbers() {
        let (sql, params) = render("minValue gt 5 and maxValue lt 100", &[]).unwrap();
        assert_eq!(
            sql,
            "\"keyresults\".\"minValue\" > $1::integer AND \"keyresults\".\"maxValue\" < $2::integer"
        );
        assert_eq!(params, vec![json!(5), json!(100)]);
    }

    #[test]
    fn fractional_literal_on_integer_column_is_not_rounded() {
        let (sql, params) = render("minValue gt 5.5", &[]).unwrap();
        assert_eq!(sql, "\"keyresults\".\"minValue\" > $1::numeric");
        assert_eq!(params, vec![json!(5.5)]);
        let (sql, params) = render("minValue lt 3000000000", &[]).unwrap();
        assert_eq!(sql, "\"keyresults\".\"minValue\" < $1::numeric");
        assert_eq!(params, vec![json!(3_000_000_000i64)]);
    }

    #[test]
    fn literals_the_column_cannot_hold_are_malformed() {
        for filter in ["due eq notadate", "due gt '2024-02-30'", "done eq maybe"] {
            let err = render(filter, &[]).unwrap_err();
            assert!(matches!(err, AppError::MalformedFilter(_)), "{} -> {:?}", filter, err);
        }
        let (sql, params) = render("due ge '2024-01-31' and done eq true", &[]).unwrap();
        assert_eq!(
            sql,
            "\"keyresults\".\"due\" >= $1::date AND \"keyresults\".\"done\" = $2::boolean"
        );
        assert_eq!(params, vec![json!("2024-01-31"), json!(true)]);
    }

    #[test]
    fn expand_reference_resolves_to_join_alias() {
        let (sql, params) = render(
            "owner/status eq active",
            &[("$select", "Title,owner/Title"), ("$expand", "owner")],
        )
        .unwrap();
        assert_eq!(sql, "\"owner\".\"status\" = $1::text");
        assert_eq!(params, vec![json!("active")]);
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let (sql, _) = render("Title eq 'a' or Title eq 'b' and minValue ge 1", &[]).unwrap();
        assert_eq!(
            sql,
            "\"keyresults\".\"Title\" = $1::text OR \"keyresults\".\"Title\" = $2::text AND \"keyresults\".\"minValue\" >= $3::integer"
        );
        let (sql, _) = render("(Title eq 'a' or Title eq 'b') and minValue ge 1", &[]).unwrap();
        assert!(sql.starts_with("(\"keyresults\".\"Title\" = $1::text OR"));
    }

    #[test]
    fn keywords_and_operators_are_case_insensitive() {
        let (sql, _) = render("minValue GT 1 AND maxValue Le 2", &[]).unwrap();
        assert!(sql.contains(" > $1") && sql.contains(" <= $2"));
    }

    #[test]
    fn quoted_values_are_bound_verbatim() {
        let (sql, params) = render("Title eq 'it''s; DROP TABLE users; --'", &[]).unwrap();
        assert_eq!(sql, "\"keyresults\".\"Title\" = $1::text");
        assert_eq!(params, vec![json!("it's; DROP TABLE users; --")]);
    }

    #[test]
    fn null_comparisons_render_is_null() {
        let (sql, params) = render("owner eq null and parentObjective ne NULL", &[]).unwrap();
        assert_eq!(
            sql,
            "\"keyresults\".\"owner\" IS NULL AND \"keyresults\".\"parentObjective\" IS NOT NULL"
        );
        assert!(params.is_empty());
        // quoted 'null' is text, not a keyword
        let (_, params) = render("Title eq 'null'", &[]).unwrap();
        assert_eq!(params, vec![json!("null")]);
    }

    #[test]
    fn substring_forms() {
        let (sql, params) = render("substringof('grow', Title)", &[]).unwrap();
        assert_eq!(sql, "\"keyresults\".\"Title\"::text LIKE $1");
        assert_eq!(params, vec![json!("%grow%")]);
        let (_, params) = render("contains(Title,'100%')", &[]).unwrap();
        assert_eq!(params, vec![json!("%100\\%%")]);
    }

    #[test]
    fn unknown_columns_are_reported() {
        for (filter, col) in [
            ("nope eq 1", "nope"),
            ("owner/Title eq 'x'", "owner/Title"),
            ("Title/x/y eq 1", "Title/x/y"),
        ] {
            let err = render(filter, &[]).unwrap_err();
            assert!(matches!(&err, AppError::UnknownFilterColumn(c) if c == col), "{}: {:?}", filter, err);
        }
    }

    #[test]
    fn malformed_filters_are_rejected_whole() {
        for filter in [
            "minValue gt",
            "minValue like 5",
            "(minValue gt 5",
            "minValue gt 5)",
            "minValue gt 5 and",
            "not minValue gt 5",
            "Title eq 'open",
            "minValue gt 5 maxValue lt 3",
            "minValue gt five",
            "minValue gt null",
            "Title eq \"x\"",
            "substringof('x' Title)",
        ] {
            let err = render(filter, &[]).unwrap_err();
            assert!(matches!(err, AppError::MalformedFilter(_)), "{} -> {:?}", filter, err);
        }
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("{}minValue gt 1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert!(matches!(render(&deep, &[]), Err(AppError::MalformedFilter(_))));
        let ok = format!("{}minValue gt 1{}", "(".repeat(8), ")".repeat(8));
        assert!(render(&ok, &[]).is_ok());
    }

    #[test]
    fn blank_filter_is_no_predicate() {
        let catalog = okr_catalog();
        let plan = plan_for(&catalog, &[]);
        assert!(translate("  ", &plan, &catalog).unwrap().is_none());
    }
}
