//! Typing of client-supplied values against a column. Anything PostgreSQL would reject or round
//! on its way into the column is refused here, so it surfaces as a client error.

use crate::catalog::{ColumnInfo, ColumnType};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde_json::{Number, Value};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Integer text keeps integer precision; anything else must be a finite real.
pub(crate) fn parse_number(text: &str) -> Option<Value> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn in_year_range<D: Datelike>(d: &D) -> bool {
    (1..=9999).contains(&d.year())
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().filter(in_year_range)
}

fn parse_datetime(text: &str) -> bool {
    if let Ok(d) = DateTime::parse_from_rfc3339(text) {
        return in_year_range(&d);
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .filter_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .any(|d| in_year_range(&d))
        || parse_date(text).is_some()
}

impl ColumnInfo {
    fn integer_range(&self) -> (i64, i64) {
        match self.cast.as_deref() {
            Some("smallint") => (i16::MIN.into(), i16::MAX.into()),
            Some("integer") => (i32::MIN.into(), i32::MAX.into()),
            _ => (i64::MIN, i64::MAX),
        }
    }

    /// Whether `n` fits the storage width of an integer column.
    pub fn fits_integer(&self, n: i64) -> bool {
        let (lo, hi) = self.integer_range();
        (lo..=hi).contains(&n)
    }

    fn integer(&self, n: i64) -> Result<Value, String> {
        if self.fits_integer(n) {
            Ok(Value::from(n))
        } else {
            Err(format!(
                "{} is out of range for {}",
                n,
                self.cast.as_deref().unwrap_or("bigint")
            ))
        }
    }

    /// Type a textual value (filter literal, item id, payload string) exactly as the column stores it.
    pub fn parse_text(&self, text: &str) -> Result<Value, String> {
        match self.column_type {
            ColumnType::Integer => {
                let n = text
                    .parse::<i64>()
                    .map_err(|_| format!("'{}' is not an integer", text))?;
                self.integer(n)
            }
            ColumnType::Float => parse_number(text).ok_or_else(|| format!("'{}' is not a number", text)),
            ColumnType::Boolean => parse_bool(text)
                .map(Value::Bool)
                .ok_or_else(|| format!("'{}' is not true or false", text)),
            ColumnType::Temporal => {
                let ok = match self.cast.as_deref() {
                    Some("date") => parse_date(text).is_some(),
                    _ => parse_datetime(text),
                };
                if ok {
                    Ok(Value::String(text.to_string()))
                } else {
                    Err(format!("'{}' is not a valid {}", text, self.cast.as_deref().unwrap_or("date")))
                }
            }
            ColumnType::Text | ColumnType::Other => match self.cast.as_deref() {
                Some("uuid") => uuid::Uuid::parse_str(text)
                    .map(|u| Value::String(u.hyphenated().to_string()))
                    .map_err(|_| format!("'{}' is not a uuid", text)),
                Some("json") | Some("jsonb") => serde_json::from_str::<Value>(text)
                    .map(|_| Value::String(text.to_string()))
                    .map_err(|_| format!("'{}' is not valid JSON", text)),
                _ => Ok(Value::String(text.to_string())),
            },
        }
    }

    /// Bound value and placeholder cast for comparing this column with a filter literal.
    /// Integer columns compare as `numeric` when the literal is fractional or wider than the
    /// column, so the comparison is never rounded or overflowed.
    pub fn filter_operand(&self, text: &str) -> Result<(Value, Option<String>), String> {
        if self.column_type == ColumnType::Integer {
            if let Ok(n) = text.parse::<i64>() {
                if self.fits_integer(n) {
                    return Ok((Value::from(n), self.cast.clone()));
                }
            }
            return parse_number(text)
                .map(|v| (v, Some("numeric".to_string())))
                .ok_or_else(|| format!("'{}' is not a number", text));
        }
        self.parse_text(text).map(|v| (v, self.cast.clone()))
    }

    /// Value to write for a JSON payload field. Integers must be exact and in range.
    pub fn payload_value(&self, value: &Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match (&self.column_type, value) {
            (_, Value::String(s)) if self.column_type != ColumnType::Text && self.column_type != ColumnType::Other => {
                self.parse_text(s.trim())
            }
            (ColumnType::Integer, Value::Number(n)) => match n.as_i64() {
                Some(i) => self.integer(i),
                None => Err(format!("{} is not an integer", n)),
            },
            (ColumnType::Float, Value::Number(_)) | (ColumnType::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (ColumnType::Integer | ColumnType::Float, other) => Err(format!("expects a number, got {}", other)),
            (ColumnType::Boolean, other) => Err(format!("expects true or false, got {}", other)),
            (ColumnType::Temporal, other) => Err(format!("expects a date string, got {}", other)),
            (_, _) => match self.cast.as_deref() {
                // every JSON value is stored as its text form
                Some("json") | Some("jsonb") => Ok(Value::String(value.to_string())),
                Some("uuid") => match value {
                    Value::String(s) => self.parse_text(s.trim()),
                    other => Err(format!("expects a uuid string, got {}", other)),
                },
                _ => Ok(value.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn col(data_type: &str) -> ColumnInfo {
        ColumnInfo::from_data_type("c", data_type)
    }

    #[test]
    fn integer_width_follows_column_type() {
        assert!(col("smallint").fits_integer(32767));
        assert!(!col("smallint").fits_integer(32768));
        assert!(!col("integer").fits_integer(3_000_000_000));
        assert!(col("bigint").fits_integer(3_000_000_000));
        assert!(col("integer").parse_text("3000000000").is_err());
        assert_eq!(col("integer").parse_text("-7"), Ok(json!(-7)));
        assert!(col("integer").parse_text("2.5").is_err());
    }

    #[test]
    fn fractional_or_wide_literals_compare_as_numeric() {
        let c = col("integer");
        assert_eq!(c.filter_operand("5"), Ok((json!(5), Some("integer".into()))));
        assert_eq!(c.filter_operand("5.5"), Ok((json!(5.5), Some("numeric".into()))));
        assert_eq!(c.filter_operand("3000000000"), Ok((json!(3_000_000_000i64), Some("numeric".into()))));
        assert!(c.filter_operand("five").is_err());
    }

    #[test]
    fn temporal_literals_are_checked() {
        assert!(col("date").parse_text("2024-02-29").is_ok());
        assert!(col("date").parse_text("2023-02-29").is_err());
        assert!(col("date").parse_text("notadate").is_err());
        assert!(col("date").parse_text("0000-01-01").is_err());
        let ts = col("timestamp with time zone");
        assert!(ts.parse_text("2024-01-01T10:00:00Z").is_ok());
        assert!(ts.parse_text("2024-01-01 10:00:00.5").is_ok());
        assert!(ts.parse_text("2024-01-01").is_ok());
        assert!(ts.parse_text("yesterday").is_err());
    }

    #[test]
    fn boolean_uuid_and_json_literals_are_checked() {
        assert_eq!(col("boolean").parse_text("TRUE"), Ok(json!(true)));
        assert!(col("boolean").parse_text("yes").is_err());
        assert_eq!(
            col("uuid").parse_text("{67E55044-10B1-426F-9247-BB680E5FE0C8}"),
            Ok(json!("67e55044-10b1-426f-9247-bb680e5fe0c8"))
        );
        assert!(col("uuid").parse_text("abc").is_err());
        assert!(col("jsonb").parse_text("{\"a\":1}").is_ok());
        assert!(col("jsonb").parse_text("{a").is_err());
        assert_eq!(col("text").parse_text("anything"), Ok(json!("anything")));
    }

    #[test]
    fn payload_integers_must_be_exact() {
        let c = col("integer");
        assert_eq!(c.payload_value(&json!(2)), Ok(json!(2)));
        assert_eq!(c.payload_value(&json!(" 4 ")), Ok(json!(4)));
        assert_eq!(c.payload_value(&Value::Null), Ok(Value::Null));
        assert!(c.payload_value(&json!(2.5)).is_err());
        assert!(c.payload_value(&json!("2.5")).is_err());
        assert!(c.payload_value(&json!(4_294_967_296i64)).is_err());
        assert_eq!(col("numeric").payload_value(&json!(2.5)), Ok(json!(2.5)));
    }

    #[test]
    fn payload_values_for_other_types() {
        assert!(col("date").payload_value(&json!("2024-13-01")).is_err());
        assert!(col("date").payload_value(&json!(20240101)).is_err());
        assert_eq!(col("boolean").payload_value(&json!("false")), Ok(json!(false)));
        assert!(col("boolean").payload_value(&json!(1)).is_err());
        assert_eq!(col("jsonb").payload_value(&json!({"a": [1]})), Ok(json!("{\"a\":[1]}")));
        assert_eq!(col("text").payload_value(&json!(12)), Ok(json!(12)));
    }
}
