//! Result shaping: flat joined rows into nested objects and arrays.
//!
//! The shape is decided by the planner before the query runs; `apply` is a single pass over the
//! rows that never inspects column names.

use serde_json::{Map, Number, Value};
use std::collections::{HashMap, HashSet};

/// One field of a nested object: output `name`, read from row column `alias`.
#[derive(Clone, Debug, PartialEq)]
pub struct SubField {
    pub name: String,
    pub alias: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OutputField {
    /// Base column copied as is.
    Scalar { key: String },
    /// Single-valued expansion: one object per row.
    Nested { key: String, fields: Vec<SubField> },
    /// Multi-valued expansion: rows of one base item fold into an array. `marker` is the lookup
    /// key column; a null marker is the LEFT JOIN placeholder for "no related rows". With two or
    /// more arrays the joined rows are a cross product, so elements are de-duplicated by marker.
    Array {
        key: String,
        fields: Vec<SubField>,
        marker: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultShape {
    pub fields: Vec<OutputField>,
    /// Column identifying the base row; rows sharing it are grouped when arrays are present.
    pub row_key: Option<String>,
}

/// Nested lookup values: null becomes "", whole floats become integers.
pub fn normalize_lookup_value(v: Option<&Value>) -> Value {
    match v {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(Value::Number(n)) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::Number(Number::from(f as i64)),
            _ => Value::Number(n.clone()),
        },
        Some(other) => other.clone(),
    }
}

fn nested(row: &Map<String, Value>, fields: &[SubField]) -> Value {
    let mut obj = Map::new();
    for f in fields {
        obj.insert(f.name.clone(), normalize_lookup_value(row.get(&f.alias)));
    }
    Value::Object(obj)
}

struct Group {
    row: Map<String, Value>,
    arrays: Vec<Vec<Value>>,
    seen: Vec<HashSet<String>>,
}

impl ResultShape {
    fn array_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| matches!(f, OutputField::Array { .. }))
            .count()
    }

    fn plain(&self, row: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for f in &self.fields {
            match f {
                OutputField::Scalar { key } => {
                    out.insert(key.clone(), row.get(key).cloned().unwrap_or(Value::Null));
                }
                OutputField::Nested { key, fields } => {
                    out.insert(key.clone(), nested(row, fields));
                }
                OutputField::Array { .. } => {}
            }
        }
        out
    }

    /// Reshape rows in storage order. Without array fields this is a per-row projection.
    pub fn apply(&self, rows: Vec<Map<String, Value>>) -> Vec<Value> {
        let arrays = self.array_count();
        if arrays == 0 {
            return rows.iter().map(|r| Value::Object(self.plain(r))).collect();
        }

        let dedupe = arrays > 1;
        let mut groups: Vec<Group> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for row in &rows {
            let plain = self.plain(row);
            let key = match &self.row_key {
                Some(k) => row.get(k).cloned().unwrap_or(Value::Null).to_string(),
                None => Value::Object(plain.clone()).to_string(),
            };
            let gi = *index.entry(key).or_insert_with(|| {
                groups.push(Group {
                    row: plain,
                    arrays: vec![Vec::new(); arrays],
                    seen: vec![HashSet::new(); arrays],
                });
                groups.len() - 1
            });
            let group = &mut groups[gi];
            let array_fields = self.fields.iter().filter_map(|f| match f {
                OutputField::Array { fields, marker, .. } => Some((fields, marker)),
                _ => None,
            });
            for (ai, (fields, marker)) in array_fields.enumerate() {
                let m = match row.get(marker) {
                    None | Some(Value::Null) => continue,
                    Some(v) => v.to_string(),
                };
                if !dedupe || group.seen[ai].insert(m) {
                    group.arrays[ai].push(nested(row, fields));
                }
            }
        }

        groups
            .into_iter()
            .map(|mut g| {
                let mut out = Map::new();
                let mut ai = 0;
                for f in &self.fields {
                    match f {
                        OutputField::Scalar { key } | OutputField::Nested { key, .. } => {
                            if let Some(v) = g.row.remove(key) {
                                out.insert(key.clone(), v);
                            }
                        }
                        OutputField::Array { key, .. } => {
                            out.insert(key.clone(), Value::Array(std::mem::take(&mut g.arrays[ai])));
                            ai += 1;
                        }
                    }
                }
                Value::Object(out)
            })
            .collect()
    }
}
