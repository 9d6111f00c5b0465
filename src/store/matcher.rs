//! Native evaluation of store queries against JSON documents.
use crate::error::{FRes, FilterError};
use serde_json::{Map, Value as JsonValue};
use std::cmp::Ordering;

const THIS: &str = "$this";

fn invalid(what: &str, query: &JsonValue) -> FilterError {
    FilterError::InvalidStoreQuery(format!("{}: {}", what, query))
}

/// The single `(key, value)` entry of a query or condition object.
fn single_entry<'a>(query: &'a JsonValue, what: &str) -> FRes<(&'a str, &'a JsonValue)> {
    match query {
        JsonValue::Object(map) if map.len() == 1 => match map.iter().next() {
            Some((key, value)) => Ok((key.as_str(), value)),
            None => Err(invalid(what, query)),
        },
        _ => Err(invalid(what, query)),
    }
}

fn pair<'a>(value: &'a JsonValue, query: &JsonValue) -> FRes<(&'a JsonValue, &'a JsonValue)> {
    match value {
        JsonValue::Array(items) if items.len() == 2 => Ok((&items[0], &items[1])),
        _ => Err(invalid("expected two operands", query)),
    }
}

/// Check the shape of a whole query document.
pub(crate) fn validate(query: &JsonValue) -> FRes<()> {
    let (key, value) = single_entry(query, "expected an object with one entry")?;
    match key {
        "$const" => match value {
            JsonValue::Bool(_) => Ok(()),
            _ => Err(invalid("$const expects a boolean", query)),
        },
        "$and" | "$or" => {
            let (l, r) = pair(value, query)?;
            validate(l)?;
            validate(r)
        }
        "$not" => validate(value),
        path => {
            validate_path(path, query)?;
            let (operator, operand) = single_entry(value, "expected a condition with one operator")?;
            match operator {
                "$eq" | "$ne" | "$gt" | "$gte" | "$lt" | "$lte" => match operand {
                    JsonValue::Array(_) | JsonValue::Object(_) => Err(invalid("expected a scalar operand", query)),
                    _ => Ok(()),
                },
                "$in" => match operand {
                    JsonValue::Array(items) if items.iter().all(|i| !i.is_array() && !i.is_object()) => Ok(()),
                    _ => Err(invalid("$in expects a list of scalars", query)),
                },
                "$null" => match operand {
                    JsonValue::Bool(_) => Ok(()),
                    _ => Err(invalid("$null expects a boolean", query)),
                },
                "$icontains" | "$istartswith" | "$iendswith" => match operand {
                    JsonValue::String(_) => Ok(()),
                    _ => Err(invalid("text operators expect a string", query)),
                },
                "$any" | "$all" => validate(operand),
                _ => Err(invalid("unknown operator", query)),
            }
        }
    }
}

fn validate_path(path: &str, query: &JsonValue) -> FRes<()> {
    if path == THIS {
        return Ok(());
    }
    if path.split('.').any(|s| s.is_empty() || s.starts_with('$')) {
        return Err(invalid("invalid field path", query));
    }
    Ok(())
}

/// Evaluate `query` on `document`, combinators short-circuit left to right.
pub(crate) fn matches(query: &JsonValue, document: &JsonValue) -> FRes<bool> {
    let (key, value) = single_entry(query, "expected an object with one entry")?;
    match key {
        "$const" => value.as_bool().ok_or_else(|| invalid("$const expects a boolean", query)),
        "$and" => {
            let (l, r) = pair(value, query)?;
            Ok(matches(l, document)? && matches(r, document)?)
        }
        "$or" => {
            let (l, r) = pair(value, query)?;
            Ok(matches(l, document)? || matches(r, document)?)
        }
        "$not" => Ok(!matches(value, document)?),
        path => {
            validate_path(path, query)?;
            let field = resolve(document, path);
            let (operator, operand) = single_entry(value, "expected a condition with one operator")?;
            match_condition(field, operator, operand, query)
        }
    }
}

fn resolve<'a>(document: &'a JsonValue, path: &str) -> &'a JsonValue {
    if path == THIS {
        return document;
    }
    let mut current = document;
    for segment in path.split('.') {
        current = match current {
            JsonValue::Object(map) => field(map, segment),
            _ => &JsonValue::Null,
        };
    }
    current
}

fn field<'a>(map: &'a Map<String, JsonValue>, name: &str) -> &'a JsonValue {
    map.get(name).unwrap_or(&JsonValue::Null)
}

fn match_condition(field: &JsonValue, operator: &str, operand: &JsonValue, query: &JsonValue) -> FRes<bool> {
    Ok(match operator {
        "$eq" => compare(field, operand) == Some(Ordering::Equal),
        "$ne" => compare(field, operand) != Some(Ordering::Equal),
        "$gt" => compare(field, operand) == Some(Ordering::Greater),
        "$gte" => matches!(compare(field, operand), Some(Ordering::Greater) | Some(Ordering::Equal)),
        "$lt" => compare(field, operand) == Some(Ordering::Less),
        "$lte" => matches!(compare(field, operand), Some(Ordering::Less) | Some(Ordering::Equal)),
        "$in" => match operand {
            JsonValue::Array(items) => items.iter().any(|item| {
                if item.is_null() {
                    field.is_null()
                } else {
                    compare(field, item) == Some(Ordering::Equal)
                }
            }),
            _ => return Err(invalid("$in expects a list of scalars", query)),
        },
        "$null" => match operand {
            JsonValue::Bool(expected) => field.is_null() == *expected,
            _ => return Err(invalid("$null expects a boolean", query)),
        },
        "$icontains" | "$istartswith" | "$iendswith" => {
            let pattern = operand
                .as_str()
                .ok_or_else(|| invalid("text operators expect a string", query))?;
            match field {
                JsonValue::String(text) => {
                    let text = text.to_lowercase();
                    match operator {
                        "$icontains" => text.contains(pattern),
                        "$istartswith" => text.starts_with(pattern),
                        _ => text.ends_with(pattern),
                    }
                }
                _ => false,
            }
        }
        "$any" => match field {
            JsonValue::Array(items) => {
                for item in items {
                    if matches(operand, item)? {
                        return Ok(true);
                    }
                }
                false
            }
            _ => false,
        },
        "$all" => match field {
            JsonValue::Array(items) => {
                for item in items {
                    if !matches(operand, item)? {
                        return Ok(false);
                    }
                }
                true
            }
            _ => true,
        },
        _ => return Err(invalid("unknown operator", query)),
    })
}

/// Ordering of two scalars of the same JSON kind. Integers compare exactly, other numbers as
/// floats.
fn compare(field: &JsonValue, operand: &JsonValue) -> Option<Ordering> {
    match (field, operand) {
        (JsonValue::Number(a), JsonValue::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)),
        (JsonValue::Bool(a), JsonValue::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
