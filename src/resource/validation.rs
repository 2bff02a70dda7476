use chrono::NaiveDate;
use libsql::Value;
use serde_json::Value as JsonValue;

use crate::error::ResourceError;
use crate::model::{Column, ColumnKind, Record, ResourceDescriptor, Rule};

/// Checks a create/update payload against the descriptor and returns one
/// bind value per writable column, in column order.
///
/// Updates replace the full row: a column missing from the payload gets its
/// default, not the value currently stored.
pub fn validate(descriptor: &ResourceDescriptor, payload: &Record) -> Result<Vec<Value>, ResourceError> {
    descriptor
        .columns
        .iter()
        .map(|column| validate_column(column, payload.get(column.name)))
        .collect()
}

fn validate_column(column: &Column, raw: Option<&JsonValue>) -> Result<Value, ResourceError> {
    let value = match normalize(column, raw)? {
        Some(value) => value,
        None if column.required => {
            return Err(ResourceError::InvalidArgument(format!("{} is required", column.name)));
        }
        None => return Ok(default_for(column)),
    };

    for rule in column.rules {
        check_rule(column.name, rule, &value)?;
    }
    Ok(value)
}

/// Coerces the JSON value to the column's store type. `Ok(None)` means the
/// field is absent, null, or blank.
fn normalize(column: &Column, raw: Option<&JsonValue>) -> Result<Option<Value>, ResourceError> {
    let raw = match raw {
        None | Some(JsonValue::Null) => return Ok(None),
        Some(JsonValue::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(raw) => raw,
    };

    let invalid = |expected: &str| ResourceError::InvalidArgument(format!("{} must be {}", column.name, expected));

    match column.kind {
        ColumnKind::Text => match raw {
            JsonValue::String(s) => Ok(Some(Value::Text(s.clone()))),
            _ => Err(invalid("a string")),
        },
        ColumnKind::Real => {
            let number = match raw {
                JsonValue::Number(n) => n.as_f64(),
                JsonValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
                _ => None,
            };
            number.map(|f| Some(Value::Real(f))).ok_or_else(|| invalid("a number"))
        }
        ColumnKind::Integer => {
            let number = match raw {
                JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
                JsonValue::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            number.map(|i| Some(Value::Integer(i))).ok_or_else(|| invalid("an integer"))
        }
    }
}

/// `1.0` counts as an integer, `1.5` does not.
fn integral(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn default_for(column: &Column) -> Value {
    match (column.kind, column.default) {
        (_, Some(text)) => Value::Text(text.to_string()),
        (ColumnKind::Text, None) => Value::Text(String::new()),
        (ColumnKind::Real, None) => Value::Real(0.0),
        (ColumnKind::Integer, None) => Value::Integer(0),
    }
}

fn check_rule(name: &str, rule: &Rule, value: &Value) -> Result<(), ResourceError> {
    match (rule, value) {
        (Rule::OneOf(allowed), Value::Text(s)) => {
            if !allowed.contains(&s.as_str()) {
                return Err(ResourceError::InvalidArgument(format!(
                    "{} must be one of: {}",
                    name,
                    allowed.join(", ")
                )));
            }
        }
        (Rule::Positive, Value::Real(f)) if *f <= 0.0 => {
            return Err(ResourceError::InvalidArgument(format!("{} must be greater than 0", name)));
        }
        (Rule::Positive, Value::Integer(i)) if *i <= 0 => {
            return Err(ResourceError::InvalidArgument(format!("{} must be greater than 0", name)));
        }
        (Rule::IsoDate, Value::Text(s)) => {
            if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_err() {
                return Err(ResourceError::InvalidArgument(format!(
                    "{} must be a date formatted as YYYY-MM-DD",
                    name
                )));
            }
        }
        _ => {}
    }
    Ok(())
}
