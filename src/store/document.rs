//! Conversion of records into JSON documents.
use crate::{
    desc::{FieldType, RecordDescription},
    error::{FRes, FilterError},
    record::{FieldRef, Filterable, Value},
};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde_json::{Map, Number, Value as JsonValue};

/// Document form of a record: field name to value, associations as nested objects, collections
/// as arrays.
pub(crate) fn to_document<T: Filterable>(record: &T) -> FRes<JsonValue> {
    record_document(record, &T::description())
}

fn record_document(record: &dyn Filterable, desc: &RecordDescription) -> FRes<JsonValue> {
    let mut document = Map::new();
    for field in desc.fields() {
        let value = match record.field(field.name()) {
            Some(value) => field_document(&value, field.field_type())?,
            None => JsonValue::Null,
        };
        document.insert(field.name().to_string(), value);
    }
    Ok(JsonValue::Object(document))
}

fn field_document(field: &FieldRef<'_>, field_type: &FieldType) -> FRes<JsonValue> {
    match (field, field_type) {
        (FieldRef::Value(value), _) => value_document(value).map_err(FilterError::Unrepresentable),
        (FieldRef::Record(record), FieldType::Record { description, .. }) => {
            record_document(*record, &description())
        }
        (FieldRef::Collection(items), FieldType::Collection(element)) => {
            let element = element();
            items
                .iter()
                .map(|item| field_document(item, &element))
                .collect::<FRes<Vec<_>>>()
                .map(JsonValue::Array)
        }
        _ => Err(FilterError::Unrepresentable(format!(
            "value does not match the declared type {}",
            field_type
        ))),
    }
}

/// JSON form of a scalar. Dates are days since 1970-01-01, date-times microseconds since the
/// Unix epoch and durations microseconds. Temporal values finer than a microsecond are rejected,
/// [`Value::date_time`] and [`Value::duration`] build values that always fit.
pub(crate) fn value_document(value: &Value) -> Result<JsonValue, String> {
    Ok(match value {
        Value::Null => JsonValue::Null,
        Value::Text(text) => JsonValue::String(text.clone()),
        Value::Int(v) => JsonValue::from(*v),
        Value::Long(v) => JsonValue::from(*v),
        Value::Float(v) => match Number::from_f64(*v) {
            Some(n) => JsonValue::Number(n),
            None => return Err(format!("non finite float {}", v)),
        },
        Value::Bool(v) => JsonValue::Bool(*v),
        // NaiveDate::default() is 1970-01-01
        Value::Date(date) => JsonValue::from((*date - NaiveDate::default()).num_days()),
        Value::DateTime(date_time) => {
            if date_time.nanosecond() % 1_000 != 0 {
                return Err(format!("date-time {} is finer than a microsecond", date_time));
            }
            match (*date_time - NaiveDateTime::default()).num_microseconds() {
                Some(micros) => JsonValue::from(micros),
                None => return Err(format!("date-time {} out of range", date_time)),
            }
        }
        Value::Duration(duration) => match duration.num_microseconds() {
            Some(micros) if Duration::microseconds(micros) == *duration => JsonValue::from(micros),
            Some(_) => return Err(format!("duration {} is finer than a microsecond", duration)),
            None => return Err(format!("duration {} out of range", duration)),
        },
    })
}
