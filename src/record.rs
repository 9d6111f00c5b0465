use crate::desc::{FieldType, RecordDescription, ScalarType};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;

/// Record types that filters can be compiled against.
///
/// Usually implemented with `#[derive(Filterable)]`, which also implements [`FilterField`] so
/// the record can be nested in other records.
///
/// # Example
/// ```
/// use dynfilter::{FieldRef, FilterField, Filterable, RecordDescription};
///
/// struct Album {
///     title: String,
///     year: i32,
/// }
///
/// impl Filterable for Album {
///     fn description() -> RecordDescription {
///         RecordDescription::builder("Album")
///             .field::<String>("title")
///             .field::<i32>("year")
///             .build()
///     }
///     fn field(&self, name: &str) -> Option<FieldRef<'_>> {
///         match name {
///             "title" => Some(self.title.field_ref()),
///             "year" => Some(self.year.field_ref()),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Filterable {
    fn description() -> RecordDescription
    where
        Self: Sized;

    /// Runtime value of the field declared with `name` in the description.
    fn field(&self, name: &str) -> Option<FieldRef<'_>>;
}

/// Types that can be used as a field of a [`Filterable`] record.
pub trait FilterField {
    fn field_type() -> FieldType;
    fn field_ref(&self) -> FieldRef<'_>;
}

/// Runtime view of a field value.
pub enum FieldRef<'a> {
    Value(Value),
    Record(&'a dyn Filterable),
    Collection(Vec<FieldRef<'a>>),
}

impl<'a> fmt::Debug for FieldRef<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Value(v) => write!(f, "Value({:?})", v),
            FieldRef::Record(_) => write!(f, "Record(..)"),
            FieldRef::Collection(c) => f.debug_list().entries(c.iter()).finish(),
        }
    }
}

/// Runtime scalar value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int(i32),
    Long(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Duration(Duration),
}

impl Value {
    /// Date-time value truncated to whole microseconds, the resolution of stored documents.
    pub fn date_time(value: NaiveDateTime) -> Value {
        let micros = value.nanosecond() / 1_000 * 1_000;
        Value::DateTime(value.with_nanosecond(micros).unwrap_or(value))
    }

    /// Duration value truncated towards zero to whole microseconds. Durations too long for a
    /// microsecond count are kept as they are, the store rejects them.
    pub fn duration(value: Duration) -> Value {
        Value::Duration(value.num_microseconds().map(Duration::microseconds).unwrap_or(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        Some(match self {
            Value::Null => return None,
            Value::Text(_) => ScalarType::Text,
            Value::Int(_) => ScalarType::Int,
            Value::Long(_) => ScalarType::Long,
            Value::Float(_) => ScalarType::Float,
            Value::Bool(_) => ScalarType::Bool,
            Value::Date(_) => ScalarType::Date,
            Value::DateTime(_) => ScalarType::DateTime,
            Value::Duration(_) => ScalarType::Duration,
        })
    }

    /// Ordering between two values of compatible types, `None` when either side is null or the
    /// types cannot be compared. Text is ordered by code point, numbers compare across widths.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Long(b)) => Some(i64::from(*a).cmp(b)),
            (Value::Long(a), Value::Int(b)) => Some(a.cmp(&i64::from(*b))),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&f64::from(*b)),
            (Value::Int(a), Value::Float(b)) => f64::from(*a).partial_cmp(b),
            (Value::Float(a), Value::Long(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Long(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Text(v) => write!(f, "{:?}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::Duration(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! impl_field_type {
    ($t:ty, $st:ident, $conv:expr) => {
        impl FilterField for $t {
            fn field_type() -> FieldType {
                FieldType::scalar(ScalarType::$st)
            }
            fn field_ref(&self) -> FieldRef<'_> {
                FieldRef::Value($conv(self))
            }
        }
    };
}

impl_field_type!(i8, Int, |v: &i8| Value::Int(i32::from(*v)));
impl_field_type!(i16, Int, |v: &i16| Value::Int(i32::from(*v)));
impl_field_type!(i32, Int, |v: &i32| Value::Int(*v));
impl_field_type!(u8, Int, |v: &u8| Value::Int(i32::from(*v)));
impl_field_type!(u16, Int, |v: &u16| Value::Int(i32::from(*v)));
impl_field_type!(i64, Long, |v: &i64| Value::Long(*v));
impl_field_type!(u32, Long, |v: &u32| Value::Long(i64::from(*v)));
impl_field_type!(isize, Long, |v: &isize| Value::Long(*v as i64));
impl_field_type!(usize, Long, |v: &usize| Value::Long(
    i64::try_from(*v).unwrap_or(i64::MAX)
));
impl_field_type!(f32, Float, |v: &f32| Value::Float(f64::from(*v)));
impl_field_type!(f64, Float, |v: &f64| Value::Float(*v));
impl_field_type!(bool, Bool, |v: &bool| Value::Bool(*v));
impl_field_type!(String, Text, |v: &String| Value::Text(v.clone()));
impl_field_type!(NaiveDate, Date, |v: &NaiveDate| Value::Date(*v));
impl_field_type!(NaiveDateTime, DateTime, |v: &NaiveDateTime| Value::date_time(*v));
impl_field_type!(DateTime<Utc>, DateTime, |v: &DateTime<Utc>| Value::date_time(v.naive_utc()));
impl_field_type!(Duration, Duration, |v: &Duration| Value::duration(*v));

impl<T: FilterField> FilterField for Option<T> {
    fn field_type() -> FieldType {
        T::field_type().as_nullable()
    }
    fn field_ref(&self) -> FieldRef<'_> {
        match self {
            Some(v) => v.field_ref(),
            None => match T::field_type() {
                FieldType::Collection(_) => FieldRef::Collection(Vec::new()),
                _ => FieldRef::Value(Value::Null),
            },
        }
    }
}

impl<T: FilterField> FilterField for Vec<T> {
    fn field_type() -> FieldType {
        FieldType::Collection(T::field_type)
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Collection(self.iter().map(|v| v.field_ref()).collect())
    }
}

impl<T: FilterField> FilterField for Box<T> {
    fn field_type() -> FieldType {
        T::field_type()
    }
    fn field_ref(&self) -> FieldRef<'_> {
        self.as_ref().field_ref()
    }
}

#[cfg(test)]
mod test {
    use super::{FieldRef, FilterField, Value};
    use crate::desc::{FieldType, ScalarType};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use std::cmp::Ordering;

    #[test]
    fn scalar_refs() {
        match 12u8.field_ref() {
            FieldRef::Value(Value::Int(12)) => {}
            other => panic!("unexpected {:?}", other),
        }
        match Some(7i64).field_ref() {
            FieldRef::Value(Value::Long(7)) => {}
            other => panic!("unexpected {:?}", other),
        }
        match None::<String>.field_ref() {
            FieldRef::Value(Value::Null) => {}
            other => panic!("unexpected {:?}", other),
        }
        match None::<Vec<i32>>.field_ref() {
            FieldRef::Collection(c) => assert!(c.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
        match vec![1, 2, 3].field_ref() {
            FieldRef::Collection(c) => assert_eq!(c.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn declared_types() {
        assert_eq!(<u32 as FilterField>::field_type(), FieldType::scalar(ScalarType::Long));
        assert_eq!(
            <Option<f32> as FilterField>::field_type(),
            FieldType::Scalar {
                ty: ScalarType::Float,
                nullable: true
            }
        );
        assert_eq!(
            <Option<Vec<bool>> as FilterField>::field_type().element(),
            Some(FieldType::scalar(ScalarType::Bool))
        );
        assert_eq!(
            <Box<Duration> as FilterField>::field_type(),
            FieldType::scalar(ScalarType::Duration)
        );
    }

    #[test]
    fn value_ordering() {
        assert_eq!(Value::Int(2).compare(&Value::Long(3)), Some(Ordering::Less));
        assert_eq!(Value::Float(2.5).compare(&Value::Int(2)), Some(Ordering::Greater));
        assert_eq!(Value::Text("B".into()).compare(&Value::Text("a".into())), Some(Ordering::Less));
        assert_eq!(Value::Null.compare(&Value::Null), None);
        assert_eq!(Value::Int(1).compare(&Value::Text("1".into())), None);
        let d1 = NaiveDate::from_ymd_opt(1973, 3, 1).expect("valid date");
        let d2 = NaiveDate::from_ymd_opt(1979, 11, 30).expect("valid date");
        assert_eq!(Value::Date(d1).compare(&Value::Date(d2)), Some(Ordering::Less));
        assert_eq!(Value::Float(f64::NAN).compare(&Value::Float(1.0)), None);
    }

    #[test]
    fn temporal_refs_use_microseconds() {
        let date = NaiveDate::from_ymd_opt(2019, 5, 1).expect("valid date");
        let precise = date.and_hms_nano_opt(10, 0, 0, 1_500).expect("valid time");
        let micros = date.and_hms_micro_opt(10, 0, 0, 1).expect("valid time");
        match precise.field_ref() {
            FieldRef::Value(Value::DateTime(v)) => assert_eq!(v, micros),
            other => panic!("unexpected {:?}", other),
        }
        match Utc.from_utc_datetime(&precise).field_ref() {
            FieldRef::Value(Value::DateTime(v)) => assert_eq!(v, micros),
            other => panic!("unexpected {:?}", other),
        }
        match Duration::nanoseconds(1_500).field_ref() {
            FieldRef::Value(Value::Duration(v)) => assert_eq!(v, Duration::microseconds(1)),
            other => panic!("unexpected {:?}", other),
        }
        match Duration::nanoseconds(-1_500).field_ref() {
            FieldRef::Value(Value::Duration(v)) => assert_eq!(v, Duration::microseconds(-1)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(Value::duration(Duration::max_value()), Value::Duration(Duration::max_value()));
    }
}
