//! Conversion of filter literals to the declared type of the target field.
use crate::{desc::ScalarType, record::Value, request::Scalar};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Convert a literal to a value of `target`, `None` when the literal has no representation in
/// that type. `null` converts to [`Value::Null`] for every target.
pub(crate) fn coerce(value: &Scalar, target: ScalarType) -> Option<Value> {
    if let Scalar::Null = value {
        return Some(Value::Null);
    }
    if let Scalar::List(_) = value {
        return None;
    }
    match target {
        ScalarType::Text => Some(Value::Text(match value {
            Scalar::String(s) => s.clone(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Null | Scalar::List(_) => return None,
        })),
        ScalarType::Int => match value {
            Scalar::Int(i) => Some(Value::Int(*i)),
            Scalar::String(s) => s.trim().parse::<i32>().ok().map(Value::Int),
            Scalar::Bool(b) => Some(Value::Int(if *b { 1 } else { 0 })),
            _ => None,
        },
        ScalarType::Long => match value {
            Scalar::Int(i) => Some(Value::Long(i64::from(*i))),
            Scalar::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
                Some(Value::Long(*f as i64))
            }
            Scalar::String(s) => s.trim().parse::<i64>().ok().map(Value::Long),
            Scalar::Bool(b) => Some(Value::Long(if *b { 1 } else { 0 })),
            _ => None,
        },
        ScalarType::Float => match value {
            Scalar::Int(i) => Some(Value::Float(f64::from(*i))),
            Scalar::Float(f) => Some(Value::Float(*f)),
            Scalar::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float),
            Scalar::Bool(b) => Some(Value::Float(if *b { 1.0 } else { 0.0 })),
            _ => None,
        },
        ScalarType::Bool => match value {
            Scalar::Bool(b) => Some(Value::Bool(*b)),
            Scalar::Int(i) => Some(Value::Bool(*i != 0)),
            Scalar::Float(f) => Some(Value::Bool(*f != 0.0)),
            Scalar::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
            Scalar::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
            _ => None,
        },
        ScalarType::Date => match value {
            Scalar::String(s) => parse_date(s.trim()).map(Value::Date),
            _ => None,
        },
        ScalarType::DateTime => match value {
            Scalar::String(s) => parse_date_time(s.trim()).map(Value::date_time),
            _ => None,
        },
        ScalarType::Duration => match value {
            Scalar::String(s) => parse_duration(s.trim()).map(Value::duration),
            Scalar::Int(i) => Some(Value::duration(Duration::seconds(i64::from(*i)))),
            Scalar::Float(f) => {
                let micros = (f * 1_000_000.0).trunc();
                if micros.is_finite() && micros >= i64::MIN as f64 && micros < i64::MAX as f64 {
                    Some(Value::duration(Duration::microseconds(micros as i64)))
                } else {
                    None
                }
            }
            _ => None,
        },
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .or_else(|| parse_date_time(s).map(|dt| dt.date()))
}

fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for format in DATE_TIME_FORMATS.iter() {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `[-][d.]hh:mm:ss[.f]`, the fraction has at most nine digits.
fn parse_duration(s: &str) -> Option<Duration> {
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let mut parts = s.split(':');
    let (first, minutes, seconds) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let (days, hours) = match first.split_once('.') {
        Some((d, h)) => (parse_digits(d)?, parse_digits(h)?),
        None => (0, parse_digits(first)?),
    };
    let minutes = parse_digits(minutes)?;
    let (seconds, fraction) = match seconds.split_once('.') {
        Some((s, f)) => (parse_digits(s)?, f),
        None => (parse_digits(seconds)?, ""),
    };
    if (days > 0 && hours > 23) || minutes > 59 || seconds > 59 {
        return None;
    }
    if fraction.len() > 9 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut nanos = 0i64;
    for (i, c) in fraction.chars().chain(std::iter::repeat('0')).take(9).enumerate() {
        nanos += i64::from(c.to_digit(10)?) * 10i64.pow(8 - i as u32);
    }
    let total_seconds = days
        .checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes * 60 + seconds)?;
    total_seconds.checked_mul(1_000_000)?;
    let total = Duration::seconds(total_seconds).checked_add(&Duration::nanoseconds(nanos))?;
    Some(if negative { -total } else { total })
}

fn parse_digits(s: &str) -> Option<i64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<i64>().ok()
}

#[cfg(test)]
mod test {
    use super::coerce;
    use crate::{desc::ScalarType, record::Value, request::Scalar};
    use chrono::{Duration, NaiveDate};

    #[test]
    fn numbers() {
        assert_eq!(coerce(&Scalar::Int(5), ScalarType::Int), Some(Value::Int(5)));
        assert_eq!(coerce(&Scalar::Float(5.5), ScalarType::Int), None);
        assert_eq!(coerce(&Scalar::from(" 42 "), ScalarType::Int), Some(Value::Int(42)));
        assert_eq!(coerce(&Scalar::from("4.2"), ScalarType::Int), None);
        assert_eq!(coerce(&Scalar::Bool(true), ScalarType::Int), Some(Value::Int(1)));
        assert_eq!(
            coerce(&Scalar::Float(5_000_000_000.0), ScalarType::Long),
            Some(Value::Long(5_000_000_000))
        );
        assert_eq!(coerce(&Scalar::Int(3), ScalarType::Float), Some(Value::Float(3.0)));
        assert_eq!(coerce(&Scalar::from("2.5"), ScalarType::Float), Some(Value::Float(2.5)));
        assert_eq!(coerce(&Scalar::from("nan"), ScalarType::Float), None);
    }

    #[test]
    fn text_and_bool() {
        assert_eq!(coerce(&Scalar::Int(1973), ScalarType::Text), Some(Value::Text("1973".into())));
        assert_eq!(coerce(&Scalar::Bool(false), ScalarType::Text), Some(Value::Text("false".into())));
        assert_eq!(coerce(&Scalar::from("TRUE"), ScalarType::Bool), Some(Value::Bool(true)));
        assert_eq!(coerce(&Scalar::Int(0), ScalarType::Bool), Some(Value::Bool(false)));
        assert_eq!(coerce(&Scalar::from("yes"), ScalarType::Bool), None);
        assert_eq!(coerce(&Scalar::Null, ScalarType::Bool), Some(Value::Null));
        assert_eq!(coerce(&Scalar::List(vec![Scalar::Int(1)]), ScalarType::Int), None);
    }

    #[test]
    fn temporal() {
        let date = NaiveDate::from_ymd_opt(1973, 3, 1).expect("valid date");
        assert_eq!(coerce(&Scalar::from("1973-03-01"), ScalarType::Date), Some(Value::Date(date)));
        assert_eq!(
            coerce(&Scalar::from("1973-03-01T10:00:00"), ScalarType::Date),
            Some(Value::Date(date))
        );
        assert_eq!(coerce(&Scalar::Int(1973), ScalarType::Date), None);
        let midnight = date.and_hms_opt(0, 0, 0).expect("valid time");
        assert_eq!(
            coerce(&Scalar::from("1973-03-01"), ScalarType::DateTime),
            Some(Value::DateTime(midnight))
        );
        let utc = date.and_hms_opt(8, 30, 0).expect("valid time");
        assert_eq!(
            coerce(&Scalar::from("1973-03-01T10:30:00+02:00"), ScalarType::DateTime),
            Some(Value::DateTime(utc))
        );
        let precise = date.and_hms_micro_opt(8, 30, 0, 250_000).expect("valid time");
        assert_eq!(
            coerce(&Scalar::from("1973-03-01 08:30:00.25"), ScalarType::DateTime),
            Some(Value::DateTime(precise))
        );
        assert_eq!(coerce(&Scalar::from("March 1st"), ScalarType::DateTime), None);
    }

    #[test]
    fn temporal_literals_truncate_to_microseconds() {
        let date = NaiveDate::from_ymd_opt(2019, 5, 1).expect("valid date");
        let midnight = date.and_hms_opt(0, 0, 0).expect("valid time");
        assert_eq!(
            coerce(&Scalar::from("2019-05-01T00:00:00.0000005"), ScalarType::DateTime),
            Some(Value::DateTime(midnight))
        );
        let one_micro = date.and_hms_micro_opt(0, 0, 0, 1).expect("valid time");
        assert_eq!(
            coerce(&Scalar::from("2019-05-01 00:00:00.000001999"), ScalarType::DateTime),
            Some(Value::DateTime(one_micro))
        );
        assert_eq!(
            coerce(&Scalar::from("00:00:00.0000015"), ScalarType::Duration),
            Some(Value::Duration(Duration::microseconds(1)))
        );
        assert_eq!(
            coerce(&Scalar::from("-00:00:00.000001999"), ScalarType::Duration),
            Some(Value::Duration(Duration::microseconds(-1)))
        );
        assert_eq!(
            coerce(&Scalar::Float(0.0000019), ScalarType::Duration),
            Some(Value::Duration(Duration::microseconds(1)))
        );
        assert_eq!(coerce(&Scalar::from("00:00:00.0000000001"), ScalarType::Duration), None);
    }

    #[test]
    fn durations() {
        assert_eq!(
            coerce(&Scalar::from("00:06:23"), ScalarType::Duration),
            Some(Value::Duration(Duration::seconds(383)))
        );
        assert_eq!(
            coerce(&Scalar::from("-1.02:00:00.5"), ScalarType::Duration),
            Some(Value::Duration(-Duration::milliseconds(93_600_500)))
        );
        assert_eq!(
            coerce(&Scalar::Int(90), ScalarType::Duration),
            Some(Value::Duration(Duration::seconds(90)))
        );
        assert_eq!(
            coerce(&Scalar::Float(1.5), ScalarType::Duration),
            Some(Value::Duration(Duration::milliseconds(1500)))
        );
        assert_eq!(coerce(&Scalar::from("6:61:00"), ScalarType::Duration), None);
        assert_eq!(coerce(&Scalar::from("1:2"), ScalarType::Duration), None);
        assert_eq!(coerce(&Scalar::from("a:b:c"), ScalarType::Duration), None);
    }
}
