//! Value comparison and literal coercion
//!
//! Filters and sorting compare values across the closed set of kinds:
//! - nulls sort before everything else
//! - numeric kinds (int, float, decimal, money, option code) compare by value
//! - strings compare case-insensitively unless disabled
//! - references compare by `(type, id)`; guids compare with references by id
//! - anything else, NaN included, is incomparable (`None`)
//!
//! Sorting uses [`sort_order`], a total order: kind rank first, then a
//! per-kind key. Floats order by `total_cmp`, so NaN sorts after every number.

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use recordfake_core::{EntityReference, Value};
use std::cmp::Ordering;
use std::str::FromStr;
use uuid::Uuid;

/// Compare two values, looking through aliases
pub(crate) fn compare(a: &Value, b: &Value, case_insensitive: bool) -> Option<Ordering> {
    match (a.unaliased(), b.unaliased()) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        (Value::String(x), Value::String(y)) => Some(compare_text(x, y, case_insensitive)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::Guid(x), Value::Guid(y)) => Some(x.cmp(y)),
        (Value::Guid(x), Value::Reference(r)) => Some(x.cmp(&r.id)),
        (Value::Reference(r), Value::Guid(y)) => Some(r.id.cmp(y)),
        (Value::Reference(x), Value::Reference(y)) => Some(compare_references(x, y)),
        (Value::MultiOptionSet(x), Value::MultiOptionSet(y)) => {
            let mut x = x.clone();
            let mut y = y.clone();
            x.sort_unstable();
            y.sort_unstable();
            Some(x.cmp(&y))
        }
        (x, y) => compare_numeric(x, y),
    }
}

/// Equality as filters see it
pub(crate) fn equal(a: &Value, b: &Value, case_insensitive: bool) -> bool {
    compare(a, b, case_insensitive) == Some(Ordering::Equal)
}

/// Total order for sorting: kind rank, then a key within the kind.
///
/// References order by display name (unnamed first), then type, then id.
pub(crate) fn sort_order(a: &Value, b: &Value, case_insensitive: bool) -> Ordering {
    let (a, b) = (a.unaliased(), b.unaliased());
    rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => compare_text(x, y, case_insensitive),
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        (Value::MultiOptionSet(x), Value::MultiOptionSet(y)) => {
            let mut x = x.clone();
            let mut y = y.clone();
            x.sort_unstable();
            y.sort_unstable();
            x.cmp(&y)
        }
        _ => match rank(a) {
            NUMERIC_RANK => numeric_order(a, b),
            IDENTITY_RANK => identity_order(a, b, case_insensitive),
            _ => Ordering::Equal,
        },
    })
}

const NUMERIC_RANK: u8 = 2;
const IDENTITY_RANK: u8 = 6;

/// Approximate value under `total_cmp`, exact value breaking ties
fn numeric_order(a: &Value, b: &Value) -> Ordering {
    let approx = |v: &Value| approximate(v).unwrap_or(f64::NAN);
    approx(a)
        .total_cmp(&approx(b))
        .then_with(|| exact(a).cmp(&exact(b)))
}

fn identity_order(a: &Value, b: &Value, case_insensitive: bool) -> Ordering {
    let (a_name, a_type, a_id) = identity_parts(a);
    let (b_name, b_type, b_id) = identity_parts(b);
    let by_name = match (a_name, b_name) {
        (Some(x), Some(y)) => compare_text(x, y, case_insensitive),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_name
        .then_with(|| a_type.cmp(b_type))
        .then_with(|| a_id.cmp(&b_id))
}

fn identity_parts(value: &Value) -> (Option<&str>, &str, Uuid) {
    match value {
        Value::Reference(r) => (r.name.as_deref(), r.logical_name.as_str(), r.id),
        Value::Guid(id) => (None, "", *id),
        _ => (None, "", Uuid::nil()),
    }
}

fn rank(value: &Value) -> u8 {
    match value.unaliased() {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) | Value::Decimal(_) | Value::Money(_) | Value::OptionSet(_) => {
            NUMERIC_RANK
        }
        Value::MultiOptionSet(_) => 3,
        Value::DateTime(_) => 4,
        Value::String(_) => 5,
        Value::Guid(_) | Value::Reference(_) => IDENTITY_RANK,
        Value::Aliased(_) => 7,
    }
}

pub(crate) fn compare_text(x: &str, y: &str, case_insensitive: bool) -> Ordering {
    if case_insensitive {
        x.chars()
            .flat_map(char::to_lowercase)
            .cmp(y.chars().flat_map(char::to_lowercase))
    } else {
        x.cmp(y)
    }
}

fn compare_references(x: &EntityReference, y: &EntityReference) -> Ordering {
    x.logical_name.cmp(&y.logical_name).then_with(|| x.id.cmp(&y.id))
}

fn compare_numeric(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Decimal(x) | Value::Money(x), Value::Decimal(y) | Value::Money(y)) => Some(x.cmp(y)),
        _ => match (exact(a), exact(b)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => approximate(a)?.partial_cmp(&approximate(b)?),
        },
    }
}

fn exact(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Int(i) => Some(BigDecimal::from(*i)),
        Value::OptionSet(code) => Some(BigDecimal::from(i64::from(*code))),
        Value::Decimal(d) | Value::Money(d) => Some(d.clone()),
        _ => None,
    }
}

fn approximate(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::OptionSet(code) => Some(f64::from(*code)),
        Value::Float(f) => Some(*f),
        Value::Decimal(d) | Value::Money(d) => d.to_f64(),
        _ => None,
    }
}

/// Convert a string literal to the kind of `stored`, so that XML operands
/// compare against typed attributes. Unparseable literals are returned as-is
/// and simply fail to compare.
pub(crate) fn coerce(literal: &Value, stored: &Value) -> Value {
    let Value::String(text) = literal.unaliased() else {
        return literal.clone();
    };
    let text = text.trim();
    let coerced = match stored.unaliased() {
        Value::Int(_) => text.parse::<i64>().ok().map(Value::Int),
        Value::Float(_) => text.parse::<f64>().ok().map(Value::Float),
        Value::Decimal(_) => BigDecimal::from_str(text).ok().map(Value::Decimal),
        Value::Money(_) => BigDecimal::from_str(text).ok().map(Value::Money),
        Value::Bool(_) => parse_bool(text).map(Value::Bool),
        Value::DateTime(_) => parse_datetime(text).map(Value::DateTime),
        Value::Guid(_) | Value::Reference(_) => parse_guid(text).map(Value::Guid),
        Value::OptionSet(_) | Value::MultiOptionSet(_) => {
            text.parse::<i32>().ok().map(Value::OptionSet)
        }
        _ => None,
    };
    coerced.unwrap_or_else(|| literal.clone())
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" => Some(true),
        "0" => Some(false),
        t if t.eq_ignore_ascii_case("true") => Some(true),
        t if t.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn parse_guid(text: &str) -> Option<Uuid> {
    Uuid::parse_str(text.trim_start_matches('{').trim_end_matches('}')).ok()
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS` and
/// `YYYY-MM-DD`; naive forms are read as UTC.
pub(crate) fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
