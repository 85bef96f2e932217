//! Aggregation engine
//!
//! Groups filtered rows by the group-by columns (with optional date
//! bucketing) and evaluates aggregate functions per group. Output rows are
//! synthetic records of the target type: each group-by and aggregate alias
//! maps to a `Value::Aliased` carrying the source type and attribute.
//!
//! Every row lands in exactly one group, so for an ungrouped count the
//! result equals the filtered row count. An ungrouped query over no rows
//! still yields one row (count 0, other functions null).

use crate::executor::compare;
use crate::executor::lookup;
use crate::key::KeyPart;
use crate::plan::{AggregateDirective, AggregateFunction, AggregateSpec, DateGrouping, GroupBy};
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::Datelike;
use recordfake_core::{AliasedValue, Error, Record, Result, Value};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::mem::discriminant;
use tracing::debug;

type GroupKey = SmallVec<[KeyPart; 4]>;

/// Aggregate `rows` into one record per group, in first-seen group order.
///
/// # Errors
///
/// `UnsupportedAggregateType` when sum, avg, min or max meet a value kind
/// they cannot combine.
pub fn aggregate(rows: &[Record], spec: &AggregateSpec, root: &str) -> Result<Vec<Record>> {
    let mut index: FxHashMap<GroupKey, usize> = FxHashMap::default();
    let mut groups: Vec<Vec<&Record>> = Vec::new();
    for row in rows {
        let key: GroupKey = spec
            .group_by
            .iter()
            .map(|g| group_key(source(row, root, g.entity_alias.as_deref(), &g.attribute), g.date_grouping))
            .collect();
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }
    if groups.is_empty() && spec.group_by.is_empty() {
        groups.push(Vec::new());
    }

    let mut out = Vec::with_capacity(groups.len());
    for members in &groups {
        let mut record = Record::new(root);
        if let Some(first) = members.first() {
            for group in &spec.group_by {
                record.insert(group.alias.clone(), grouped_value(first, root, group));
            }
        }
        for directive in &spec.aggregates {
            let value = evaluate(directive, members, root)?;
            record.insert(
                directive.alias.clone(),
                Value::Aliased(AliasedValue::new(
                    directive.entity.clone(),
                    directive.attribute.clone(),
                    value,
                )),
            );
        }
        out.push(record);
    }
    debug!(
        target: "recordfake::engine",
        rows = rows.len(),
        groups = out.len(),
        "aggregated"
    );
    Ok(out)
}

fn source<'r>(row: &'r Record, root: &str, alias: Option<&str>, attribute: &str) -> &'r Value {
    lookup(row, root, alias, attribute).unaliased()
}

/// Bucket number of a date-time, or the hashable form of the raw value
fn group_key(value: &Value, grouping: DateGrouping) -> KeyPart {
    match (value, grouping) {
        (_, DateGrouping::Raw) => KeyPart::of(value),
        (Value::DateTime(at), grouping) => KeyPart::Bucket(bucket(at, grouping)),
        _ => KeyPart::of(value),
    }
}

fn bucket(at: &chrono::DateTime<chrono::Utc>, grouping: DateGrouping) -> i64 {
    match grouping {
        DateGrouping::Raw => at.timestamp(),
        DateGrouping::Day => i64::from(at.day()),
        DateGrouping::Week => i64::from(at.iso_week().week()),
        DateGrouping::Month => i64::from(at.month()),
        DateGrouping::Quarter => i64::from((at.month() - 1) / 3 + 1),
        DateGrouping::Year => i64::from(at.year()),
    }
}

/// Group-by output: the first row's value, even when keyed by a date bucket
fn grouped_value(first: &Record, root: &str, group: &GroupBy) -> Value {
    let value = source(first, root, group.entity_alias.as_deref(), &group.attribute);
    Value::Aliased(AliasedValue::new(
        group.entity.clone(),
        group.attribute.clone(),
        value.clone(),
    ))
}

fn evaluate(directive: &AggregateDirective, members: &[&Record], root: &str) -> Result<Value> {
    let mut values: Vec<&Value> = members
        .iter()
        .map(|row| source(row, root, directive.entity_alias.as_deref(), &directive.attribute))
        .filter(|v| !v.is_null())
        .collect();
    if directive.distinct {
        let mut seen = FxHashSet::default();
        values.retain(|v| seen.insert(KeyPart::of(v)));
    }
    let function = directive.function;
    match function {
        AggregateFunction::Count => Ok(Value::Int(members.len() as i64)),
        AggregateFunction::CountColumn => Ok(Value::Int(values.len() as i64)),
        AggregateFunction::Sum => sum(function, &values),
        AggregateFunction::Avg => average(function, &values),
        AggregateFunction::Min => extreme(function, &values, Ordering::Less),
        AggregateFunction::Max => extreme(function, &values, Ordering::Greater),
    }
}

/// First value, after checking that every value shares its kind and the
/// kind is one of `allowed`
fn uniform<'v>(
    function: AggregateFunction,
    values: &[&'v Value],
    allowed: fn(&Value) -> bool,
) -> Result<Option<&'v Value>> {
    let Some(first) = values.first().copied() else {
        return Ok(None);
    };
    let kind = discriminant(first);
    for value in values {
        if !allowed(value) || discriminant(*value) != kind {
            return Err(Error::unsupported_aggregate(function.name(), value.type_name()));
        }
    }
    Ok(Some(first))
}

fn numeric(value: &Value) -> bool {
    matches!(
        value,
        Value::Int(_) | Value::Float(_) | Value::Decimal(_) | Value::Money(_)
    )
}

fn orderable(value: &Value) -> bool {
    numeric(value) || matches!(value, Value::DateTime(_))
}

fn decimal_total(values: &[&Value]) -> BigDecimal {
    let mut total = BigDecimal::from(0);
    for value in values {
        match value {
            Value::Int(i) => total += BigDecimal::from(*i),
            Value::Decimal(d) | Value::Money(d) => total += d.clone(),
            _ => {}
        }
    }
    total
}

fn float_total(values: &[&Value]) -> f64 {
    values.iter().filter_map(|v| v.as_float()).sum()
}

fn sum(function: AggregateFunction, values: &[&Value]) -> Result<Value> {
    let Some(first) = uniform(function, values, numeric)? else {
        return Ok(Value::Null);
    };
    Ok(match first {
        Value::Int(_) => {
            let total = decimal_total(values);
            match total.to_i64() {
                Some(i) => Value::Int(i),
                None => Value::Decimal(total),
            }
        }
        Value::Float(_) => Value::Float(float_total(values)),
        Value::Money(_) => Value::Money(decimal_total(values)),
        _ => Value::Decimal(decimal_total(values)),
    })
}

/// Mean of the non-null values. Integer input averages to a decimal.
fn average(function: AggregateFunction, values: &[&Value]) -> Result<Value> {
    let Some(first) = uniform(function, values, numeric)? else {
        return Ok(Value::Null);
    };
    let count = values.len() as i64;
    Ok(match first {
        Value::Float(_) => Value::Float(float_total(values) / count as f64),
        Value::Money(_) => Value::Money(decimal_total(values) / BigDecimal::from(count)),
        _ => Value::Decimal(decimal_total(values) / BigDecimal::from(count)),
    })
}

fn extreme(function: AggregateFunction, values: &[&Value], wanted: Ordering) -> Result<Value> {
    let Some(mut best) = uniform(function, values, orderable)? else {
        return Ok(Value::Null);
    };
    for &value in values {
        if compare::compare(value, best, false) == Some(wanted) {
            best = value;
        }
    }
    Ok(best.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn directive(function: AggregateFunction, attribute: &str, alias: &str) -> AggregateDirective {
        AggregateDirective {
            entity: "opportunity".into(),
            entity_alias: None,
            attribute: attribute.into(),
            alias: alias.into(),
            function,
            distinct: false,
        }
    }

    fn group(attribute: &str, alias: &str, date_grouping: DateGrouping) -> GroupBy {
        GroupBy {
            entity: "opportunity".into(),
            entity_alias: None,
            attribute: attribute.into(),
            alias: alias.into(),
            date_grouping,
        }
    }

    fn inner(record: &Record, alias: &str) -> Value {
        record.get(alias).map(|v| v.unaliased().clone()).unwrap_or(Value::Null)
    }

    fn rows() -> Vec<Record> {
        vec![
            Record::new("opportunity").set("owner", "a").set("amount", 10i64),
            Record::new("opportunity").set("owner", "b").set("amount", 5i64),
            Record::new("opportunity").set("owner", "a").set("amount", 20i64),
            Record::new("opportunity").set("owner", "a"),
        ]
    }

    #[test]
    fn test_grouped_count_and_sum() {
        let spec = AggregateSpec {
            group_by: vec![group("owner", "owner", DateGrouping::Raw)],
            aggregates: vec![
                directive(AggregateFunction::Count, "amount", "n"),
                directive(AggregateFunction::CountColumn, "amount", "filled"),
                directive(AggregateFunction::Sum, "amount", "total"),
            ],
        };
        let out = aggregate(&rows(), &spec, "opportunity").unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(inner(&out[0], "owner"), Value::String("a".into()));
        assert_eq!(inner(&out[0], "n"), Value::Int(3));
        assert_eq!(inner(&out[0], "filled"), Value::Int(2));
        assert_eq!(inner(&out[0], "total"), Value::Int(30));
        assert_eq!(inner(&out[1], "total"), Value::Int(5));
    }

    #[test]
    fn test_avg_of_ints_is_decimal() {
        let spec = AggregateSpec {
            group_by: vec![],
            aggregates: vec![directive(AggregateFunction::Avg, "amount", "mean")],
        };
        let out = aggregate(&rows(), &spec, "opportunity").unwrap();
        let Value::Decimal(mean) = inner(&out[0], "mean") else {
            panic!("avg of ints should be a decimal");
        };
        assert!((mean.to_f64().unwrap() - 35.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_min_max() {
        let spec = AggregateSpec {
            group_by: vec![],
            aggregates: vec![
                directive(AggregateFunction::Min, "amount", "lo"),
                directive(AggregateFunction::Max, "amount", "hi"),
            ],
        };
        let out = aggregate(&rows(), &spec, "opportunity").unwrap();
        assert_eq!(inner(&out[0], "lo"), Value::Int(5));
        assert_eq!(inner(&out[0], "hi"), Value::Int(20));
    }

    #[test]
    fn test_ungrouped_over_nothing() {
        let spec = AggregateSpec {
            group_by: vec![],
            aggregates: vec![
                directive(AggregateFunction::Count, "amount", "n"),
                directive(AggregateFunction::Sum, "amount", "total"),
            ],
        };
        let out = aggregate(&[], &spec, "opportunity").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(inner(&out[0], "n"), Value::Int(0));
        assert_eq!(inner(&out[0], "total"), Value::Null);
    }

    #[test]
    fn test_grouped_over_nothing_is_empty() {
        let spec = AggregateSpec {
            group_by: vec![group("owner", "owner", DateGrouping::Raw)],
            aggregates: vec![directive(AggregateFunction::Count, "amount", "n")],
        };
        assert!(aggregate(&[], &spec, "opportunity").unwrap().is_empty());
    }

    #[test]
    fn test_sum_of_strings_unsupported() {
        let spec = AggregateSpec {
            group_by: vec![],
            aggregates: vec![directive(AggregateFunction::Sum, "owner", "total")],
        };
        let err = aggregate(&rows(), &spec, "opportunity").unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedAggregateType { ref function, ref value_type }
                if function == "sum" && value_type == "String"
        ));
    }

    #[test]
    fn test_distinct_count_column() {
        let mut d = directive(AggregateFunction::CountColumn, "owner", "owners");
        d.distinct = true;
        let spec = AggregateSpec {
            group_by: vec![],
            aggregates: vec![d],
        };
        let out = aggregate(&rows(), &spec, "opportunity").unwrap();
        assert_eq!(inner(&out[0], "owners"), Value::Int(2));
    }

    #[test]
    fn test_month_grouping() {
        let at = |m: u32, d: u32| Utc.with_ymd_and_hms(2024, m, d, 12, 0, 0).unwrap();
        let rows = vec![
            Record::new("opportunity").set("closed", at(1, 3)),
            Record::new("opportunity").set("closed", at(1, 28)),
            Record::new("opportunity").set("closed", at(4, 1)),
        ];
        let spec = AggregateSpec {
            group_by: vec![group("closed", "month", DateGrouping::Month)],
            aggregates: vec![directive(AggregateFunction::Count, "closed", "n")],
        };
        let out = aggregate(&rows, &spec, "opportunity").unwrap();
        assert_eq!(out.len(), 2);
        // representative is the first row's value, not the bucket number
        assert_eq!(inner(&out[0], "month"), Value::DateTime(at(1, 3)));
        assert_eq!(inner(&out[0], "n"), Value::Int(2));
        assert_eq!(inner(&out[1], "month"), Value::DateTime(at(4, 1)));
    }
}
