//! Aggregation Tests
//!
//! Grouped and ungrouped aggregates through XML queries.

use crate::common::*;
use bigdecimal::BigDecimal;
use chrono::{TimeZone, Utc};
use recordfake::{Record, Value};

fn aggregate_value(result: &recordfake::QueryResult, row: usize, alias: &str) -> Value {
    result.records[row]
        .get(alias)
        .map(|v| v.unaliased().clone())
        .unwrap_or(Value::Null)
}

/// Three widgets sized 1, 2, 2 group into {1: 1} and {2: 2}
#[test]
fn test_group_by_size_counts() {
    let ctx = bare_context();
    for size in [1i64, 2, 2] {
        ctx.create(Record::new("widget").set("size", size)).unwrap();
    }

    let result = ctx
        .fetch(
            r#"<fetch aggregate="true">
                 <entity name="widget">
                   <attribute name="size" groupby="true" alias="size" />
                   <attribute name="widgetid" aggregate="count" alias="cnt" />
                   <order alias="size" />
                 </entity>
               </fetch>"#,
        )
        .unwrap();

    assert_eq!(result.records.len(), 2);
    assert_eq!(ints(&result, "size"), vec![1, 2]);
    assert_eq!(ints(&result, "cnt"), vec![1, 2]);
    assert!(!result.more_records);
}

#[test]
fn test_count_and_countcolumn_differ_on_nulls() {
    let ctx = bare_context();
    ctx.create(Record::new("opportunity").set("amount", 5i64)).unwrap();
    ctx.create(Record::new("opportunity").set("amount", 7i64)).unwrap();
    ctx.create(Record::new("opportunity")).unwrap();

    let result = ctx
        .fetch(
            r#"<fetch aggregate="true">
                 <entity name="opportunity">
                   <attribute name="opportunityid" aggregate="count" alias="rows" />
                   <attribute name="amount" aggregate="countcolumn" alias="priced" />
                   <attribute name="amount" aggregate="avg" alias="mean" />
                 </entity>
               </fetch>"#,
        )
        .unwrap();

    assert_eq!(aggregate_value(&result, 0, "rows"), Value::Int(3));
    assert_eq!(aggregate_value(&result, 0, "priced"), Value::Int(2));
    assert_eq!(
        aggregate_value(&result, 0, "mean"),
        Value::Decimal(BigDecimal::from(6))
    );
}

#[test]
fn test_month_grouping_buckets_dates() {
    let ctx = bare_context();
    for (month, day) in [(1, 5), (3, 1), (1, 20)] {
        ctx.create(
            Record::new("opportunity")
                .set("closedon", Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap()),
        )
        .unwrap();
    }

    let result = ctx
        .fetch(
            r#"<fetch aggregate="true">
                 <entity name="opportunity">
                   <attribute name="closedon" groupby="true" dategrouping="month" alias="month" />
                   <attribute name="opportunityid" aggregate="count" alias="n" />
                 </entity>
               </fetch>"#,
        )
        .unwrap();

    let mut counts = ints(&result, "n");
    counts.sort();
    assert_eq!(counts, vec![1, 2]);
}

#[test]
fn test_ungrouped_aggregate_over_nothing() {
    let ctx = bare_context();
    let result = ctx
        .fetch(
            r#"<fetch aggregate="true">
                 <entity name="opportunity">
                   <attribute name="opportunityid" aggregate="count" alias="n" />
                   <attribute name="amount" aggregate="sum" alias="total" />
                 </entity>
               </fetch>"#,
        )
        .unwrap();

    assert_eq!(result.records.len(), 1);
    assert_eq!(aggregate_value(&result, 0, "n"), Value::Int(0));
    assert!(aggregate_value(&result, 0, "total").is_null());
    assert_eq!(result.paging_cookie, None);
}
