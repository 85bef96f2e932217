//! Property Tests
//!
//! Invariants checked over generated data: create/retrieve round trip,
//! idempotent projection, distinct-before-top and aggregate completeness.

use crate::common::*;
use proptest::prelude::*;
use recordfake::{ColumnSet, QueryExpression, Record, Value};

fn attribute_values() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-z]{0,8}".prop_map(Value::String),
        any::<i64>().prop_map(Value::Int),
        any::<bool>().prop_map(Value::Bool),
        (0i32..5).prop_map(Value::OptionSet),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every attribute written on create reads back unchanged
    #[test]
    fn prop_create_retrieve_round_trip(
        attributes in prop::collection::btree_map("[a-z]{1,6}", attribute_values(), 0..8),
    ) {
        let ctx = bare_context();
        let mut record = Record::new("widget");
        for (name, value) in &attributes {
            record.insert(name.clone(), value.clone());
        }
        let id = ctx.create(record).unwrap();
        let stored = ctx.retrieve("widget", id, &ColumnSet::AllColumns).unwrap();
        for (name, value) in &attributes {
            if name != "widgetid" {
                prop_assert_eq!(stored.get(name), Some(value));
            }
        }
    }

    /// Projecting the result of a projection changes nothing
    #[test]
    fn prop_projection_idempotent(
        columns in prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d"]), 0..4),
    ) {
        let ctx = bare_context();
        ctx.create(
            Record::new("widget").set("a", 1i64).set("b", "x").set("c", true).set("d", 2.5),
        )
        .unwrap();
        let columns = ColumnSet::new(columns.as_slice());
        let once = ctx
            .retrieve_multiple(&QueryExpression::new("widget").columns(columns.clone()).into())
            .unwrap();
        let mut twice = once.records[0].clone();
        if let ColumnSet::Columns(names) = &columns {
            twice.project(names);
        }
        prop_assert_eq!(&once.records[0], &twice);
    }

    /// With distinct, top counts distinct rows
    #[test]
    fn prop_distinct_before_top(
        children in prop::collection::vec(0usize..4, 1..6),
        top in 1usize..8,
    ) {
        let ctx = crm_context();
        for (i, count) in children.iter().enumerate() {
            let parent = account(&ctx, &format!("acct-{}", i));
            for _ in 0..*count {
                contact(&ctx, "child", Some(&parent));
            }
        }
        let with_children = children.iter().filter(|c| **c > 0).count();

        let result = ctx
            .fetch(&format!(
                r#"<fetch distinct="true" top="{}">
                     <entity name="account">
                       <attribute name="name" />
                       <link-entity name="contact" from="parentcustomerid" to="accountid" />
                     </entity>
                   </fetch>"#,
                top
            ))
            .unwrap();
        prop_assert_eq!(result.records.len(), top.min(with_children));
    }

    /// Grouped counts add up to the filtered row count
    #[test]
    fn prop_group_counts_sum_to_filtered_rows(
        rows in prop::collection::vec((0u8..3, prop::option::of(0i64..50)), 0..30),
    ) {
        let ctx = bare_context();
        for (colour, size) in &rows {
            let mut record = Record::new("widget").set("colour", format!("c{}", colour));
            if let Some(size) = size {
                record.insert("size", *size);
            }
            ctx.create(record).unwrap();
        }
        let expected = rows.iter().filter(|(_, size)| size.is_some()).count() as i64;

        let result = ctx
            .fetch(
                r#"<fetch aggregate="true">
                     <entity name="widget">
                       <attribute name="colour" groupby="true" alias="colour" />
                       <attribute name="widgetid" aggregate="count" alias="n" />
                       <filter><condition attribute="size" operator="not-null" /></filter>
                     </entity>
                   </fetch>"#,
            )
            .unwrap();
        let total: i64 = ints(&result, "n").iter().sum();
        prop_assert_eq!(total, expected);
    }
}
