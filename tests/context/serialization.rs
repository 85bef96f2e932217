//! Serialization Tests
//!
//! Query objects, results and errors survive a JSON round trip, so suites
//! can snapshot or ship them between processes.

use crate::common::*;
use recordfake::{
    ColumnSet, ConditionOperator, Error, JoinOperator, LinkEntity, OrderType, Query,
    QueryExpression, QueryResult,
};

#[test]
fn test_query_round_trips_and_runs_the_same() {
    let ctx = crm_context();
    let acme = account(&ctx, "Acme");
    contact(&ctx, "Abe", Some(&acme));
    contact(&ctx, "Bea", Some(&acme));

    let query = Query::Expression(
        QueryExpression::new("contact")
            .columns(ColumnSet::new(&["fullname", "parentcustomerid"]))
            .condition("fullname", ConditionOperator::NotNull, vec![])
            .link(
                LinkEntity::new("contact", "account", "parentcustomerid", "accountid", JoinOperator::Inner)
                    .alias("a")
                    .with_columns(ColumnSet::new(&["name"])),
            )
            .order("fullname", OrderType::Descending),
    );
    let json = serde_json::to_string(&query).unwrap();
    let decoded: Query = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, query);

    let direct = ctx.retrieve_multiple(&query).unwrap();
    let via_json = ctx.retrieve_multiple(&decoded).unwrap();
    assert_eq!(direct, via_json);
    assert_eq!(strings(&direct, "fullname"), vec!["Bea", "Abe"]);
}

#[test]
fn test_result_round_trips() {
    let ctx = crm_context();
    let acme = account(&ctx, "Acme");
    contact(&ctx, "Abe", Some(&acme));

    let result = ctx
        .fetch(
            r#"<fetch>
                 <entity name="contact">
                   <attribute name="fullname" />
                   <attribute name="parentcustomerid" />
                   <link-entity name="account" from="accountid" to="parentcustomerid" alias="a">
                     <attribute name="name" />
                   </link-entity>
                 </entity>
               </fetch>"#,
        )
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["more_records"], serde_json::json!(false));

    let decoded: QueryResult = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, result);
    assert_eq!(strings(&decoded, "a.name"), vec!["Acme"]);
}

#[test]
fn test_error_round_trips() {
    let err = Error::UnsupportedAggregateType {
        function: "sum".into(),
        value_type: "String".into(),
    };
    let json = serde_json::to_string(&err).unwrap();
    let decoded: Error = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, err);
    assert_eq!(decoded.to_string(), "unsupported aggregate type: sum over String");
}
