//! Query Tests
//!
//! Paging, joins, distinct, hierarchy and string matching through the
//! facade, in both query forms.

use crate::common::*;
use recordfake::{
    ColumnSet, ConditionExpression, ConditionOperator, Context, ContextConfig, EntityReference,
    Error, FilterExpression, JoinOperator, LinkEntity, OrderType, Query, QueryByAttribute,
    QueryExpression, Record,
};

fn query(expression: QueryExpression) -> Query {
    Query::Expression(expression)
}

// ============================================================================
// Paging
// ============================================================================

/// Page size 2 over 5 matches: 2, 2, then 1 with no more records
#[test]
fn test_pages_walk_all_matches() {
    let ctx = bare_context();
    for name in ["e", "d", "c", "b", "a"] {
        account(&ctx, name);
    }
    let page = |n| {
        ctx.retrieve_multiple(&query(
            QueryExpression::new("account")
                .order("name", OrderType::Ascending)
                .page(n, 2),
        ))
        .unwrap()
    };

    let first = page(1);
    assert_eq!(strings(&first, "name"), vec!["a", "b"]);
    assert!(first.more_records);

    let second = page(2);
    assert_eq!(strings(&second, "name"), vec!["c", "d"]);
    assert!(second.more_records);

    let third = page(3);
    assert_eq!(strings(&third, "name"), vec!["e"]);
    assert!(!third.more_records);
}

#[test]
fn test_configured_default_page_size() {
    let ctx = Context::with_config(ContextConfig {
        default_page_size: 3,
        ..ContextConfig::default()
    });
    for name in ["a", "b", "c", "d"] {
        account(&ctx, name);
    }
    let result = ctx
        .retrieve_multiple(&query(QueryExpression::new("account")))
        .unwrap();
    assert_eq!(result.records.len(), 3);
    assert!(result.more_records);
    assert!(result.paging_cookie.is_some());
}

#[test]
fn test_page_past_end_is_empty() {
    let ctx = bare_context();
    account(&ctx, "a");
    let result = ctx
        .retrieve_multiple(&query(QueryExpression::new("account").page(4, 10)))
        .unwrap();
    assert!(result.records.is_empty());
    assert!(!result.more_records);
}

// ============================================================================
// Joins
// ============================================================================

/// Outer join plus a null check on the joined key finds parents without children
#[test]
fn test_outer_join_null_finds_childless_accounts() {
    let ctx = crm_context();
    let acme = account(&ctx, "Acme");
    account(&ctx, "Lonely");
    contact(&ctx, "Abe", Some(&acme));

    let mut orphans = FilterExpression::default();
    orphans.push(
        ConditionExpression::new("contactid", ConditionOperator::Null, vec![]).with_entity("c"),
    );
    let expression = ctx
        .retrieve_multiple(&query(
            QueryExpression::new("account")
                .columns(ColumnSet::new(&["name"]))
                .link(
                    LinkEntity::new(
                        "account",
                        "contact",
                        "accountid",
                        "parentcustomerid",
                        JoinOperator::LeftOuter,
                    )
                    .alias("c"),
                )
                .criteria(orphans),
        ))
        .unwrap();
    assert_eq!(strings(&expression, "name"), vec!["Lonely"]);

    let xml = ctx
        .fetch(
            r#"<fetch>
                 <entity name="account">
                   <attribute name="name" />
                   <link-entity name="contact" from="parentcustomerid" to="accountid"
                                link-type="outer" alias="c" />
                   <filter>
                     <condition entityname="c" attribute="contactid" operator="null" />
                   </filter>
                 </entity>
               </fetch>"#,
        )
        .unwrap();
    assert_eq!(xml, expression);
}

#[test]
fn test_join_through_named_relationship() {
    let ctx = crm_context();
    let acme = account(&ctx, "Acme");
    account(&ctx, "Empty");
    contact(&ctx, "Abe", Some(&acme));
    contact(&ctx, "Bea", Some(&acme));

    let result = ctx
        .retrieve_multiple(&query(
            QueryExpression::new("account")
                .columns(ColumnSet::new(&["name"]))
                .link(
                    LinkEntity::through("account_contacts", "contact", JoinOperator::Inner)
                        .alias("c")
                        .with_columns(ColumnSet::new(&["fullname"])),
                )
                .order("name", OrderType::Ascending),
        ))
        .unwrap();
    assert_eq!(strings(&result, "name"), vec!["Acme", "Acme"]);
    let mut children = strings(&result, "c.fullname");
    children.sort();
    assert_eq!(children, vec!["Abe", "Bea"]);
}

#[test]
fn test_join_without_relationship_fails() {
    let ctx = bare_context();
    account(&ctx, "Acme");
    let err = ctx
        .fetch(r#"<fetch><entity name="account"><link-entity name="lead" /></entity></fetch>"#)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownRelationship { .. }));
}

// ============================================================================
// Distinct
// ============================================================================

/// Top counts distinct rows, not raw rows
#[test]
fn test_distinct_applies_before_top() {
    let ctx = crm_context();
    let acme = account(&ctx, "Acme");
    let globex = account(&ctx, "Globex");
    let initech = account(&ctx, "Initech");
    for parent in [&acme, &acme, &acme, &globex, &initech] {
        contact(&ctx, "someone", Some(parent));
    }

    let result = ctx
        .fetch(
            r#"<fetch distinct="true" top="2">
                 <entity name="account">
                   <attribute name="name" />
                   <order attribute="name" />
                   <link-entity name="contact" from="parentcustomerid" to="accountid" alias="c" />
                 </entity>
               </fetch>"#,
        )
        .unwrap();
    assert_eq!(strings(&result, "name"), vec!["Acme", "Globex"]);
}

// ============================================================================
// Conditions
// ============================================================================

#[test]
fn test_string_matching_ignores_case_by_default() {
    let ctx = bare_context();
    account(&ctx, "Contoso");
    account(&ctx, "Fabrikam");

    let like = ctx
        .retrieve_multiple(&query(QueryExpression::new("account").condition(
            "name",
            ConditionOperator::Like,
            vec!["con%".into()],
        )))
        .unwrap();
    assert_eq!(strings(&like, "name"), vec!["Contoso"]);

    let by_attribute = ctx
        .retrieve_multiple(&Query::ByAttribute(
            QueryByAttribute::new("account").attribute("name", "FABRIKAM"),
        ))
        .unwrap();
    assert_eq!(strings(&by_attribute, "name"), vec!["Fabrikam"]);
}

#[test]
fn test_case_sensitive_strings_when_configured() {
    let ctx = Context::with_config(ContextConfig {
        case_insensitive_strings: false,
        ..ContextConfig::default()
    });
    account(&ctx, "Contoso");
    let result = ctx
        .retrieve_multiple(&query(QueryExpression::new("account").condition(
            "name",
            ConditionOperator::Equal,
            vec!["contoso".into()],
        )))
        .unwrap();
    assert!(result.records.is_empty());
}

#[test]
fn test_under_walks_account_hierarchy() {
    let ctx = crm_context();
    let root = account(&ctx, "Root");
    let child = ctx
        .create(
            Record::new("account")
                .set("name", "Child")
                .set("parentaccountid", root.clone()),
        )
        .unwrap();
    ctx.create(
        Record::new("account")
            .set("name", "Grandchild")
            .set("parentaccountid", EntityReference::new("account", child)),
    )
    .unwrap();
    account(&ctx, "Unrelated");

    let result = ctx
        .retrieve_multiple(&query(
            QueryExpression::new("account")
                .condition("accountid", ConditionOperator::Under, vec![root.id.into()])
                .order("name", OrderType::Ascending),
        ))
        .unwrap();
    assert_eq!(strings(&result, "name"), vec!["Child", "Grandchild"]);
}

/// Requesting a column set twice gives the same records as requesting it once
#[test]
fn test_projection_is_idempotent() {
    let ctx = bare_context();
    ctx.create(Record::new("account").set("name", "a").set("city", "x"))
        .unwrap();
    let once = ctx
        .retrieve_multiple(&query(
            QueryExpression::new("account").columns(ColumnSet::new(&["name"])),
        ))
        .unwrap();
    let twice = ctx
        .retrieve_multiple(&query(
            QueryExpression::new("account").columns(ColumnSet::new(&["name", "name"])),
        ))
        .unwrap();
    assert_eq!(once, twice);
    assert!(!once.records[0].contains("city"));
}
