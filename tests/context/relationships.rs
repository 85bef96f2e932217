//! Relationship Tests
//!
//! Registration, associate/disassociate for both cardinalities, and related
//! record retrieval.

use crate::common::*;
use recordfake::{ColumnSet, EntityReference, Error, Record, RelationshipDefinition, Value};

fn many_to_many_context() -> recordfake::Context {
    let ctx = bare_context();
    ctx.register_relationship(RelationshipDefinition::many_to_many(
        "a_b", "a", "aid", "b", "bid", "ab",
    ))
    .unwrap();
    ctx
}

fn create(ctx: &recordfake::Context, logical_name: &str) -> EntityReference {
    EntityReference::new(logical_name, ctx.create(Record::new(logical_name)).unwrap())
}

// ============================================================================
// Many-to-many
// ============================================================================

/// One intersect record per association; disassociate removes only that one
#[test]
fn test_many_to_many_intersect_lifecycle() {
    let ctx = many_to_many_context();
    let a1 = create(&ctx, "a");
    let a2 = create(&ctx, "a");
    let b1 = create(&ctx, "b");

    ctx.associate("a_b", &a1, &[b1.clone()]).unwrap();
    let links = ctx.store().snapshot("ab");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].get("aid"), Some(&Value::Guid(a1.id)));
    assert_eq!(links[0].get("bid"), Some(&Value::Guid(b1.id)));

    ctx.associate("a_b", &a2, &[b1.clone()]).unwrap();
    assert_eq!(ctx.store().count("ab"), 2);

    ctx.disassociate("a_b", &a1, &[b1.clone()]).unwrap();
    let remaining = ctx.store().snapshot("ab");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].get("aid"), Some(&Value::Guid(a2.id)));
}

#[test]
fn test_associate_twice_is_duplicate() {
    let ctx = many_to_many_context();
    let a1 = create(&ctx, "a");
    let b1 = create(&ctx, "b");
    ctx.associate("a_b", &a1, &[b1.clone()]).unwrap();
    let err = ctx.associate("a_b", &a1, &[b1]).unwrap_err();
    assert!(err.is_duplicate_key());
}

#[test]
fn test_disassociate_unlinked_pair_is_not_found() {
    let ctx = many_to_many_context();
    let a1 = create(&ctx, "a");
    let b1 = create(&ctx, "b");
    assert!(ctx.disassociate("a_b", &a1, &[b1]).unwrap_err().is_not_found());
}

// ============================================================================
// One-to-many
// ============================================================================

#[test]
fn test_one_to_many_sets_and_clears_lookup() {
    let ctx = crm_context();
    let acme = account(&ctx, "Acme");
    let abe = contact(&ctx, "Abe", None);

    ctx.associate("account_contacts", &acme, &[abe.clone()]).unwrap();
    let linked = ctx.retrieve("contact", abe.id, &ColumnSet::AllColumns).unwrap();
    assert_eq!(
        linked.get("parentcustomerid").and_then(Value::as_id),
        Some(acme.id)
    );

    ctx.disassociate("account_contacts", &acme, &[abe.clone()]).unwrap();
    let cleared = ctx.retrieve("contact", abe.id, &ColumnSet::AllColumns).unwrap();
    assert!(cleared.get("parentcustomerid").map_or(true, Value::is_null));
}

#[test]
fn test_retrieve_with_related_returns_children() {
    let ctx = crm_context();
    let acme = account(&ctx, "Acme");
    let other = account(&ctx, "Other");
    contact(&ctx, "Abe", Some(&acme));
    contact(&ctx, "Bea", Some(&acme));
    contact(&ctx, "Cy", Some(&other));

    let (record, children) = ctx
        .retrieve_with_related("account", acme.id, &ColumnSet::new(&["name"]), "account_contacts")
        .unwrap();
    assert_eq!(record.get("name"), Some(&Value::from("Acme")));

    let mut names: Vec<&str> = children
        .iter()
        .filter_map(|c| c.get("fullname").and_then(Value::as_str))
        .collect();
    names.sort();
    assert_eq!(names, vec!["Abe", "Bea"]);
}

#[test]
fn test_unknown_relationship_name() {
    let ctx = crm_context();
    let acme = account(&ctx, "Acme");
    let err = ctx
        .retrieve_with_related("account", acme.id, &ColumnSet::AllColumns, "nope")
        .unwrap_err();
    assert_eq!(err, Error::UnknownRelationship { name: "nope".into() });
}

#[test]
fn test_register_same_name_twice_fails() {
    let ctx = crm_context();
    let err = ctx
        .register_relationship(RelationshipDefinition::one_to_many(
            "account_contacts",
            "account",
            "accountid",
            "contact",
            "parentcustomerid",
        ))
        .unwrap_err();
    assert!(err.is_duplicate_key());
}
