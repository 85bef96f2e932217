//! CRUD and Bulk Tests
//!
//! Create/retrieve/update/delete through the facade, optimistic versions,
//! name and label resolution on retrieve, and the sequential bulk contract.

use crate::common::*;
use recordfake::{ColumnSet, EntityReference, Error, Record, UpsertOutcome, Uuid, Value};

// ============================================================================
// Create / Retrieve
// ============================================================================

#[test]
fn test_create_assigns_id_and_primary_attribute() {
    let ctx = bare_context();
    let id = ctx.create(Record::new("account").set("name", "Acme")).unwrap();
    assert!(!id.is_nil());
    let stored = ctx.retrieve("account", id, &ColumnSet::AllColumns).unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.get("accountid"), Some(&Value::Guid(id)));
}

#[test]
fn test_create_duplicate_id_fails() {
    let ctx = bare_context();
    let id = Uuid::new_v4();
    ctx.create(Record::with_id("account", id)).unwrap();
    let err = ctx.create(Record::with_id("account", id)).unwrap_err();
    assert!(err.is_duplicate_key());
}

#[test]
fn test_retrieve_missing_is_not_found() {
    let ctx = bare_context();
    let err = ctx
        .retrieve("account", Uuid::new_v4(), &ColumnSet::AllColumns)
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_retrieve_resolves_names_and_labels() {
    let ctx = crm_context();
    let acme = ctx
        .create(
            Record::new("account")
                .set("name", "Acme")
                .set("industrycode", Value::OptionSet(2)),
        )
        .unwrap();
    let abe = contact(&ctx, "Abe", Some(&EntityReference::new("account", acme)));

    let account = ctx.retrieve("account", acme, &ColumnSet::AllColumns).unwrap();
    assert_eq!(account.formatted_values["industrycode"], "Retail");

    let contact = ctx
        .retrieve("contact", abe.id, &ColumnSet::new(&["parentcustomerid"]))
        .unwrap();
    let parent = contact
        .get("parentcustomerid")
        .and_then(Value::as_reference)
        .unwrap();
    assert_eq!(parent.name.as_deref(), Some("Acme"));
    assert!(!contact.contains("fullname"));
}

// ============================================================================
// Update
// ============================================================================

/// A partial update changes only the attributes it carries
#[test]
fn test_partial_update_keeps_untouched_attributes() {
    let ctx = bare_context();
    let id = ctx
        .create(
            Record::new("account")
                .set("name", "Acme")
                .set("city", "Oslo")
                .set("employees", 10i64),
        )
        .unwrap();

    ctx.update(&Record::with_id("account", id).set("city", "Bergen"))
        .unwrap();

    let stored = ctx.retrieve("account", id, &ColumnSet::AllColumns).unwrap();
    assert_eq!(stored.get("city"), Some(&Value::from("Bergen")));
    assert_eq!(stored.get("name"), Some(&Value::from("Acme")));
    assert_eq!(stored.get("employees"), Some(&Value::Int(10)));
}

#[test]
fn test_update_missing_is_not_found() {
    let ctx = bare_context();
    let err = ctx
        .update(&Record::with_id("account", Uuid::new_v4()).set("name", "x"))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_versioned_type_stamps_version_number() {
    let ctx = crm_context();
    let acme = account(&ctx, "Acme");
    let created = ctx.retrieve("account", acme.id, &ColumnSet::AllColumns).unwrap();
    let first = created.get("versionnumber").and_then(Value::as_int).unwrap();

    let next = ctx
        .update(&Record::with_id("account", acme.id).set("name", "Acme Ltd"))
        .unwrap();
    let updated = ctx.retrieve("account", acme.id, &ColumnSet::AllColumns).unwrap();
    assert!(next as i64 > first);
    assert_eq!(updated.get("versionnumber"), Some(&Value::Int(next as i64)));

    // contacts are not versioned
    let abe = contact(&ctx, "Abe", None);
    let stored = ctx.retrieve("contact", abe.id, &ColumnSet::AllColumns).unwrap();
    assert!(!stored.contains("versionnumber"));
}

#[test]
fn test_update_if_version_rejects_stale_version() {
    let ctx = bare_context();
    let id = ctx.create(Record::new("account").set("name", "a")).unwrap();
    let stale = ctx.retrieve("account", id, &ColumnSet::AllColumns).unwrap().row_version;
    let current = ctx
        .update_if_version(&Record::with_id("account", id).set("name", "b"), stale)
        .unwrap();

    let err = ctx
        .update_if_version(&Record::with_id("account", id).set("name", "c"), stale)
        .unwrap_err();
    assert_eq!(
        err,
        Error::ConcurrencyConflict {
            expected: stale,
            actual: current
        }
    );
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn test_delete_twice_fails_second_time() {
    let ctx = bare_context();
    let id = ctx.create(Record::new("account")).unwrap();
    ctx.delete("account", id).unwrap();
    assert!(ctx.delete("account", id).unwrap_err().is_not_found());
}

// ============================================================================
// Bulk
// ============================================================================

/// Bulk writes are sequential: records before the failing one stay stored
#[test]
fn test_create_many_keeps_earlier_writes_on_failure() {
    let ctx = bare_context();
    let taken = ctx.create(Record::new("account").set("name", "taken")).unwrap();

    let err = ctx
        .create_many(vec![
            Record::new("account").set("name", "first"),
            Record::with_id("account", taken),
            Record::new("account").set("name", "never"),
        ])
        .unwrap_err();

    assert!(err.is_duplicate_key());
    assert_eq!(ctx.store().count("account"), 2);
}

#[test]
fn test_upsert_many_reports_outcomes() {
    let ctx = bare_context();
    let existing = ctx.create(Record::new("account").set("name", "a")).unwrap();
    let fresh = Uuid::new_v4();

    let outcomes = ctx
        .upsert_many(vec![
            Record::with_id("account", existing).set("name", "a2"),
            Record::with_id("account", fresh).set("name", "b"),
        ])
        .unwrap();

    assert_eq!(
        outcomes,
        vec![UpsertOutcome::Updated(existing), UpsertOutcome::Created(fresh)]
    );
    let stored = ctx.retrieve("account", existing, &ColumnSet::AllColumns).unwrap();
    assert_eq!(stored.get("name"), Some(&Value::from("a2")));
}

#[test]
fn test_update_and_delete_many() {
    let ctx = bare_context();
    let ids = ctx
        .create_many(vec![Record::new("account"), Record::new("account")])
        .unwrap();

    let updates: Vec<Record> = ids
        .iter()
        .map(|id| Record::with_id("account", *id).set("name", "bulk"))
        .collect();
    ctx.update_many(&updates).unwrap();
    for id in &ids {
        let stored = ctx.retrieve("account", *id, &ColumnSet::AllColumns).unwrap();
        assert_eq!(stored.get("name"), Some(&Value::from("bulk")));
    }

    let targets: Vec<(String, Uuid)> = ids.iter().map(|id| ("account".to_string(), *id)).collect();
    ctx.delete_many(&targets).unwrap();
    assert_eq!(ctx.store().count("account"), 0);
}
