//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use recordfake::{
    init_tracing, Context, ContextConfig, EntityReference, QueryResult, Record,
    RelationshipDefinition, SchemaRegistry, Value,
};
use std::sync::Arc;

// ============================================================================
// Contexts
// ============================================================================

/// Schema used by the CRM-shaped fixtures
pub fn crm_schema() -> SchemaRegistry {
    SchemaRegistry::new()
        .primary_name("account", "name")
        .primary_name("contact", "fullname")
        .with_option_label("account", "industrycode", 1, "Accounting")
        .with_option_label("account", "industrycode", 2, "Retail")
        .with_boolean_label("contact", "donotemail", true, "Do Not Allow")
        .versioned("account")
        .hierarchy("account", "parentaccountid")
}

/// Empty context without schema or relationships
pub fn bare_context() -> Context {
    init_tracing();
    Context::new()
}

/// Context with the CRM schema and `account_contacts` registered
pub fn crm_context() -> Context {
    init_tracing();
    let ctx = Context::with_schema(ContextConfig::default(), Arc::new(crm_schema()));
    ctx.register_relationship(RelationshipDefinition::one_to_many(
        "account_contacts",
        "account",
        "accountid",
        "contact",
        "parentcustomerid",
    ))
    .unwrap();
    ctx
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn account(ctx: &Context, name: &str) -> EntityReference {
    let id = ctx.create(Record::new("account").set("name", name)).unwrap();
    EntityReference::new("account", id)
}

pub fn contact(ctx: &Context, name: &str, parent: Option<&EntityReference>) -> EntityReference {
    let mut record = Record::new("contact").set("fullname", name);
    if let Some(parent) = parent {
        record.insert("parentcustomerid", parent.clone());
    }
    EntityReference::new("contact", ctx.create(record).unwrap())
}

// ============================================================================
// Result helpers
// ============================================================================

/// String values of one column, aliases unwrapped
pub fn strings(result: &QueryResult, attribute: &str) -> Vec<String> {
    result
        .records
        .iter()
        .map(|r| match r.get(attribute).map(Value::unaliased) {
            Some(Value::String(s)) => s.clone(),
            other => format!("{:?}", other),
        })
        .collect()
}

/// Integer values of one column, aliases unwrapped
pub fn ints(result: &QueryResult, attribute: &str) -> Vec<i64> {
    result
        .records
        .iter()
        .filter_map(|r| r.get(attribute).map(Value::unaliased).and_then(Value::as_int))
        .collect()
}
