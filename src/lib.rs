//! recordfake - in-memory stand-in for a business-records service
//!
//! Test suites use recordfake in place of the real service: records are
//! stored per type in memory, relationships are registered up front, and
//! queries written either as structured query objects or as XML documents
//! run through one shared engine.
//!
//! # Quick Start
//!
//! ```ignore
//! use recordfake::{Context, Record, QueryExpression, ConditionOperator};
//!
//! let ctx = Context::new();
//! ctx.create(Record::new("account").set("name", "Contoso"))?;
//!
//! let query = QueryExpression::new("account")
//!     .condition("name", ConditionOperator::BeginsWith, vec!["con".into()]);
//! let page = ctx.retrieve_multiple(&query.into())?;
//! assert_eq!(page.records.len(), 1);
//! ```
//!
//! # Architecture
//!
//! - `recordfake-core`: values, records, errors, schema lookup
//! - `recordfake-storage`: record store and relationship registry
//! - `recordfake-engine`: query plan, translators, executor, aggregation
//!
//! The [`Context`] facade ties them together; [`ContextConfig`] carries the
//! tunables, loadable from `recordfake.toml`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod logging;

pub use config::{ContextConfig, CONFIG_FILE_NAME};
pub use context::Context;
pub use logging::init_tracing;

pub use recordfake_core::{
    AliasedValue, EntityReference, Error, Limits, NoSchema, Record, Result, SchemaLookup,
    SchemaRegistry, Uuid, Value,
};
pub use recordfake_engine::{
    AggregateFunction, ColumnSet, ConditionExpression, ConditionOperator, DateGrouping,
    FilterExpression, JoinOperator, LinkEntity, LogicalOperator, OrderExpression, OrderType,
    PagingCookie, PagingInfo, Query, QueryByAttribute, QueryExpression, QueryPlan, QueryResult,
};
pub use recordfake_storage::{RelationshipDefinition, RelationshipKind, UpsertOutcome};
