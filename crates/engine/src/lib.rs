//! Query engine for recordfake
//!
//! This crate turns queries into pages of records:
//! - plan: format-independent query plan
//! - query: structured query objects (expression, by-attribute)
//! - translate: structured and XML forms to a validated plan
//! - executor: joins, filters, distinct, sort, top, paging, labels
//! - aggregate: grouping and aggregate functions
//!
//! Both query forms compile to the same [`QueryPlan`], so equivalent queries
//! return identical results regardless of the form they were written in.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod executor;
mod key;
pub mod plan;
pub mod query;
pub mod translate;

pub use executor::{ExecutorOptions, PagingCookie, QueryExecutor, QueryResult};
pub use plan::{
    AggregateDirective, AggregateFunction, AggregateSpec, Columns, Condition, ConditionOperator,
    DateGrouping, Filter, FilterKind, GroupBy, Join, JoinKind, Operand, PageRequest, QueryPlan,
    SortKey,
};
pub use query::{
    ColumnSet, ConditionExpression, FilterExpression, JoinOperator, LinkEntity, LogicalOperator,
    OrderExpression, OrderType, PagingInfo, Query, QueryByAttribute, QueryExpression,
};
pub use translate::{from_fetch_xml, from_structured};
