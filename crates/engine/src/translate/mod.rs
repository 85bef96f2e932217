//! Query translators
//!
//! Two front-ends compile caller queries into a [`QueryPlan`]:
//! - [`from_structured`]: query objects ([`Query::Expression`], [`Query::ByAttribute`])
//! - [`from_fetch_xml`]: the XML query language
//!
//! Both finish through [`finalize`], which validates condition arity, checks
//! aliases and tags outer-join conditions, so equivalent inputs in either
//! format produce equivalent plans.
//!
//! [`Query::Expression`]: crate::query::Query::Expression
//! [`Query::ByAttribute`]: crate::query::Query::ByAttribute

mod fetch;
mod structured;
pub(crate) mod xml;

pub use fetch::from_fetch_xml;
pub use structured::from_structured;

use crate::plan::{Filter, JoinKind, QueryPlan};
use recordfake_core::{Error, Result};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Hands out join aliases; unnamed joins get `<entity><n>`, n counting every
/// join of the query from 1 in declaration order.
#[derive(Debug, Default)]
pub(crate) struct AliasCounter {
    next: usize,
}

impl AliasCounter {
    pub(crate) fn alias(&mut self, entity: &str, explicit: Option<&str>) -> String {
        self.next += 1;
        match explicit {
            Some(alias) if !alias.is_empty() => alias.to_string(),
            _ => format!("{}{}", entity, self.next),
        }
    }
}

/// Validate a freshly translated plan and tag outer-join conditions.
///
/// # Errors
///
/// `InvalidQuery` on a duplicate join alias, a condition or sort key naming
/// an unknown alias, or a condition with the wrong operand shape.
pub(crate) fn finalize(mut plan: QueryPlan) -> Result<QueryPlan> {
    if plan.entity.is_empty() {
        return Err(Error::invalid_query("query has no target entity"));
    }

    let mut aliases = FxHashSet::default();
    let mut outer = FxHashSet::default();
    for join in plan.all_joins() {
        if !aliases.insert(join.alias.clone()) {
            return Err(Error::invalid_query(format!(
                "duplicate link-entity alias {}",
                join.alias
            )));
        }
        if join.kind == JoinKind::LeftOuter {
            outer.insert(join.alias.clone());
        }
        if let Some(filter) = &join.filter {
            validate_filter(filter)?;
        }
    }

    let known = |alias: &str| alias == plan.entity || aliases.contains(alias);

    if let Some(filter) = plan.filter.as_mut() {
        validate_filter(filter)?;
        for condition in filter.conditions_mut() {
            let Some(alias) = condition.entity_alias.as_deref() else {
                continue;
            };
            if !known(alias) {
                return Err(Error::invalid_query(format!(
                    "condition on {} names unknown entity alias {}",
                    condition.attribute, alias
                )));
            }
            if outer.contains(alias) && !condition.operator.is_null_check() {
                condition.outer_only = true;
            }
        }
    }

    for order in &plan.orders {
        if let Some(alias) = order.entity_alias.as_deref() {
            if !known(alias) {
                return Err(Error::invalid_query(format!(
                    "order on {} names unknown entity alias {}",
                    order.attribute, alias
                )));
            }
        }
    }

    if plan.filter.as_ref().map(Filter::is_empty).unwrap_or(false) {
        plan.filter = None;
    }

    debug!(
        target: "recordfake::engine",
        entity = %plan.entity,
        joins = aliases.len(),
        aggregate = plan.aggregate.is_some(),
        "translated query"
    );
    Ok(plan)
}

fn validate_filter(filter: &Filter) -> Result<()> {
    for condition in &filter.conditions {
        condition.validate()?;
    }
    for nested in &filter.filters {
        validate_filter(nested)?;
    }
    Ok(())
}
