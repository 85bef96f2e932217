//! Structured form translator

use super::{finalize, from_fetch_xml, AliasCounter};
use crate::plan::{
    Columns, Condition, ConditionOperator, Filter, FilterKind, Join, JoinKind, Operand,
    PageRequest, QueryPlan, SortKey,
};
use crate::query::{
    ColumnSet, ConditionExpression, FilterExpression, JoinOperator, LinkEntity, LogicalOperator,
    OrderExpression, OrderType, PagingInfo, Query, QueryByAttribute, QueryExpression,
};
use recordfake_core::{Error, Result, Value};

/// Compile a structured query into a plan.
///
/// `Query::Fetch` is forwarded to [`from_fetch_xml`].
///
/// # Errors
///
/// - `InvalidQuery` for malformed input (wrong operand count, unknown alias,
///   mismatched attribute/value lists)
/// - `NotImplemented` for join operators the engine does not model
pub fn from_structured(query: &Query) -> Result<QueryPlan> {
    match query {
        Query::Expression(expression) => from_expression(expression),
        Query::ByAttribute(by_attribute) => from_by_attribute(by_attribute),
        Query::Fetch(xml) => from_fetch_xml(xml),
    }
}

fn from_expression(query: &QueryExpression) -> Result<QueryPlan> {
    let mut plan = QueryPlan::new(query.entity_name.clone());
    plan.columns = columns(&query.column_set);
    plan.filter = Some(filter(&query.criteria)?);

    let mut counter = AliasCounter::default();
    for link in &query.link_entities {
        plan.joins
            .push(join(link, &query.entity_name, &mut counter)?);
    }

    plan.orders = query.orders.iter().map(sort_key).collect();
    plan.top = query.top_count;
    plan.page = query.page_info.as_ref().map(page_request);
    plan.distinct = query.distinct;
    finalize(plan)
}

fn from_by_attribute(query: &QueryByAttribute) -> Result<QueryPlan> {
    if query.attributes.len() != query.values.len() {
        return Err(Error::invalid_query(format!(
            "{} attributes but {} values",
            query.attributes.len(),
            query.values.len()
        )));
    }
    let mut plan = QueryPlan::new(query.entity_name.clone());
    plan.columns = columns(&query.column_set);

    let mut criteria = Filter::new(FilterKind::And);
    for (attribute, value) in query.attributes.iter().zip(&query.values) {
        criteria.conditions.push(Condition::new(
            attribute.clone(),
            ConditionOperator::Equal,
            vec![value.clone()],
        ));
    }
    plan.filter = Some(criteria);
    plan.orders = query.orders.iter().map(sort_key).collect();
    plan.top = query.top_count;
    plan.page = query.page_info.as_ref().map(page_request);
    finalize(plan)
}

fn columns(column_set: &ColumnSet) -> Columns {
    match column_set {
        ColumnSet::AllColumns => Columns::All,
        ColumnSet::Columns(names) => Columns::Some(names.clone()),
    }
}

fn filter(expression: &FilterExpression) -> Result<Filter> {
    let kind = match expression.filter_operator {
        LogicalOperator::And => FilterKind::And,
        LogicalOperator::Or => FilterKind::Or,
    };
    let mut out = Filter::new(kind);
    for condition in &expression.conditions {
        out.conditions.push(self::condition(condition)?);
    }
    for nested in &expression.filters {
        out.filters.push(filter(nested)?);
    }
    Ok(out)
}

fn condition(expression: &ConditionExpression) -> Result<Condition> {
    let operand = if expression.compare_columns {
        match expression.values.as_slice() {
            [Value::String(other)] => Operand::Column(other.clone()),
            _ => {
                return Err(Error::invalid_query(format!(
                    "column comparison on {} needs exactly one attribute name",
                    expression.attribute_name
                )))
            }
        }
    } else if expression.values.is_empty() {
        Operand::None
    } else {
        Operand::Values(expression.values.clone())
    };
    Ok(Condition {
        entity_alias: expression.entity_name.clone(),
        attribute: expression.attribute_name.clone(),
        operator: expression.operator,
        operand,
        outer_only: false,
    })
}

/// Resolve which side of a link is the joined type.
///
/// An explicit "from" matching the parent is taken as given. When only the
/// "to" side names the parent, the link was declared backwards and the sides
/// are swapped. An unset "from" means the parent.
fn orient(link: &LinkEntity, parent: &str) -> (String, Option<String>, Option<String>) {
    match link.link_from_entity_name.as_deref() {
        Some(from) if from != parent && link.link_to_entity_name == parent => (
            from.to_string(),
            link.link_to_attribute_name.clone(),
            link.link_from_attribute_name.clone(),
        ),
        _ => (
            link.link_to_entity_name.clone(),
            link.link_from_attribute_name.clone(),
            link.link_to_attribute_name.clone(),
        ),
    }
}

fn join(link: &LinkEntity, parent: &str, counter: &mut AliasCounter) -> Result<Join> {
    let kind = match link.join_operator {
        JoinOperator::Inner => JoinKind::Inner,
        JoinOperator::LeftOuter => JoinKind::LeftOuter,
        other => {
            return Err(Error::not_implemented(format!("join operator {:?}", other)));
        }
    };
    let (entity, from_attribute, to_attribute) = orient(link, parent);
    if entity.is_empty() {
        return Err(Error::invalid_query("link entity has no target type"));
    }
    let alias = counter.alias(&entity, link.entity_alias.as_deref());

    let criteria = filter(&link.link_criteria)?;
    let mut nested = Vec::with_capacity(link.link_entities.len());
    for child in &link.link_entities {
        nested.push(join(child, &entity, counter)?);
    }

    Ok(Join {
        entity,
        alias,
        from_attribute,
        to_attribute,
        kind,
        columns: columns(&link.columns),
        filter: (!criteria.is_empty()).then_some(criteria),
        joins: nested,
        relationship: link.relationship_name.clone(),
    })
}

fn sort_key(order: &OrderExpression) -> SortKey {
    SortKey {
        entity_alias: order.entity_name.clone(),
        attribute: order.attribute_name.clone(),
        descending: order.order_type == OrderType::Descending,
    }
}

fn page_request(info: &PagingInfo) -> PageRequest {
    PageRequest {
        number: info.page_number.max(1),
        size: (info.count > 0).then_some(info.count),
        cookie: info.paging_cookie.clone(),
        return_total_count: info.return_total_record_count,
    }
}
