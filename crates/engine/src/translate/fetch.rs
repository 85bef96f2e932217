//! XML query language translator
//!
//! ```xml
//! <fetch top="10" distinct="true" count="50" page="1" aggregate="false">
//!   <entity name="account">
//!     <attribute name="name" />
//!     <order attribute="name" descending="false" />
//!     <filter type="and">
//!       <condition attribute="statecode" operator="eq" value="0" />
//!     </filter>
//!     <link-entity name="contact" from="parentcustomerid" to="accountid" alias="c" link-type="outer">
//!       <attribute name="fullname" />
//!     </link-entity>
//!   </entity>
//! </fetch>
//! ```
//!
//! On a `<link-entity>`, `from` names the attribute of the linked type and
//! `to` the attribute of the parent.
//!
//! Aggregate mode is entered by `aggregate="true"` on `<fetch>` or by any
//! `<attribute>` carrying `aggregate`, `groupby` or `dategrouping`. In that
//! mode every attribute needs an alias, `<all-attributes/>` is rejected and
//! ordering must name an output alias.

use super::xml::{self, Element};
use super::{finalize, AliasCounter};
use crate::plan::{
    AggregateDirective, AggregateFunction, AggregateSpec, Columns, Condition, ConditionOperator,
    DateGrouping, Filter, FilterKind, GroupBy, Join, JoinKind, Operand, PageRequest, QueryPlan,
    SortKey,
};
use recordfake_core::{Error, Result, Value};

/// Compile an XML query document into a plan.
///
/// Literal values stay strings here; the executor coerces them to the
/// stored attribute's type at evaluation time.
///
/// # Errors
///
/// - `InvalidQuery` for malformed or contradictory documents
/// - `NotImplemented` for operators, link types and date groupings the
///   engine does not model
pub fn from_fetch_xml(document: &str) -> Result<QueryPlan> {
    let root = xml::parse(document)?;
    if root.name != "fetch" {
        return Err(Error::invalid_query(format!(
            "root element must be <fetch>, found <{}>",
            root.name
        )));
    }
    let entity_element = root
        .children_named("entity")
        .next()
        .ok_or_else(|| Error::invalid_query("fetch has no <entity> element"))?;
    let entity = entity_element
        .attr("name")
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::invalid_query("<entity> has no name"))?
        .to_string();

    let mut translator = Translator {
        aggregate: root.flag("aggregate") || declares_aggregate(entity_element),
        counter: AliasCounter::default(),
        spec: AggregateSpec::default(),
        orders: Vec::new(),
    };

    let mut plan = QueryPlan::new(entity.clone());
    plan.columns = translator.columns(entity_element, &entity, None, true)?;
    plan.filter = translator.filters(entity_element)?;
    translator.orders(entity_element, None)?;
    for link in entity_element.children_named("link-entity") {
        plan.joins.push(translator.join(link)?);
    }

    plan.top = root.number("top")?;
    plan.distinct = root.flag("distinct");
    let count = root.number("count")?;
    let page = root.number("page")?;
    let cookie = root.attr("paging-cookie").map(str::to_string);
    let total = root.flag("returntotalrecordcount");
    if count.is_some() || page.is_some() || cookie.is_some() || total {
        plan.page = Some(PageRequest {
            number: page.unwrap_or(1).max(1),
            size: count.filter(|c| *c > 0),
            cookie,
            return_total_count: total,
        });
    }

    if translator.aggregate {
        for order in &translator.orders {
            let declared = translator
                .spec
                .group_by
                .iter()
                .map(|g| &g.alias)
                .chain(translator.spec.aggregates.iter().map(|a| &a.alias))
                .any(|alias| *alias == order.attribute);
            if !declared {
                return Err(Error::invalid_query(format!(
                    "order alias {} is not declared by any attribute",
                    order.attribute
                )));
            }
        }
        if translator.spec.aggregates.is_empty() && translator.spec.group_by.is_empty() {
            return Err(Error::invalid_query("aggregate query declares no attributes"));
        }
        plan.aggregate = Some(translator.spec);
    }
    plan.orders = translator.orders;
    finalize(plan)
}

/// Whether any `<attribute>` below `element` uses aggregate syntax
fn declares_aggregate(element: &Element) -> bool {
    element.children.iter().any(|child| match child.name.as_str() {
        "attribute" => {
            child.attr("aggregate").is_some()
                || child.attr("groupby").is_some()
                || child.attr("dategrouping").is_some()
        }
        "link-entity" => declares_aggregate(child),
        _ => false,
    })
}

struct Translator {
    aggregate: bool,
    counter: AliasCounter,
    spec: AggregateSpec,
    orders: Vec<SortKey>,
}

impl Translator {
    fn columns(
        &mut self,
        element: &Element,
        entity: &str,
        alias: Option<&str>,
        is_root: bool,
    ) -> Result<Columns> {
        if element.children_named("all-attributes").next().is_some() {
            if self.aggregate {
                return Err(Error::invalid_query(
                    "<all-attributes/> is not allowed in an aggregate query",
                ));
            }
            return Ok(Columns::All);
        }

        let mut names = Vec::new();
        for attribute in element.children_named("attribute") {
            let name = attribute
                .attr("name")
                .filter(|n| !n.is_empty())
                .ok_or_else(|| Error::invalid_query("<attribute> has no name"))?;
            if self.aggregate {
                self.aggregate_column(attribute, name, entity, alias)?;
            } else {
                names.push(name.to_string());
            }
        }

        if names.is_empty() && is_root && !self.aggregate {
            Ok(Columns::All)
        } else {
            Ok(Columns::Some(names))
        }
    }

    fn aggregate_column(
        &mut self,
        attribute: &Element,
        name: &str,
        entity: &str,
        entity_alias: Option<&str>,
    ) -> Result<()> {
        let alias = attribute
            .attr("alias")
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                Error::invalid_query(format!(
                    "attribute {} in an aggregate query needs an alias",
                    name
                ))
            })?
            .to_string();

        if attribute.flag("groupby") {
            let date_grouping = match attribute.attr("dategrouping") {
                None => DateGrouping::Raw,
                Some(raw) => date_grouping(raw)?,
            };
            self.spec.group_by.push(GroupBy {
                entity: entity.to_string(),
                entity_alias: entity_alias.map(str::to_string),
                attribute: name.to_string(),
                alias,
                date_grouping,
            });
            return Ok(());
        }
        if attribute.attr("dategrouping").is_some() {
            return Err(Error::invalid_query(format!(
                "dategrouping on {} requires groupby=\"true\"",
                name
            )));
        }

        let function = match attribute.attr("aggregate") {
            Some(raw) => aggregate_function(raw)?,
            None => {
                return Err(Error::invalid_query(format!(
                    "attribute {} must be grouped or aggregated in an aggregate query",
                    name
                )))
            }
        };
        self.spec.aggregates.push(AggregateDirective {
            entity: entity.to_string(),
            entity_alias: entity_alias.map(str::to_string),
            attribute: name.to_string(),
            alias,
            function,
            distinct: attribute.flag("distinct"),
        });
        Ok(())
    }

    fn filters(&self, element: &Element) -> Result<Option<Filter>> {
        let mut filters = Vec::new();
        for filter in element.children_named("filter") {
            filters.push(self.filter(filter)?);
        }
        Ok(match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter {
                kind: FilterKind::And,
                conditions: Vec::new(),
                filters,
            }),
        })
    }

    fn filter(&self, element: &Element) -> Result<Filter> {
        let kind = match element.attr("type") {
            None => FilterKind::And,
            Some(t) if t.eq_ignore_ascii_case("and") => FilterKind::And,
            Some(t) if t.eq_ignore_ascii_case("or") => FilterKind::Or,
            Some(other) => {
                return Err(Error::invalid_query(format!("unknown filter type {}", other)))
            }
        };
        let mut out = Filter::new(kind);
        for child in &element.children {
            match child.name.as_str() {
                "condition" => out.conditions.push(condition(child)?),
                "filter" => out.filters.push(self.filter(child)?),
                other => {
                    return Err(Error::invalid_query(format!(
                        "unexpected <{}> inside <filter>",
                        other
                    )))
                }
            }
        }
        Ok(out)
    }

    fn orders(&mut self, element: &Element, entity_alias: Option<&str>) -> Result<()> {
        for order in element.children_named("order") {
            let descending = order.flag("descending");
            let key = match (order.attr("attribute"), order.attr("alias")) {
                (Some(attribute), _) if self.aggregate => {
                    return Err(Error::invalid_query(format!(
                        "aggregate query must order by alias, not attribute {}",
                        attribute
                    )))
                }
                (_, Some(alias)) if self.aggregate => SortKey {
                    entity_alias: None,
                    attribute: alias.to_string(),
                    descending,
                },
                (Some(attribute), _) | (None, Some(attribute)) => SortKey {
                    entity_alias: entity_alias.map(str::to_string),
                    attribute: attribute.to_string(),
                    descending,
                },
                (None, None) => {
                    return Err(Error::invalid_query("<order> names no attribute or alias"))
                }
            };
            self.orders.push(key);
        }
        Ok(())
    }

    fn join(&mut self, element: &Element) -> Result<Join> {
        let entity = element
            .attr("name")
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::invalid_query("<link-entity> has no name"))?
            .to_string();
        let kind = match element.attr("link-type") {
            None | Some("inner") => JoinKind::Inner,
            Some("outer") => JoinKind::LeftOuter,
            Some(other) => return Err(Error::not_implemented(format!("link-type {}", other))),
        };
        let alias = self.counter.alias(&entity, element.attr("alias"));

        let columns = self.columns(element, &entity, Some(&alias), false)?;
        let filter = self.filters(element)?;
        self.orders(element, Some(&alias))?;
        let mut joins = Vec::new();
        for nested in element.children_named("link-entity") {
            joins.push(self.join(nested)?);
        }

        Ok(Join {
            alias,
            from_attribute: element.attr("to").map(str::to_string),
            to_attribute: element.attr("from").map(str::to_string),
            kind,
            columns,
            filter,
            joins,
            relationship: None,
            entity,
        })
    }
}

fn condition(element: &Element) -> Result<Condition> {
    let attribute = element
        .attr("attribute")
        .filter(|a| !a.is_empty())
        .ok_or_else(|| Error::invalid_query("<condition> has no attribute"))?;
    let operator_name = element
        .attr("operator")
        .ok_or_else(|| Error::invalid_query(format!("condition on {} has no operator", attribute)))?;
    let operator = operator(operator_name)?;

    let operand = if let Some(other) = element.attr("valueof") {
        Operand::Column(other.to_string())
    } else {
        let mut values: Vec<Value> = element.attr("value").map(Value::from).into_iter().collect();
        values.extend(
            element
                .children_named("value")
                .map(|v| Value::String(v.text.clone())),
        );
        if values.is_empty() {
            Operand::None
        } else {
            Operand::Values(values)
        }
    };

    Ok(Condition {
        entity_alias: element.attr("entityname").map(str::to_string),
        attribute: attribute.to_string(),
        operator,
        operand,
        outer_only: false,
    })
}

fn operator(name: &str) -> Result<ConditionOperator> {
    use ConditionOperator::*;
    Ok(match name {
        "eq" => Equal,
        "ne" | "neq" => NotEqual,
        "gt" => GreaterThan,
        "ge" => GreaterEqual,
        "lt" => LessThan,
        "le" => LessEqual,
        "like" => Like,
        "not-like" => NotLike,
        "begins-with" => BeginsWith,
        "not-begin-with" => DoesNotBeginWith,
        "ends-with" => EndsWith,
        "not-end-with" => DoesNotEndWith,
        "null" => Null,
        "not-null" => NotNull,
        "in" => In,
        "not-in" => NotIn,
        "between" => Between,
        "not-between" => NotBetween,
        "above" => Above,
        "eq-or-above" => AboveOrEqual,
        "under" => Under,
        "eq-or-under" => UnderOrEqual,
        "not-under" => NotUnder,
        "on" => On,
        "on-or-before" => OnOrBefore,
        "on-or-after" => OnOrAfter,
        "today" => Today,
        "yesterday" => Yesterday,
        "tomorrow" => Tomorrow,
        "last-x-days" => LastXDays,
        "next-x-days" => NextXDays,
        "this-year" => ThisYear,
        "contain-values" => ContainValues,
        "not-contain-values" => DoesNotContainValues,
        other => return Err(Error::not_implemented(format!("condition operator {}", other))),
    })
}

fn aggregate_function(name: &str) -> Result<AggregateFunction> {
    Ok(match name {
        "count" => AggregateFunction::Count,
        "countcolumn" => AggregateFunction::CountColumn,
        "sum" => AggregateFunction::Sum,
        "avg" => AggregateFunction::Avg,
        "min" => AggregateFunction::Min,
        "max" => AggregateFunction::Max,
        other => {
            return Err(Error::invalid_query(format!(
                "unknown aggregate function {}",
                other
            )))
        }
    })
}

fn date_grouping(name: &str) -> Result<DateGrouping> {
    Ok(match name {
        "day" => DateGrouping::Day,
        "week" => DateGrouping::Week,
        "month" => DateGrouping::Month,
        "quarter" => DateGrouping::Quarter,
        "year" => DateGrouping::Year,
        "fiscal-period" | "fiscal-year" => {
            return Err(Error::not_implemented(format!("dategrouping {}", name)))
        }
        other => return Err(Error::invalid_query(format!("unknown dategrouping {}", other))),
    })
}
