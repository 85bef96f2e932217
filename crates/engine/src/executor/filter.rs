//! Filter evaluation
//!
//! Conditions are evaluated against a [`Scope`]: a merged row, the type its
//! unprefixed attributes belong to, the outer-join aliases that matched
//! nothing, and the alias -> type map of the plan's joins.
//!
//! Negated operators are the plain negation of their positive form, so a
//! missing attribute satisfies `ne`, `not-like`, `not-in` and friends.

use super::compare::{self, coerce};
use super::{lookup, QueryExecutor, NULL};
use crate::plan::{Condition, ConditionOperator, Filter, FilterKind, Operand};
use chrono::{Datelike, Duration, TimeZone, Utc};
use recordfake_core::{Error, Record, Result, Value};
use regex::Regex;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use tracing::trace;
use uuid::Uuid;

/// Evaluation context of one row
pub(crate) struct Scope<'r> {
    record: &'r Record,
    entity: &'r str,
    unmatched: &'r [String],
    aliases: &'r [(String, String)],
}

impl<'r> Scope<'r> {
    pub(crate) fn new(
        record: &'r Record,
        entity: &'r str,
        unmatched: &'r [String],
        aliases: &'r [(String, String)],
    ) -> Self {
        Self {
            record,
            entity,
            unmatched,
            aliases,
        }
    }

    fn value(&self, alias: Option<&str>, attribute: &str) -> &'r Value {
        lookup(self.record, self.entity, alias, attribute)
    }

    /// Record type owning attributes under `alias`
    fn entity_of<'a>(&'a self, alias: Option<&'a str>) -> &'a str {
        match alias {
            Some(alias) if alias != self.entity => self
                .aliases
                .iter()
                .find(|(a, _)| a == alias)
                .map_or(alias, |(_, entity)| entity.as_str()),
            _ => self.entity,
        }
    }
}

impl QueryExecutor<'_> {
    /// Whether the row satisfies the filter tree. An empty group holds.
    pub(crate) fn matches(&self, filter: &Filter, scope: &Scope<'_>) -> Result<bool> {
        match filter.kind {
            FilterKind::And => {
                for condition in &filter.conditions {
                    if !self.condition(condition, scope)? {
                        return Ok(false);
                    }
                }
                for nested in &filter.filters {
                    if !self.matches(nested, scope)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            FilterKind::Or => {
                if filter.is_empty() {
                    return Ok(true);
                }
                for condition in &filter.conditions {
                    if self.condition(condition, scope)? {
                        return Ok(true);
                    }
                }
                for nested in &filter.filters {
                    if self.matches(nested, scope)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn condition(&self, condition: &Condition, scope: &Scope<'_>) -> Result<bool> {
        let alias = condition.entity_alias.as_deref();
        if condition.outer_only {
            if let Some(alias) = alias {
                if scope.unmatched.iter().any(|u| u == alias) {
                    return Ok(true);
                }
            }
        }
        let actual = scope.value(alias, &condition.attribute).unaliased();
        let operands: Vec<Value> = match &condition.operand {
            Operand::None => Vec::new(),
            Operand::Values(values) => values.iter().map(|v| coerce(v, actual)).collect(),
            Operand::Column(other) => {
                let value = match other.split_once('.') {
                    Some((other_alias, attribute)) => scope.value(Some(other_alias), attribute),
                    None => scope.value(alias, other),
                };
                vec![value.unaliased().clone()]
            }
        };
        let result = self.evaluate(condition.operator, actual, &operands, scope.entity_of(alias))?;
        trace!(
            target: "recordfake::engine",
            attribute = %condition.attribute,
            operator = ?condition.operator,
            result,
            "condition"
        );
        Ok(result)
    }

    fn evaluate(
        &self,
        operator: ConditionOperator,
        actual: &Value,
        operands: &[Value],
        entity: &str,
    ) -> Result<bool> {
        use ConditionOperator::*;
        let ci = self.options.case_insensitive_strings;
        let first = operands.first().unwrap_or(&NULL);
        let result = match operator {
            Equal => !actual.is_null() && compare::equal(actual, first, ci),
            NotEqual => !self.evaluate(Equal, actual, operands, entity)?,
            GreaterThan => ordered(actual, first, ci, |o| o == Ordering::Greater),
            GreaterEqual => ordered(actual, first, ci, |o| o != Ordering::Less),
            LessThan => ordered(actual, first, ci, |o| o == Ordering::Less),
            LessEqual => ordered(actual, first, ci, |o| o != Ordering::Greater),
            Null => actual.is_null(),
            NotNull => !actual.is_null(),
            In => !actual.is_null() && operands.iter().any(|v| compare::equal(actual, v, ci)),
            NotIn => !self.evaluate(In, actual, operands, entity)?,
            Between => match operands {
                [low, high] => {
                    ordered(actual, low, ci, |o| o != Ordering::Less)
                        && ordered(actual, high, ci, |o| o != Ordering::Greater)
                }
                _ => false,
            },
            NotBetween => !self.evaluate(Between, actual, operands, entity)?,
            Like => match (actual, first) {
                (Value::String(text), Value::String(pattern)) => {
                    self.like_pattern(pattern, ci)?.is_match(text)
                }
                _ => false,
            },
            NotLike => !self.evaluate(Like, actual, operands, entity)?,
            BeginsWith => text_test(actual, first, ci, |t, p| t.starts_with(p)),
            DoesNotBeginWith => !self.evaluate(BeginsWith, actual, operands, entity)?,
            EndsWith => text_test(actual, first, ci, |t, p| t.ends_with(p)),
            DoesNotEndWith => !self.evaluate(EndsWith, actual, operands, entity)?,
            Contains => text_test(actual, first, ci, |t, p| t.contains(p)),
            DoesNotContain => !self.evaluate(Contains, actual, operands, entity)?,
            Under | UnderOrEqual | Above | AboveOrEqual | NotUnder => {
                self.hierarchy(operator, actual, first, entity)?
            }
            On | OnOrBefore | OnOrAfter | Today | Yesterday | Tomorrow | LastXDays | NextXDays
            | ThisYear => date_test(operator, actual, first),
            ContainValues => contains_values(actual, operands),
            DoesNotContainValues => !contains_values(actual, operands),
        };
        Ok(result)
    }

    /// Compiled like pattern, cached per executor
    fn like_pattern(&self, pattern: &str, ci: bool) -> Result<Regex> {
        let key = (pattern.to_string(), ci);
        if let Some(regex) = self.patterns.borrow().get(&key) {
            return Ok(regex.clone());
        }
        let regex = like_regex(pattern, ci)?;
        self.patterns.borrow_mut().insert(key, regex.clone());
        Ok(regex)
    }

    /// Hierarchy operators walk the self-referential parent attribute.
    ///
    /// `Under(x)`: x is a proper ancestor of the row. `Above(x)`: the row is
    /// a proper ancestor of x. The `OrEqual` forms include the row itself.
    fn hierarchy(
        &self,
        operator: ConditionOperator,
        actual: &Value,
        operand: &Value,
        entity: &str,
    ) -> Result<bool> {
        use ConditionOperator::*;
        let parent = self.schema.hierarchy_attribute(entity).ok_or_else(|| {
            Error::invalid_query(format!(
                "{:?} needs a hierarchy attribute on {}",
                operator, entity
            ))
        })?;
        let target = coerce(operand, &Value::Guid(Uuid::nil())).as_id();
        let (Some(node), Some(target)) = (actual.as_id(), target) else {
            return Ok(operator == NotUnder);
        };
        Ok(match operator {
            Under => self.descends(entity, &parent, node, target),
            UnderOrEqual => node == target || self.descends(entity, &parent, node, target),
            NotUnder => !self.descends(entity, &parent, node, target),
            Above => self.descends(entity, &parent, target, node),
            AboveOrEqual => node == target || self.descends(entity, &parent, target, node),
            _ => false,
        })
    }

    /// Whether `ancestor` appears on the parent chain of `node`.
    ///
    /// The walk is bounded by the depth limit and stops on a revisited id.
    fn descends(&self, entity: &str, parent_attribute: &str, node: Uuid, ancestor: Uuid) -> bool {
        let mut visited = FxHashSet::default();
        visited.insert(node);
        let mut current = node;
        for _ in 0..self.options.limits.max_hierarchy_depth {
            let Ok(record) = self.store.retrieve(entity, current) else {
                return false;
            };
            let Some(parent) = record.get(parent_attribute).and_then(Value::as_id) else {
                return false;
            };
            if parent == ancestor {
                return true;
            }
            if !visited.insert(parent) {
                return false;
            }
            current = parent;
        }
        false
    }
}

fn ordered(actual: &Value, operand: &Value, ci: bool, test: impl Fn(Ordering) -> bool) -> bool {
    if actual.is_null() || operand.is_null() {
        return false;
    }
    compare::compare(actual, operand, ci).is_some_and(test)
}

fn text_test(actual: &Value, operand: &Value, ci: bool, test: impl Fn(&str, &str) -> bool) -> bool {
    match (actual, operand) {
        (Value::String(text), Value::String(needle)) if ci => {
            test(&text.to_lowercase(), &needle.to_lowercase())
        }
        (Value::String(text), Value::String(needle)) => test(text, needle),
        _ => false,
    }
}

/// Translate a like pattern: `%` any run, `_` one character, `[...]` a
/// character class; everything else literal.
fn like_regex(pattern: &str, ci: bool) -> Result<Regex> {
    let mut source = String::from(if ci { "(?is)^" } else { "(?s)^" });
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == ']' {
                        closed = true;
                        break;
                    }
                    class.push(n);
                }
                if closed && !class.is_empty() {
                    source.push('[');
                    source.push_str(&class_body(&class));
                    source.push(']');
                } else {
                    source.push_str(&regex::escape(&format!("[{}", class)));
                    if closed {
                        source.push_str(&regex::escape("]"));
                    }
                }
            }
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source)
        .map_err(|e| Error::invalid_query(format!("bad like pattern {}: {}", pattern, e)))
}

/// Class contents with everything but a leading `^` and well-formed `a-z`
/// ranges taken literally
fn class_body(class: &str) -> String {
    let chars: Vec<char> = class.chars().collect();
    let mut body = String::with_capacity(class.len() * 2);
    let mut range_end = None;
    for (i, &c) in chars.iter().enumerate() {
        let literal = match c {
            '^' => i > 0 || chars.len() == 1,
            '-' => {
                let starts_range = i > 0
                    && range_end != Some(i - 1)
                    && !(i == 1 && chars[0] == '^')
                    && chars[i - 1] != '-'
                    && chars
                        .get(i + 1)
                        .is_some_and(|&next| next != '-' && chars[i - 1] <= next);
                if starts_range {
                    range_end = Some(i + 1);
                }
                !starts_range
            }
            '[' | ']' | '\\' | '&' | '~' => true,
            _ => false,
        };
        if literal {
            body.push('\\');
        }
        body.push(c);
    }
    body
}

fn date_test(operator: ConditionOperator, actual: &Value, operand: &Value) -> bool {
    use ConditionOperator::*;
    let Value::DateTime(at) = actual else {
        return false;
    };
    let now = Utc::now();
    let today = now.date_naive();
    let day = at.date_naive();
    let operand_date = || coerce(operand, actual).as_datetime().map(|d| d.date_naive());
    let days = || {
        coerce(operand, &Value::Int(0))
            .as_int()
            .map(Duration::days)
    };
    match operator {
        On => operand_date().is_some_and(|d| day == d),
        OnOrBefore => operand_date().is_some_and(|d| day <= d),
        OnOrAfter => operand_date().is_some_and(|d| day >= d),
        Today => day == today,
        Yesterday => Some(day) == today.pred_opt(),
        Tomorrow => Some(day) == today.succ_opt(),
        LastXDays => days()
            .and_then(|n| (today - n).and_hms_opt(0, 0, 0))
            .is_some_and(|start| Utc.from_utc_datetime(&start) <= *at && *at <= now),
        NextXDays => days().is_some_and(|n| now <= *at && day <= today + n),
        ThisYear => at.year() == now.year(),
        _ => false,
    }
}

fn contains_values(actual: &Value, operands: &[Value]) -> bool {
    let codes: Vec<i32> = match actual {
        Value::MultiOptionSet(codes) => codes.clone(),
        Value::OptionSet(code) => vec![*code],
        _ => return false,
    };
    operands
        .iter()
        .filter_map(|v| coerce(v, &Value::OptionSet(0)).as_option_set())
        .any(|code| codes.contains(&code))
}
