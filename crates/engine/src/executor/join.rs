//! Join evaluation
//!
//! Each join matches rows against a snapshot of the joined type, pre-filtered
//! by the join's own filter. Joined attributes are merged into the row as
//! `alias.attribute`, wrapped in `Value::Aliased`. An inner join drops rows
//! without a match; an outer join keeps them and records the alias as
//! unmatched. Joins nested under an unmatched outer join are skipped.

use super::compare;
use super::filter::Scope;
use super::{QueryExecutor, Row};
use crate::plan::{Join, JoinKind};
use recordfake_core::{AliasedValue, Error, Record, Result, Value};
use recordfake_storage::{RelationshipDefinition, RelationshipKind};
use std::sync::Arc;
use tracing::trace;

impl QueryExecutor<'_> {
    pub(super) fn join(
        &self,
        rows: Vec<Row>,
        join: &Join,
        parent_entity: &str,
        parent_alias: Option<&str>,
    ) -> Result<Vec<Row>> {
        let (from, to) = self.join_attributes(join, parent_entity)?;
        let mut inner = self.store.snapshot(&join.entity);
        if let Some(filter) = &join.filter {
            let mut kept = Vec::with_capacity(inner.len());
            for record in inner {
                if self.matches(filter, &Scope::new(&record, &join.entity, &[], &[]))? {
                    kept.push(record);
                }
            }
            inner = kept;
        }

        let ci = self.options.case_insensitive_strings;
        let parent_column = match parent_alias {
            Some(alias) => format!("{}.{}", alias, from),
            None => from.clone(),
        };
        let mut out = Vec::with_capacity(rows.len());
        for mut row in rows {
            if parent_alias.is_some_and(|alias| row.unmatched.iter().any(|u| u == alias)) {
                row.unmatched.push(join.alias.clone());
                out.push(row);
                continue;
            }
            let key = row.record.get(&parent_column).cloned().unwrap_or(Value::Null);
            let matched: Vec<&Record> = if key.is_null() {
                Vec::new()
            } else {
                inner
                    .iter()
                    .filter(|candidate| {
                        candidate
                            .get(&to)
                            .is_some_and(|value| keys_equal(&key, value, ci))
                    })
                    .collect()
            };
            if matched.is_empty() {
                if join.kind == JoinKind::LeftOuter {
                    row.unmatched.push(join.alias.clone());
                    out.push(row);
                }
                continue;
            }
            for candidate in matched {
                let mut record = row.record.clone();
                merge(&mut record, candidate, join);
                out.push(Row {
                    record,
                    unmatched: row.unmatched.clone(),
                });
            }
        }
        trace!(
            target: "recordfake::engine",
            alias = %join.alias,
            entity = %join.entity,
            from = %from,
            to = %to,
            rows = out.len(),
            "joined"
        );

        for nested in &join.joins {
            out = self.join(out, nested, &join.entity, Some(&join.alias))?;
        }
        Ok(out)
    }

    /// Resolve the `(parent, joined)` attribute pair of a join.
    ///
    /// Explicit attributes win. Missing ones come from the named relationship,
    /// or from the first registered relationship connecting the two types,
    /// directly or through its intersect type.
    fn join_attributes(&self, join: &Join, parent: &str) -> Result<(String, String)> {
        let named = join
            .relationship
            .as_deref()
            .map(|name| self.relationship(name))
            .transpose()?;
        if let (Some(from), Some(to)) = (&join.from_attribute, &join.to_attribute) {
            return Ok((from.clone(), to.clone()));
        }
        let candidates = match named {
            Some(def) => vec![def],
            None => self.relationships.definitions(),
        };
        let (from, to) = candidates
            .iter()
            .find_map(|def| infer(def, parent, &join.entity))
            .ok_or_else(|| Error::UnknownRelationship {
                name: join
                    .relationship
                    .clone()
                    .unwrap_or_else(|| format!("{}_{}", parent, join.entity)),
            })?;
        Ok((
            join.from_attribute.clone().unwrap_or(from),
            join.to_attribute.clone().unwrap_or(to),
        ))
    }

    fn relationship(&self, name: &str) -> Result<Arc<RelationshipDefinition>> {
        self.relationships
            .lookup(name)
            .map_err(|_| Error::UnknownRelationship {
                name: name.to_string(),
            })
    }
}

/// Join attributes connecting `parent` to `inner` through `def`
fn infer(def: &RelationshipDefinition, parent: &str, inner: &str) -> Option<(String, String)> {
    match def.kind {
        RelationshipKind::OneToMany => {
            if def.entity1 == parent && def.entity2 == inner {
                Some((def.entity1_attribute.clone(), def.entity2_attribute.clone()))
            } else if def.entity2 == parent && def.entity1 == inner {
                Some((def.entity2_attribute.clone(), def.entity1_attribute.clone()))
            } else {
                None
            }
        }
        RelationshipKind::ManyToMany => {
            let intersect = def.intersect.as_ref()?;
            if inner == intersect.logical_name {
                if parent == def.entity1 {
                    Some((def.entity1_attribute.clone(), intersect.entity1_attribute.clone()))
                } else if parent == def.entity2 {
                    Some((def.entity2_attribute.clone(), intersect.entity2_attribute.clone()))
                } else {
                    None
                }
            } else if parent == intersect.logical_name {
                if inner == def.entity1 {
                    Some((intersect.entity1_attribute.clone(), def.entity1_attribute.clone()))
                } else if inner == def.entity2 {
                    Some((intersect.entity2_attribute.clone(), def.entity2_attribute.clone()))
                } else {
                    None
                }
            } else {
                None
            }
        }
    }
}

/// Ids compare by value whether held as guid or reference
fn keys_equal(a: &Value, b: &Value, ci: bool) -> bool {
    match (a.as_id(), b.as_id()) {
        (Some(x), Some(y)) => x == y,
        _ => compare::equal(a, b, ci),
    }
}

fn merge(row: &mut Record, joined: &Record, join: &Join) {
    for (name, value) in &joined.attributes {
        let wrapped = AliasedValue::new(join.entity.clone(), name.clone(), value.clone().into_unaliased());
        row.attributes
            .insert(format!("{}.{}", join.alias, name), Value::Aliased(wrapped));
    }
    for (name, label) in &joined.formatted_values {
        row.formatted_values
            .insert(format!("{}.{}", join.alias, name), label.clone());
    }
}
