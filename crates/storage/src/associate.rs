//! Associate / disassociate
//!
//! Many-to-many relationships are realised as intersect records carrying one
//! foreign key per participant. One-to-many relationships are realised by the
//! lookup attribute on the many side.
//!
//! | Kind | associate | disassociate |
//! |------|-----------|--------------|
//! | ManyToMany | create one intersect record per related target | delete the matching intersect record |
//! | OneToMany | set the lookup to a reference of the one side | clear the lookup to null |

use crate::registry::{IntersectDefinition, RelationshipDefinition, RelationshipKind};
use crate::store::RecordStore;
use recordfake_core::{EntityReference, Error, Record, Result, Value};
use tracing::debug;
use uuid::Uuid;

fn not_a_participant(def: &RelationshipDefinition, entity: &str) -> Error {
    Error::invalid_query(format!(
        "{} is not part of relationship {}",
        entity, def.name
    ))
}

/// Intersect definition plus the foreign keys as seen from `entity`: (own, other)
fn intersect_sides<'a>(
    def: &'a RelationshipDefinition,
    entity: &str,
) -> Result<(&'a IntersectDefinition, &'a str, &'a str)> {
    let intersect = def
        .intersect
        .as_ref()
        .ok_or_else(|| Error::config(format!("{} has no intersect type", def.name)))?;
    if def.entity1 == entity {
        Ok((intersect, &intersect.entity1_attribute, &intersect.entity2_attribute))
    } else if def.entity2 == entity {
        Ok((intersect, &intersect.entity2_attribute, &intersect.entity1_attribute))
    } else {
        Err(not_a_participant(def, entity))
    }
}

fn refers_to(record: &Record, attribute: &str, id: Uuid) -> bool {
    record.get(attribute).and_then(Value::as_id) == Some(id)
}

fn find_intersects(
    store: &RecordStore,
    intersect: &IntersectDefinition,
    own: &str,
    own_id: Uuid,
    other: &str,
    other_id: Uuid,
) -> Vec<Record> {
    store
        .snapshot(&intersect.logical_name)
        .into_iter()
        .filter(|r| refers_to(r, own, own_id) && refers_to(r, other, other_id))
        .collect()
}

fn ensure_exists(store: &RecordStore, target: &EntityReference) -> Result<()> {
    if store.exists(&target.logical_name, target.id) {
        Ok(())
    } else {
        Err(Error::record_not_found(&target.logical_name, target.id))
    }
}

/// Link `target` with every record in `related`.
///
/// # Errors
///
/// - `NotFound` if the target or a related record does not exist
/// - `DuplicateKey` if a many-to-many pair is already linked
/// - `InvalidQuery` if a record type does not take part in the relationship
pub fn associate(
    store: &RecordStore,
    def: &RelationshipDefinition,
    target: &EntityReference,
    related: &[EntityReference],
) -> Result<()> {
    ensure_exists(store, target)?;
    for other in related {
        ensure_exists(store, other)?;
    }

    match def.kind {
        RelationshipKind::ManyToMany => {
            let (intersect, own, theirs) = intersect_sides(def, &target.logical_name)?;
            for other in related {
                if def.other_side(&target.logical_name) != Some(other.logical_name.as_str()) {
                    return Err(not_a_participant(def, &other.logical_name));
                }
                if !find_intersects(store, intersect, own, target.id, theirs, other.id).is_empty() {
                    return Err(Error::duplicate(
                        "association",
                        format!("{}({}, {})", def.name, target.id, other.id),
                    ));
                }
                let link = Record::new(intersect.logical_name.clone())
                    .set(own, target.id)
                    .set(theirs, other.id);
                let link_id = store.create(link)?;
                debug!(
                    target: "recordfake::storage",
                    relationship = %def.name,
                    intersect = %link_id,
                    "associated"
                );
            }
            Ok(())
        }
        RelationshipKind::OneToMany => {
            for other in related {
                let (one, many) = one_to_many_sides(def, target, other)?;
                let partial = Record::with_id(many.logical_name.clone(), many.id).set(
                    def.entity2_attribute.clone(),
                    EntityReference::new(one.logical_name.clone(), one.id),
                );
                store.update(&partial)?;
                debug!(
                    target: "recordfake::storage",
                    relationship = %def.name,
                    one = %one.id,
                    many = %many.id,
                    "associated"
                );
            }
            Ok(())
        }
    }
}

/// Remove the links between `target` and every record in `related`.
///
/// # Errors
///
/// `NotFound` if a pair is not linked.
pub fn disassociate(
    store: &RecordStore,
    def: &RelationshipDefinition,
    target: &EntityReference,
    related: &[EntityReference],
) -> Result<()> {
    match def.kind {
        RelationshipKind::ManyToMany => {
            let (intersect, own, theirs) = intersect_sides(def, &target.logical_name)?;
            for other in related {
                let links = find_intersects(store, intersect, own, target.id, theirs, other.id);
                if links.is_empty() {
                    return Err(Error::not_found(
                        "association",
                        format!("{}({}, {})", def.name, target.id, other.id),
                    ));
                }
                for link in links {
                    store.delete(&intersect.logical_name, link.id)?;
                }
            }
            Ok(())
        }
        RelationshipKind::OneToMany => {
            for other in related {
                let (one, many) = one_to_many_sides(def, target, other)?;
                let stored = store.retrieve(&many.logical_name, many.id)?;
                if !refers_to(&stored, &def.entity2_attribute, one.id) {
                    return Err(Error::not_found(
                        "association",
                        format!("{}({}, {})", def.name, one.id, many.id),
                    ));
                }
                let partial = Record::with_id(many.logical_name.clone(), many.id)
                    .set(def.entity2_attribute.clone(), Value::Null);
                store.update(&partial)?;
            }
            Ok(())
        }
    }
}

/// Orient a one-to-many pair as (one side, many side).
///
/// When both types match (self-referential), `target` is the one side.
fn one_to_many_sides<'a>(
    def: &RelationshipDefinition,
    target: &'a EntityReference,
    other: &'a EntityReference,
) -> Result<(&'a EntityReference, &'a EntityReference)> {
    if target.logical_name == def.entity1 && other.logical_name == def.entity2 {
        Ok((target, other))
    } else if target.logical_name == def.entity2 && other.logical_name == def.entity1 {
        Ok((other, target))
    } else if def.involves(&target.logical_name) {
        Err(not_a_participant(def, &other.logical_name))
    } else {
        Err(not_a_participant(def, &target.logical_name))
    }
}

/// Records on the other side of `source` through `def`, sorted by id.
///
/// Dangling foreign keys are skipped.
pub fn related(
    store: &RecordStore,
    def: &RelationshipDefinition,
    source: &EntityReference,
) -> Result<Vec<Record>> {
    match def.kind {
        RelationshipKind::ManyToMany => {
            let (intersect, own, theirs) = intersect_sides(def, &source.logical_name)?;
            let other_type = def
                .other_side(&source.logical_name)
                .ok_or_else(|| not_a_participant(def, &source.logical_name))?;
            let mut records: Vec<Record> = store
                .snapshot(&intersect.logical_name)
                .into_iter()
                .filter(|link| refers_to(link, own, source.id))
                .filter_map(|link| link.get(theirs).and_then(Value::as_id))
                .filter_map(|id| store.retrieve(other_type, id).ok())
                .collect();
            records.sort_by(|a, b| a.id.cmp(&b.id));
            records.dedup_by(|a, b| a.id == b.id);
            Ok(records)
        }
        RelationshipKind::OneToMany if source.logical_name == def.entity1 => Ok(store
            .snapshot(&def.entity2)
            .into_iter()
            .filter(|r| refers_to(r, &def.entity2_attribute, source.id))
            .collect()),
        RelationshipKind::OneToMany if source.logical_name == def.entity2 => {
            let record = store.retrieve(&source.logical_name, source.id)?;
            Ok(record
                .get(&def.entity2_attribute)
                .and_then(Value::as_id)
                .and_then(|id| store.retrieve(&def.entity1, id).ok())
                .into_iter()
                .collect())
        }
        RelationshipKind::OneToMany => Err(not_a_participant(def, &source.logical_name)),
    }
}
