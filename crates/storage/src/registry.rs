//! Relationship registry
//!
//! Named relationship definitions, registered once by test setup and
//! read-only afterwards. Consumed by associate/disassociate, by
//! related-record expansion on retrieve, and by relationship-named joins.
//!
//! ## Usage
//!
//! ```
//! use recordfake_storage::{RelationshipDefinition, RelationshipRegistry};
//!
//! let registry = RelationshipRegistry::new();
//! registry
//!     .register(RelationshipDefinition::many_to_many(
//!         "a_b", "a", "aid", "b", "bid", "ab",
//!     ))
//!     .unwrap();
//!
//! let def = registry.lookup("a_b").unwrap();
//! assert_eq!(def.intersect.as_ref().unwrap().logical_name, "ab");
//! ```

use parking_lot::RwLock;
use recordfake_core::{Error, Result};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// Cardinality of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    /// `entity1` is referenced by a lookup attribute on `entity2`
    OneToMany,
    /// Realised through intersect records
    ManyToMany,
}

/// Intersect record type realising a many-to-many relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntersectDefinition {
    /// Intersect record type
    pub logical_name: String,
    /// Foreign key attribute pointing at `entity1`
    pub entity1_attribute: String,
    /// Foreign key attribute pointing at `entity2`
    pub entity2_attribute: String,
}

/// Named relationship between two record types.
///
/// For `OneToMany`, `entity1` is the referenced side, `entity1_attribute` its
/// primary id attribute, and `entity2_attribute` the lookup attribute on the
/// many side. For `ManyToMany`, both attributes are the participants' primary
/// id attributes and `intersect` names the linking record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDefinition {
    /// Schema name
    pub name: String,
    /// Cardinality
    pub kind: RelationshipKind,
    /// First participant type
    pub entity1: String,
    /// Relating attribute on the first participant
    pub entity1_attribute: String,
    /// Second participant type
    pub entity2: String,
    /// Relating attribute on the second participant
    pub entity2_attribute: String,
    /// Intersect record type (many-to-many only)
    pub intersect: Option<IntersectDefinition>,
}

impl RelationshipDefinition {
    /// One-to-many: `referenced` is pointed at by `lookup_attribute` on `referencing`
    pub fn one_to_many(
        name: impl Into<String>,
        referenced: impl Into<String>,
        referenced_attribute: impl Into<String>,
        referencing: impl Into<String>,
        lookup_attribute: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationshipKind::OneToMany,
            entity1: referenced.into(),
            entity1_attribute: referenced_attribute.into(),
            entity2: referencing.into(),
            entity2_attribute: lookup_attribute.into(),
            intersect: None,
        }
    }

    /// Many-to-many through an intersect type whose foreign keys reuse the
    /// participants' primary id attribute names
    pub fn many_to_many(
        name: impl Into<String>,
        entity1: impl Into<String>,
        entity1_attribute: impl Into<String>,
        entity2: impl Into<String>,
        entity2_attribute: impl Into<String>,
        intersect: impl Into<String>,
    ) -> Self {
        let entity1_attribute = entity1_attribute.into();
        let entity2_attribute = entity2_attribute.into();
        Self {
            name: name.into(),
            kind: RelationshipKind::ManyToMany,
            entity1: entity1.into(),
            entity2: entity2.into(),
            intersect: Some(IntersectDefinition {
                logical_name: intersect.into(),
                entity1_attribute: entity1_attribute.clone(),
                entity2_attribute: entity2_attribute.clone(),
            }),
            entity1_attribute,
            entity2_attribute,
        }
    }

    /// Override the intersect foreign key attribute names
    pub fn with_intersect_attributes(
        mut self,
        entity1_attribute: impl Into<String>,
        entity2_attribute: impl Into<String>,
    ) -> Self {
        if let Some(intersect) = self.intersect.as_mut() {
            intersect.entity1_attribute = entity1_attribute.into();
            intersect.entity2_attribute = entity2_attribute.into();
        }
        self
    }

    /// Whether `entity` takes part in this relationship
    pub fn involves(&self, entity: &str) -> bool {
        self.entity1 == entity || self.entity2 == entity
    }

    /// The participant on the other side of `entity`, if it takes part.
    ///
    /// Self-referential relationships return the same type.
    pub fn other_side(&self, entity: &str) -> Option<&str> {
        if self.entity1 == entity {
            Some(&self.entity2)
        } else if self.entity2 == entity {
            Some(&self.entity1)
        } else {
            None
        }
    }
}

/// Registry of relationship definitions
pub struct RelationshipRegistry {
    definitions: RwLock<FxHashMap<String, Arc<RelationshipDefinition>>>,
}

impl RelationshipRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register a definition under its name.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if the name is taken; `Config` for a many-to-many
    /// definition without an intersect type.
    pub fn register(&self, definition: RelationshipDefinition) -> Result<()> {
        if definition.kind == RelationshipKind::ManyToMany && definition.intersect.is_none() {
            return Err(Error::config(format!(
                "many-to-many relationship {} has no intersect type",
                definition.name
            )));
        }
        let mut definitions = self.definitions.write();
        if definitions.contains_key(&definition.name) {
            return Err(Error::duplicate("relationship", definition.name));
        }
        debug!(
            target: "recordfake::storage",
            name = %definition.name,
            kind = ?definition.kind,
            "registered relationship"
        );
        definitions.insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Look up a definition.
    ///
    /// # Errors
    ///
    /// `NotFound` if never registered. Callers should treat this as a setup
    /// error, not a transient one.
    pub fn lookup(&self, name: &str) -> Result<Arc<RelationshipDefinition>> {
        self.definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found("relationship", name))
    }

    /// Remove a definition
    pub fn unregister(&self, name: &str) -> Result<()> {
        self.definitions
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("relationship", name))
    }

    /// Check if a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Every definition, sorted by name
    pub fn definitions(&self) -> Vec<Arc<RelationshipDefinition>> {
        let mut all: Vec<Arc<RelationshipDefinition>> =
            self.definitions.read().values().cloned().collect();
        all.sort_by(|x, y| x.name.cmp(&y.name));
        all
    }

    /// Definitions whose participants are exactly the given pair, in either order
    pub fn between(&self, a: &str, b: &str) -> Vec<Arc<RelationshipDefinition>> {
        self.definitions()
            .into_iter()
            .filter(|d| {
                (d.entity1 == a && d.entity2 == b) || (d.entity1 == b && d.entity2 == a)
            })
            .collect()
    }
}

impl Default for RelationshipRegistry {
    fn default() -> Self {
        Self::new()
    }
}
