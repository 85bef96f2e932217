//! Record type
//!
//! A record is a typed, identified bag of attribute values. Records are
//! mutable: updates merge attributes rather than replacing the whole record.

use crate::value::{EntityReference, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Attribute written on versioned record types
pub const VERSION_NUMBER_ATTRIBUTE: &str = "versionnumber";

/// A typed, identified bag of named attribute values.
///
/// # Identity
///
/// Within a record type (`logical_name`) identifiers are unique. Identical
/// identifiers across types carry no meaning.
///
/// # Formatted values
///
/// `formatted_values` holds human readable labels for option, boolean and
/// aliased attributes. Query execution only ever adds labels to this map;
/// a caller-supplied label is never overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record type name
    pub logical_name: String,
    /// Identifier; `Uuid::nil()` means "assign on create"
    pub id: Uuid,
    /// Attribute name -> value
    pub attributes: BTreeMap<String, Value>,
    /// Attribute name -> display label
    #[serde(default)]
    pub formatted_values: BTreeMap<String, String>,
    /// Optimistic-concurrency stamp assigned by the store
    #[serde(default)]
    pub row_version: u64,
}

impl Record {
    /// Create an empty record with an unassigned id
    pub fn new(logical_name: impl Into<String>) -> Self {
        Self::with_id(logical_name, Uuid::nil())
    }

    /// Create an empty record with a caller supplied id
    pub fn with_id(logical_name: impl Into<String>, id: Uuid) -> Self {
        Self {
            logical_name: logical_name.into(),
            id,
            attributes: BTreeMap::new(),
            formatted_values: BTreeMap::new(),
            row_version: 0,
        }
    }

    /// Builder-style attribute setter
    pub fn set(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(attribute.into(), value.into());
        self
    }

    /// Set an attribute in place
    pub fn insert(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(attribute.into(), value.into());
    }

    /// Read an attribute
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Check whether an attribute is present (null counts as present)
    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute)
    }

    /// Remove an attribute
    pub fn remove(&mut self, attribute: &str) -> Option<Value> {
        self.attributes.remove(attribute)
    }

    /// Reference pointing at this record
    pub fn to_reference(&self) -> EntityReference {
        EntityReference::new(self.logical_name.clone(), self.id)
    }

    /// Merge another record's attributes into this one; incoming values win
    pub fn merge_from(&mut self, partial: &Record) {
        for (name, value) in &partial.attributes {
            self.attributes.insert(name.clone(), value.clone());
        }
        for (name, label) in &partial.formatted_values {
            self.formatted_values.insert(name.clone(), label.clone());
        }
    }

    /// Keep only the named attributes
    pub fn project(&mut self, columns: &[String]) {
        self.attributes.retain(|name, _| columns.iter().any(|c| c == name));
        self.formatted_values
            .retain(|name, _| columns.iter().any(|c| c == name));
    }
}
