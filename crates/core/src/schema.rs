//! Schema lookup capability
//!
//! The query engine needs a handful of schema facts (primary-name attribute,
//! option labels, versioning, hierarchy attribute). These are read through
//! the [`SchemaLookup`] trait, injected into the store and executor rather
//! than held as global state, so the engine is testable without a full
//! metadata registry.
//!
//! Every method has a lenient default: a missing schema entry degrades to a
//! fallback instead of failing the caller.

use rustc_hash::FxHashMap;

/// Read-only schema facts consumed by the store and query engine.
pub trait SchemaLookup: Send + Sync {
    /// Attribute holding a record's own identifier
    fn primary_id_attribute(&self, entity: &str) -> String {
        format!("{}id", entity)
    }

    /// Attribute used as a record's display name
    fn primary_name_attribute(&self, _entity: &str) -> Option<String> {
        None
    }

    /// Label of an option code
    fn option_label(&self, _entity: &str, _attribute: &str, _code: i32) -> Option<String> {
        None
    }

    /// Label of a two-option (boolean) value
    fn boolean_label(&self, _entity: &str, _attribute: &str, _value: bool) -> Option<String> {
        None
    }

    /// Whether records of this type carry a `versionnumber` attribute
    fn is_versioned(&self, _entity: &str) -> bool {
        false
    }

    /// Self-referential parent attribute used by hierarchy operators
    fn hierarchy_attribute(&self, _entity: &str) -> Option<String> {
        None
    }
}

/// Schema that knows nothing; every lookup falls back.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSchema;

impl SchemaLookup for NoSchema {}

#[derive(Debug, Default, Clone)]
struct EntitySchema {
    primary_id: Option<String>,
    primary_name: Option<String>,
    versioned: bool,
    hierarchy: Option<String>,
    options: FxHashMap<(String, i32), String>,
    booleans: FxHashMap<(String, bool), String>,
}

/// In-memory schema tables, populated by test setup.
///
/// # Example
///
/// ```
/// use recordfake_core::{SchemaLookup, SchemaRegistry};
///
/// let schema = SchemaRegistry::new()
///     .primary_name("account", "name")
///     .with_option_label("account", "industrycode", 1, "Accounting")
///     .versioned("account");
///
/// assert_eq!(schema.primary_name_attribute("account").as_deref(), Some("name"));
/// assert_eq!(schema.option_label("account", "industrycode", 1).as_deref(), Some("Accounting"));
/// assert!(schema.is_versioned("account"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    entities: FxHashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn entity_mut(&mut self, entity: &str) -> &mut EntitySchema {
        self.entities.entry(entity.to_string()).or_default()
    }

    fn entity(&self, entity: &str) -> Option<&EntitySchema> {
        self.entities.get(entity)
    }

    /// Declare the primary id attribute
    pub fn primary_id(mut self, entity: &str, attribute: &str) -> Self {
        self.entity_mut(entity).primary_id = Some(attribute.to_string());
        self
    }

    /// Declare the primary name attribute
    pub fn primary_name(mut self, entity: &str, attribute: &str) -> Self {
        self.entity_mut(entity).primary_name = Some(attribute.to_string());
        self
    }

    /// Declare an option label
    pub fn with_option_label(mut self, entity: &str, attribute: &str, code: i32, label: &str) -> Self {
        self.entity_mut(entity)
            .options
            .insert((attribute.to_string(), code), label.to_string());
        self
    }

    /// Declare a boolean label
    pub fn with_boolean_label(mut self, entity: &str, attribute: &str, value: bool, label: &str) -> Self {
        self.entity_mut(entity)
            .booleans
            .insert((attribute.to_string(), value), label.to_string());
        self
    }

    /// Mark a record type as versioned
    pub fn versioned(mut self, entity: &str) -> Self {
        self.entity_mut(entity).versioned = true;
        self
    }

    /// Declare the hierarchy (parent) attribute
    pub fn hierarchy(mut self, entity: &str, attribute: &str) -> Self {
        self.entity_mut(entity).hierarchy = Some(attribute.to_string());
        self
    }
}

impl SchemaLookup for SchemaRegistry {
    fn primary_id_attribute(&self, entity: &str) -> String {
        self.entity(entity)
            .and_then(|e| e.primary_id.clone())
            .unwrap_or_else(|| format!("{}id", entity))
    }

    fn primary_name_attribute(&self, entity: &str) -> Option<String> {
        self.entity(entity).and_then(|e| e.primary_name.clone())
    }

    fn option_label(&self, entity: &str, attribute: &str, code: i32) -> Option<String> {
        self.entity(entity)
            .and_then(|e| e.options.get(&(attribute.to_string(), code)).cloned())
    }

    fn boolean_label(&self, entity: &str, attribute: &str, value: bool) -> Option<String> {
        self.entity(entity)
            .and_then(|e| e.booleans.get(&(attribute.to_string(), value)).cloned())
    }

    fn is_versioned(&self, entity: &str) -> bool {
        self.entity(entity).map(|e| e.versioned).unwrap_or(false)
    }

    fn hierarchy_attribute(&self, entity: &str) -> Option<String> {
        self.entity(entity).and_then(|e| e.hierarchy.clone())
    }
}
