//! Attribute value model
//!
//! A record's attributes hold one of a fixed set of value kinds. The set is
//! closed and matched exhaustively by filtering, sorting and aggregation, so
//! it is modelled as a single enum rather than a trait hierarchy.
//!
//! ## Value kinds
//!
//! - Primitive scalars: `String`, `Int`, `Float`, `Decimal`, `Bool`, `DateTime`, `Guid`
//! - `Money`: a decimal tagged as currency
//! - `Reference`: a lookup to another record ([`EntityReference`])
//! - `OptionSet` / `MultiOptionSet`: integer codes resolved to labels via schema
//! - `Aliased`: a value tagged with the joined record it was sourced from
//! - `Null`: explicit null (cleared attributes, empty aggregates)
//!
//! ## Equality rules
//!
//! - Different kinds are never equal: `Int(1) != Float(1.0)`
//! - Floats use IEEE-754 equality
//! - References compare by `(logical_name, id)`; the cached display name is ignored

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Lookup to another record.
///
/// Equality and hashing use `(logical_name, id)` only, so two references to
/// the same record are equal whether or not their display names were resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityReference {
    /// Logical name of the referenced record type
    pub logical_name: String,
    /// Identifier of the referenced record
    pub id: Uuid,
    /// Cached display name (primary-name attribute of the target)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EntityReference {
    /// Create a reference without a display name
    pub fn new(logical_name: impl Into<String>, id: Uuid) -> Self {
        Self {
            logical_name: logical_name.into(),
            id,
            name: None,
        }
    }

    /// Attach a display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl PartialEq for EntityReference {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.logical_name == other.logical_name
    }
}

impl Eq for EntityReference {}

impl Hash for EntityReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.logical_name.hash(state);
        self.id.hash(state);
    }
}

/// A value sourced from a joined record, or an aggregate output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasedValue {
    /// Logical name of the record type the value came from
    pub entity_logical_name: String,
    /// Attribute the value came from
    pub attribute_logical_name: String,
    /// The wrapped value
    pub value: Box<Value>,
}

impl AliasedValue {
    /// Wrap a value
    pub fn new(
        entity_logical_name: impl Into<String>,
        attribute_logical_name: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            entity_logical_name: entity_logical_name.into(),
            attribute_logical_name: attribute_logical_name.into(),
            value: Box::new(value),
        }
    }
}

/// Attribute value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Explicit null
    Null,
    /// UTF-8 string
    String(String),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// Arbitrary precision decimal
    Decimal(BigDecimal),
    /// Boolean (two-option attribute)
    Bool(bool),
    /// UTC timestamp
    DateTime(DateTime<Utc>),
    /// Unique identifier
    Guid(Uuid),
    /// Currency amount
    Money(BigDecimal),
    /// Lookup to another record
    Reference(EntityReference),
    /// Single option code
    OptionSet(i32),
    /// Multiple option codes
    MultiOptionSet(Vec<i32>),
    /// Value tagged with its source record type and attribute
    Aliased(AliasedValue),
}

// Custom PartialEq for IEEE-754 float semantics and cross-kind inequality
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Guid(a), Value::Guid(b)) => a == b,
            (Value::Money(a), Value::Money(b)) => a == b,
            (Value::Reference(a), Value::Reference(b)) => a == b,
            (Value::OptionSet(a), Value::OptionSet(b)) => a == b,
            (Value::MultiOptionSet(a), Value::MultiOptionSet(b)) => a == b,
            (Value::Aliased(a), Value::Aliased(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Get the kind name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::String(_) => "String",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Decimal(_) => "Decimal",
            Value::Bool(_) => "Bool",
            Value::DateTime(_) => "DateTime",
            Value::Guid(_) => "Guid",
            Value::Money(_) => "Money",
            Value::Reference(_) => "Reference",
            Value::OptionSet(_) => "OptionSet",
            Value::MultiOptionSet(_) => "MultiOptionSet",
            Value::Aliased(_) => "Aliased",
        }
    }

    /// Check for explicit null, looking through aliases
    pub fn is_null(&self) -> bool {
        matches!(self.unaliased(), Value::Null)
    }

    /// Strip any number of `Aliased` wrappers
    pub fn unaliased(&self) -> &Value {
        let mut current = self;
        while let Value::Aliased(aliased) = current {
            current = &aliased.value;
        }
        current
    }

    /// Consume and strip any number of `Aliased` wrappers
    pub fn into_unaliased(self) -> Value {
        let mut current = self;
        while let Value::Aliased(aliased) = current {
            current = *aliased.value;
        }
        current
    }

    /// Identifier carried by a `Guid` or `Reference`, used for join keys
    pub fn as_id(&self) -> Option<Uuid> {
        match self.unaliased() {
            Value::Guid(id) => Some(*id),
            Value::Reference(r) => Some(r.id),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as timestamp if this is a DateTime value
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(d) => Some(*d),
            _ => None,
        }
    }

    /// Get the reference if this is a Reference value
    pub fn as_reference(&self) -> Option<&EntityReference> {
        match self {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// Get the option code if this is an OptionSet value
    pub fn as_option_set(&self) -> Option<i32> {
        match self {
            Value::OptionSet(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Decimal(d) | Value::Money(d) => write!(f, "{}", d),
            Value::Bool(b) => write!(f, "{}", b),
            Value::DateTime(d) => write!(f, "{}", d.to_rfc3339()),
            Value::Guid(id) => write!(f, "{}", id),
            Value::Reference(r) => write!(f, "{}({})", r.logical_name, r.id),
            Value::OptionSet(code) => write!(f, "{}", code),
            Value::MultiOptionSet(codes) => {
                let parts: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            Value::Aliased(a) => write!(f, "{}", a.value),
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<BigDecimal> for Value {
    fn from(d: BigDecimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::DateTime(d)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Value::Guid(id)
    }
}

impl From<EntityReference> for Value {
    fn from(r: EntityReference) -> Self {
        Value::Reference(r)
    }
}
