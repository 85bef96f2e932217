//! Hashable projection of values
//!
//! `Value` is not `Eq + Hash` (floats, decimals). Distinct and group-by need
//! hash keys, so values are mapped to a [`KeyPart`] whose equality matches
//! `Value` equality: references by `(type, id)`, decimals by normalized
//! digits, floats by bit pattern with `-0.0` folded into `0.0`.

use recordfake_core::{Record, Value};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum KeyPart {
    Null,
    Text(String),
    Int(i64),
    Float(u64),
    Decimal(String),
    Money(String),
    Bool(bool),
    Instant(i64, u32),
    Guid(Uuid),
    Reference(String, Uuid),
    Option(i32),
    Options(Vec<i32>),
    Aliased(String, String, Box<KeyPart>),
    Bucket(i64),
}

impl KeyPart {
    pub(crate) fn of(value: &Value) -> Self {
        match value {
            Value::Null => KeyPart::Null,
            Value::String(s) => KeyPart::Text(s.clone()),
            Value::Int(i) => KeyPart::Int(*i),
            Value::Float(f) => KeyPart::Float(if *f == 0.0 { 0 } else { f.to_bits() }),
            Value::Decimal(d) => KeyPart::Decimal(d.normalized().to_string()),
            Value::Money(d) => KeyPart::Money(d.normalized().to_string()),
            Value::Bool(b) => KeyPart::Bool(*b),
            Value::DateTime(d) => KeyPart::Instant(d.timestamp(), d.timestamp_subsec_nanos()),
            Value::Guid(id) => KeyPart::Guid(*id),
            Value::Reference(r) => KeyPart::Reference(r.logical_name.clone(), r.id),
            Value::OptionSet(code) => KeyPart::Option(*code),
            Value::MultiOptionSet(codes) => KeyPart::Options(codes.clone()),
            Value::Aliased(a) => KeyPart::Aliased(
                a.entity_logical_name.clone(),
                a.attribute_logical_name.clone(),
                Box::new(KeyPart::of(&a.value)),
            ),
        }
    }
}

/// Structural identity of a row: type plus every attribute that passes `keep`
pub(crate) fn row_key(record: &Record, keep: impl Fn(&str) -> bool) -> (String, Vec<(String, KeyPart)>) {
    let attributes = record
        .attributes
        .iter()
        .filter(|(name, _)| keep(name))
        .map(|(name, value)| (name.clone(), KeyPart::of(value)))
        .collect();
    (record.logical_name.clone(), attributes)
}
