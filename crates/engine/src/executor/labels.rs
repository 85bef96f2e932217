//! Display names and formatted values
//!
//! Lookups returned without a name get the referenced record's primary-name
//! attribute, when the schema declares one and the record exists. Option and
//! boolean attributes get a label in `formatted_values`; labels already
//! present are left alone.

use super::QueryExecutor;
use recordfake_core::{Record, Value};
use tracing::trace;
use uuid::Uuid;

impl QueryExecutor<'_> {
    pub(super) fn resolve_names(&self, record: &mut Record) {
        for value in record.attributes.values_mut() {
            self.resolve_name(value);
        }
    }

    fn resolve_name(&self, value: &mut Value) {
        match value {
            Value::Reference(reference) if reference.name.is_none() => {
                reference.name = self.display_name(&reference.logical_name, reference.id);
            }
            Value::Aliased(aliased) => self.resolve_name(&mut aliased.value),
            _ => {}
        }
    }

    fn display_name(&self, entity: &str, id: Uuid) -> Option<String> {
        let attribute = self.schema.primary_name_attribute(entity)?;
        let record = match self.store.retrieve(entity, id) {
            Ok(record) => record,
            Err(e) => {
                trace!(target: "recordfake::engine", entity, %id, error = %e, "dangling reference");
                return None;
            }
        };
        match record.get(&attribute)?.unaliased() {
            Value::Null => None,
            Value::String(name) => Some(name.clone()),
            other => Some(other.to_string()),
        }
    }

    pub(super) fn resolve_labels(&self, record: &mut Record) {
        let entity = record.logical_name.as_str();
        let labels: Vec<(String, String)> = record
            .attributes
            .iter()
            .filter(|(name, _)| !record.formatted_values.contains_key(*name))
            .filter_map(|(name, value)| {
                self.label(entity, name, value)
                    .map(|label| (name.clone(), label))
            })
            .collect();
        record.formatted_values.extend(labels);
    }

    fn label(&self, entity: &str, attribute: &str, value: &Value) -> Option<String> {
        match value {
            Value::OptionSet(code) => Some(self.option_label(entity, attribute, *code)),
            Value::MultiOptionSet(codes) => Some(
                codes
                    .iter()
                    .map(|code| self.option_label(entity, attribute, *code))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            Value::Bool(flag) => Some(
                self.schema
                    .boolean_label(entity, attribute, *flag)
                    .unwrap_or_else(|| if *flag { "Yes" } else { "No" }.to_string()),
            ),
            Value::Aliased(aliased) => self.label(
                &aliased.entity_logical_name,
                &aliased.attribute_logical_name,
                &aliased.value,
            ),
            _ => None,
        }
    }

    fn option_label(&self, entity: &str, attribute: &str, code: i32) -> String {
        self.schema
            .option_label(entity, attribute, code)
            .unwrap_or_else(|| code.to_string())
    }
}
