//! Core types for recordfake
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: closed sum type of attribute value kinds
//! - EntityReference / AliasedValue: lookup and joined-value wrappers
//! - Record: typed, identified bag of attributes
//! - Error: error taxonomy shared by every crate
//! - SchemaLookup: injected read-only schema capability
//! - Limits: page size and hierarchy depth defaults

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod record;
pub mod schema;
pub mod value;

pub use error::{Error, Result};
pub use limits::{Limits, DEFAULT_PAGE_SIZE, MAX_HIERARCHY_DEPTH};
pub use record::{Record, VERSION_NUMBER_ATTRIBUTE};
pub use schema::{NoSchema, SchemaLookup, SchemaRegistry};
pub use value::{AliasedValue, EntityReference, Value};

// Re-exported so downstream crates share one version of the id type
pub use uuid::Uuid;
