//! Error types for recordfake
//!
//! All failures raised by the store and the query engine are represented by
//! the [`Error`] enum. Errors are:
//! - **Structured**: each variant carries typed details
//! - **Serializable**: can be converted to/from JSON for test reports
//! - **Synchronous**: raised at the point of detection, never retried internally
//!
//! # Categories
//!
//! | Category | Variants | Description |
//! |----------|----------|-------------|
//! | Lookup | `NotFound`, `UnknownRelationship` | Record, relationship or schema entry absent |
//! | Identity | `DuplicateKey` | Create against an existing id, re-registering a name |
//! | Query | `InvalidQuery`, `NotImplemented` | Malformed or unmodelled query input |
//! | Aggregation | `UnsupportedAggregateType` | No aggregation rule for the value type |
//! | Concurrency | `ConcurrencyConflict` | Version precondition mismatch on update |
//! | Setup | `Config` | Configuration could not be read or parsed |

use serde::{Deserialize, Serialize};

/// Result type alias for recordfake operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every recordfake crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    // ==================== Lookup ====================
    /// Record, relationship or schema entry absent when an operation requires it
    #[error("{kind} not found: {key}")]
    NotFound {
        /// What was looked up ("record", "relationship", ...)
        kind: String,
        /// Human readable key of the missing item
        key: String,
    },

    /// A join or expansion named a relationship that was never registered
    #[error("unknown relationship: {name}")]
    UnknownRelationship {
        /// Relationship schema name
        name: String,
    },

    // ==================== Identity ====================
    /// Create against an existing identifier, or a name registered twice
    #[error("duplicate {kind}: {key}")]
    DuplicateKey {
        /// What collided ("record", "relationship", ...)
        kind: String,
        /// Human readable key of the collision
        key: String,
    },

    // ==================== Query ====================
    /// Malformed translation input
    #[error("invalid query: {reason}")]
    InvalidQuery {
        /// Why the query was rejected
        reason: String,
    },

    /// A query or request shape the engine does not model
    #[error("not implemented: {feature}")]
    NotImplemented {
        /// The unmodelled feature
        feature: String,
    },

    // ==================== Aggregation ====================
    /// Aggregate applied to a value type with no aggregation rule
    #[error("unsupported aggregate type: {function} over {value_type}")]
    UnsupportedAggregateType {
        /// Aggregate function name
        function: String,
        /// Offending value type name
        value_type: String,
    },

    // ==================== Concurrency ====================
    /// Version precondition mismatch on update
    #[error("concurrency conflict: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// Version the caller expected
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    // ==================== Setup ====================
    /// Configuration could not be read or parsed
    #[error("config error: {reason}")]
    Config {
        /// What went wrong
        reason: String,
    },
}

impl Error {
    /// Missing record of the given type
    pub fn record_not_found(logical_name: &str, id: impl std::fmt::Display) -> Self {
        Error::NotFound {
            kind: "record".to_string(),
            key: format!("{}({})", logical_name, id),
        }
    }

    /// Generic missing item
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Existing record of the given type
    pub fn duplicate_record(logical_name: &str, id: impl std::fmt::Display) -> Self {
        Error::DuplicateKey {
            kind: "record".to_string(),
            key: format!("{}({})", logical_name, id),
        }
    }

    /// Generic collision
    pub fn duplicate(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Error::DuplicateKey {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Rejected query
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Error::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// Unmodelled feature
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Error::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Aggregation rule missing for a value type
    pub fn unsupported_aggregate(function: impl Into<String>, value_type: impl Into<String>) -> Self {
        Error::UnsupportedAggregateType {
            function: function.into(),
            value_type: value_type.into(),
        }
    }

    /// Configuration failure
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// True for the `NotFound` variant
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True for the `DuplicateKey` variant
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Error::DuplicateKey { .. })
    }
}
