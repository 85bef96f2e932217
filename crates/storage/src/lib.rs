//! Storage layer for recordfake
//!
//! This crate implements the in-memory record repository with:
//! - RecordStore: DashMap of per-type DashMap partitions
//! - Version management with AtomicU64
//! - RelationshipRegistry: named one-to-many / many-to-many definitions
//! - associate / disassociate / related over intersect records and lookups
//!
//! # Concurrency
//!
//! - Lock-free reads via DashMap
//! - Per-type partitioning (no cross-type contention)
//! - Racing creates of one `(type, id)`: exactly one wins

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod associate;
pub mod registry;
pub mod store;

pub use associate::{associate, disassociate, related};
pub use registry::{
    IntersectDefinition, RelationshipDefinition, RelationshipKind, RelationshipRegistry,
};
pub use store::{Partition, RecordStore, UpsertOutcome};
