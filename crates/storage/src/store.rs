//! Record repository
//!
//! Two-level concurrent mapping: record type -> (identifier -> record).
//!
//! # Design
//!
//! - Outer DashMap: one partition per record type, created lazily on first write
//! - Inner DashMap: per-type partition keyed by identifier
//! - AtomicU64: the only cross-cutting counter, used for version stamps
//!
//! # Thread Safety
//!
//! All operations are thread-safe without external locking:
//! - Writers to different types never touch the same partition
//! - Writers to different ids within a type only lock their DashMap shard
//! - Two creates racing on one `(type, id)` go through the partition's entry
//!   API, so exactly one succeeds and the other gets `DuplicateKey`
//! - A create or update is applied while holding the entry's shard lock, so
//!   no reader observes a half-merged record
//!
//! # Bulk operations
//!
//! `create_many`, `update_many`, `delete_many` and `upsert_many` are plain
//! sequential loops. The first failure stops the loop and is returned;
//! records written before it stay written. There is no rollback.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use recordfake_core::{
    Error, NoSchema, Record, Result, SchemaLookup, Value, VERSION_NUMBER_ATTRIBUTE,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-type partition
pub type Partition = DashMap<Uuid, Record>;

/// Outcome of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The record did not exist and was created
    Created(Uuid),
    /// The record existed and was merged into
    Updated(Uuid),
}

impl UpsertOutcome {
    /// Identifier of the written record
    pub fn id(&self) -> Uuid {
        match self {
            UpsertOutcome::Created(id) | UpsertOutcome::Updated(id) => *id,
        }
    }
}

/// Concurrent in-memory record repository.
///
/// # Example
///
/// ```
/// use recordfake_core::{Record, Value};
/// use recordfake_storage::RecordStore;
///
/// let store = RecordStore::new();
/// let id = store.create(Record::new("widget").set("size", 2i64)).unwrap();
/// let widget = store.retrieve("widget", id).unwrap();
/// assert_eq!(widget.get("size"), Some(&Value::Int(2)));
/// ```
pub struct RecordStore {
    /// Per-type partitions
    partitions: DashMap<String, Arc<Partition>>,
    /// Version stamp counter
    version: AtomicU64,
    /// Schema consulted for primary id attributes and versioning
    schema: Arc<dyn SchemaLookup>,
    /// Write `versionnumber` on versioned types
    auto_version: bool,
}

impl RecordStore {
    /// Create an empty store with no schema
    pub fn new() -> Self {
        Self::with_schema(Arc::new(NoSchema))
    }

    /// Create an empty store consulting the given schema
    pub fn with_schema(schema: Arc<dyn SchemaLookup>) -> Self {
        Self {
            partitions: DashMap::new(),
            version: AtomicU64::new(0),
            schema,
            auto_version: true,
        }
    }

    /// Enable or disable the `versionnumber` attribute on versioned types.
    ///
    /// `row_version` is stamped regardless.
    pub fn auto_version(mut self, enabled: bool) -> Self {
        self.auto_version = enabled;
        self
    }

    /// Schema this store consults
    pub fn schema(&self) -> &Arc<dyn SchemaLookup> {
        &self.schema
    }

    /// Current version stamp
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Increment version and return new value
    #[inline]
    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn partition(&self, logical_name: &str) -> Arc<Partition> {
        if let Some(existing) = self.partitions.get(logical_name) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .partitions
            .entry(logical_name.to_string())
            .or_insert_with(|| Arc::new(DashMap::new()));
        Arc::clone(entry.value())
    }

    fn existing_partition(&self, logical_name: &str) -> Option<Arc<Partition>> {
        self.partitions
            .get(logical_name)
            .map(|p| Arc::clone(p.value()))
    }

    /// Stamp version and identity attributes on a record about to be stored
    fn stamp(&self, record: &mut Record) {
        let version = self.next_version();
        record.row_version = version;
        let id_attribute = self.schema.primary_id_attribute(&record.logical_name);
        record
            .attributes
            .insert(id_attribute, Value::Guid(record.id));
        if self.auto_version && self.schema.is_versioned(&record.logical_name) {
            record.attributes.insert(
                VERSION_NUMBER_ATTRIBUTE.to_string(),
                Value::Int(version as i64),
            );
        }
    }

    /// Resolve the identifier of a record about to be created.
    ///
    /// A nil id falls back to the primary id attribute when the caller set
    /// one, otherwise a fresh v4 id is assigned.
    fn resolve_id(&self, record: &Record) -> Uuid {
        if !record.id.is_nil() {
            return record.id;
        }
        let id_attribute = self.schema.primary_id_attribute(&record.logical_name);
        match record.get(&id_attribute).and_then(Value::as_id) {
            Some(id) if !id.is_nil() => id,
            _ => Uuid::new_v4(),
        }
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Store a new record and return its identifier.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if a record with the same type and id already exists.
    pub fn create(&self, mut record: Record) -> Result<Uuid> {
        record.id = self.resolve_id(&record);
        let id = record.id;
        let partition = self.partition(&record.logical_name);
        let created = match partition.entry(id) {
            Entry::Occupied(_) => Err(Error::duplicate_record(&record.logical_name, id)),
            Entry::Vacant(slot) => {
                self.stamp(&mut record);
                debug!(
                    target: "recordfake::storage",
                    entity = %record.logical_name,
                    %id,
                    version = record.row_version,
                    "created record"
                );
                slot.insert(record);
                Ok(id)
            }
        };
        created
    }

    /// Fetch a copy of a stored record.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent.
    pub fn retrieve(&self, logical_name: &str, id: Uuid) -> Result<Record> {
        self.existing_partition(logical_name)
            .and_then(|p| p.get(&id).map(|r| r.value().clone()))
            .ok_or_else(|| Error::record_not_found(logical_name, id))
    }

    /// Merge a partial record into the stored one and bump its version.
    ///
    /// Returns the new version stamp.
    ///
    /// # Errors
    ///
    /// `NotFound` if the target does not exist.
    pub fn update(&self, partial: &Record) -> Result<u64> {
        self.merge(partial, None)
    }

    /// Like [`update`](Self::update), but only if the stored version matches.
    ///
    /// # Errors
    ///
    /// `NotFound` if the target does not exist, `ConcurrencyConflict` if its
    /// version differs from `expected`.
    pub fn update_if_version(&self, partial: &Record, expected: u64) -> Result<u64> {
        self.merge(partial, Some(expected))
    }

    fn merge(&self, partial: &Record, expected: Option<u64>) -> Result<u64> {
        let not_found = || Error::record_not_found(&partial.logical_name, partial.id);
        let partition = self
            .existing_partition(&partial.logical_name)
            .ok_or_else(not_found)?;
        let mut stored = partition.get_mut(&partial.id).ok_or_else(not_found)?;
        if let Some(expected) = expected {
            if stored.row_version != expected {
                return Err(Error::ConcurrencyConflict {
                    expected,
                    actual: stored.row_version,
                });
            }
        }
        stored.merge_from(partial);
        self.stamp(&mut stored);
        debug!(
            target: "recordfake::storage",
            entity = %partial.logical_name,
            id = %partial.id,
            version = stored.row_version,
            "updated record"
        );
        Ok(stored.row_version)
    }

    /// Remove a record.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent; deleting twice fails the second time.
    pub fn delete(&self, logical_name: &str, id: Uuid) -> Result<()> {
        self.existing_partition(logical_name)
            .and_then(|p| p.remove(&id))
            .map(|_| {
                debug!(target: "recordfake::storage", entity = %logical_name, %id, "deleted record");
            })
            .ok_or_else(|| Error::record_not_found(logical_name, id))
    }

    /// Create the record if absent, otherwise merge into it.
    pub fn upsert(&self, mut record: Record) -> Result<UpsertOutcome> {
        record.id = self.resolve_id(&record);
        let id = record.id;
        let partition = self.partition(&record.logical_name);
        let outcome = match partition.entry(id) {
            Entry::Occupied(mut slot) => {
                let stored = slot.get_mut();
                stored.merge_from(&record);
                self.stamp(stored);
                Ok(UpsertOutcome::Updated(id))
            }
            Entry::Vacant(slot) => {
                self.stamp(&mut record);
                slot.insert(record);
                Ok(UpsertOutcome::Created(id))
            }
        };
        outcome
    }

    // ========================================================================
    // Bulk operations (sequential, no rollback)
    // ========================================================================

    /// Create each record in order; stops at the first failure.
    pub fn create_many(&self, records: Vec<Record>) -> Result<Vec<Uuid>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            match self.create(record) {
                Ok(id) => ids.push(id),
                Err(e) => return Err(bulk_abort("create", ids.len(), e)),
            }
        }
        Ok(ids)
    }

    /// Update each record in order; stops at the first failure.
    pub fn update_many(&self, records: &[Record]) -> Result<()> {
        for (done, record) in records.iter().enumerate() {
            self.update(record).map_err(|e| bulk_abort("update", done, e))?;
        }
        Ok(())
    }

    /// Delete each `(type, id)` in order; stops at the first failure.
    pub fn delete_many(&self, targets: &[(String, Uuid)]) -> Result<()> {
        for (done, (logical_name, id)) in targets.iter().enumerate() {
            self.delete(logical_name, *id)
                .map_err(|e| bulk_abort("delete", done, e))?;
        }
        Ok(())
    }

    /// Upsert each record in order; stops at the first failure.
    pub fn upsert_many(&self, records: Vec<Record>) -> Result<Vec<UpsertOutcome>> {
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            match self.upsert(record) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => return Err(bulk_abort("upsert", outcomes.len(), e)),
            }
        }
        Ok(outcomes)
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    /// Check if a record exists
    pub fn exists(&self, logical_name: &str, id: Uuid) -> bool {
        self.existing_partition(logical_name)
            .map(|p| p.contains_key(&id))
            .unwrap_or(false)
    }

    /// Number of records of one type
    pub fn count(&self, logical_name: &str) -> usize {
        self.existing_partition(logical_name)
            .map(|p| p.len())
            .unwrap_or(0)
    }

    /// Record types that have been written at least once, sorted
    pub fn entity_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.partitions.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Point-in-time copy of every record of one type, sorted by identifier.
    ///
    /// Writes racing with the copy may or may not be visible.
    pub fn snapshot(&self, logical_name: &str) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .existing_partition(logical_name)
            .map(|p| p.iter().map(|r| r.value().clone()).collect())
            .unwrap_or_default();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Drop every record of every type
    pub fn clear(&self) {
        self.partitions.clear();
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn bulk_abort(operation: &str, completed: usize, error: Error) -> Error {
    warn!(
        target: "recordfake::storage",
        operation,
        completed,
        %error,
        "bulk operation aborted; earlier writes remain applied"
    );
    error
}
