//! Context facade
//!
//! A [`Context`] owns one record store, one relationship registry and the
//! injected schema, and exposes the CRUD and query contracts callers program
//! against. It is `Send + Sync`; share it behind an `Arc` across threads.

use crate::config::{ContextConfig, CONFIG_FILE_NAME};
use recordfake_core::{
    EntityReference, Error, NoSchema, Record, Result, SchemaLookup, Uuid,
};
use recordfake_engine::{
    from_fetch_xml, from_structured, ColumnSet, ExecutorOptions, Query, QueryExecutor, QueryPlan,
    QueryResult,
};
use recordfake_storage::{
    associate, disassociate, related, RecordStore, RelationshipDefinition, RelationshipRegistry,
    UpsertOutcome,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// In-memory stand-in for a business-records service.
///
/// # Example
///
/// ```ignore
/// use recordfake::{Context, Record, QueryExpression, ColumnSet};
///
/// let ctx = Context::new();
/// let id = ctx.create(Record::new("account").set("name", "Contoso"))?;
/// let account = ctx.retrieve("account", id, &ColumnSet::new(&["name"]))?;
/// let page = ctx.retrieve_multiple(&QueryExpression::new("account").into())?;
/// ```
pub struct Context {
    store: RecordStore,
    relationships: RelationshipRegistry,
    schema: Arc<dyn SchemaLookup>,
    config: ContextConfig,
}

impl Context {
    /// Empty context with default configuration and no schema
    pub fn new() -> Self {
        Self::with_config(ContextConfig::default())
    }

    /// Empty context with the given configuration and no schema
    pub fn with_config(config: ContextConfig) -> Self {
        Self::with_schema(config, Arc::new(NoSchema))
    }

    /// Empty context reading schema facts from `schema`
    pub fn with_schema(config: ContextConfig, schema: Arc<dyn SchemaLookup>) -> Self {
        let store = RecordStore::with_schema(Arc::clone(&schema)).auto_version(config.auto_version);
        info!(
            target: "recordfake::engine",
            page_size = config.default_page_size,
            hierarchy_depth = config.max_hierarchy_depth,
            case_insensitive = config.case_insensitive_strings,
            "context created"
        );
        Self {
            store,
            relationships: RelationshipRegistry::new(),
            schema,
            config,
        }
    }

    /// Context configured from `recordfake.toml` in `dir`, writing the
    /// default file first if there is none.
    ///
    /// # Errors
    ///
    /// `Config` if the file cannot be written, read or parsed.
    pub fn open(dir: &Path, schema: Arc<dyn SchemaLookup>) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        ContextConfig::write_default_if_missing(&path)?;
        let config = ContextConfig::from_file(&path)?;
        Ok(Self::with_schema(config, schema))
    }

    /// Active configuration
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Underlying record store
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Registered relationships
    pub fn relationships(&self) -> &RelationshipRegistry {
        &self.relationships
    }

    // ========================================================================
    // Relationships
    // ========================================================================

    /// Register a relationship definition.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if the name is already registered.
    pub fn register_relationship(&self, definition: RelationshipDefinition) -> Result<()> {
        self.relationships.register(definition)
    }

    /// Link `target` with `related_records` through the named relationship.
    ///
    /// # Errors
    ///
    /// `UnknownRelationship` if the name is not registered, otherwise as
    /// [`recordfake_storage::associate`].
    pub fn associate(
        &self,
        relationship: &str,
        target: &EntityReference,
        related_records: &[EntityReference],
    ) -> Result<()> {
        let def = self.relationship(relationship)?;
        associate(&self.store, &def, target, related_records)
    }

    /// Remove links between `target` and `related_records`.
    ///
    /// # Errors
    ///
    /// `UnknownRelationship` if the name is not registered, otherwise as
    /// [`recordfake_storage::disassociate`].
    pub fn disassociate(
        &self,
        relationship: &str,
        target: &EntityReference,
        related_records: &[EntityReference],
    ) -> Result<()> {
        let def = self.relationship(relationship)?;
        disassociate(&self.store, &def, target, related_records)
    }

    fn relationship(&self, name: &str) -> Result<Arc<RelationshipDefinition>> {
        self.relationships
            .lookup(name)
            .map_err(|_| Error::UnknownRelationship { name: name.to_string() })
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Store a new record and return its id.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if the id is already taken for the type.
    pub fn create(&self, record: Record) -> Result<Uuid> {
        self.store.create(record)
    }

    /// Fetch one record restricted to `columns`, with reference names and
    /// option labels resolved.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent.
    pub fn retrieve(&self, logical_name: &str, id: Uuid, columns: &ColumnSet) -> Result<Record> {
        let mut record = self.store.retrieve(logical_name, id)?;
        if let ColumnSet::Columns(names) = columns {
            record.project(names);
        }
        self.executor().decorate(&mut record);
        Ok(record)
    }

    /// Fetch one record together with the records related to it through the
    /// named relationship. Related records carry all columns.
    ///
    /// # Errors
    ///
    /// `NotFound` if the record is absent; `UnknownRelationship` if the name
    /// is not registered.
    pub fn retrieve_with_related(
        &self,
        logical_name: &str,
        id: Uuid,
        columns: &ColumnSet,
        relationship: &str,
    ) -> Result<(Record, Vec<Record>)> {
        let record = self.retrieve(logical_name, id, columns)?;
        let def = self.relationship(relationship)?;
        let source = EntityReference::new(logical_name, id);
        let executor = self.executor();
        let mut others = related(&self.store, &def, &source)?;
        for other in &mut others {
            executor.decorate(other);
        }
        Ok((record, others))
    }

    /// Merge a partial record into the stored one; returns the new version.
    pub fn update(&self, partial: &Record) -> Result<u64> {
        self.store.update(partial)
    }

    /// Update only if the stored version equals `expected`.
    ///
    /// # Errors
    ///
    /// `ConcurrencyConflict` on a version mismatch.
    pub fn update_if_version(&self, partial: &Record, expected: u64) -> Result<u64> {
        self.store.update_if_version(partial, expected)
    }

    /// Remove a record
    pub fn delete(&self, logical_name: &str, id: Uuid) -> Result<()> {
        self.store.delete(logical_name, id)
    }

    /// Create the record if absent, otherwise merge into it
    pub fn upsert(&self, record: Record) -> Result<UpsertOutcome> {
        self.store.upsert(record)
    }

    // ========================================================================
    // Bulk (sequential; earlier writes stay visible after a failure)
    // ========================================================================

    /// Create each record in order
    pub fn create_many(&self, records: Vec<Record>) -> Result<Vec<Uuid>> {
        self.store.create_many(records)
    }

    /// Update each record in order
    pub fn update_many(&self, records: &[Record]) -> Result<()> {
        self.store.update_many(records)
    }

    /// Delete each `(type, id)` in order
    pub fn delete_many(&self, targets: &[(String, Uuid)]) -> Result<()> {
        self.store.delete_many(targets)
    }

    /// Upsert each record in order
    pub fn upsert_many(&self, records: Vec<Record>) -> Result<Vec<UpsertOutcome>> {
        self.store.upsert_many(records)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Run a structured or XML query and return the requested page.
    ///
    /// # Errors
    ///
    /// Translation errors (`InvalidQuery`, `NotImplemented`) and execution
    /// errors (`UnknownRelationship`, `UnsupportedAggregateType`).
    pub fn retrieve_multiple(&self, query: &Query) -> Result<QueryResult> {
        let plan = from_structured(query)?;
        self.execute(&plan)
    }

    /// Run an XML query document
    pub fn fetch(&self, document: &str) -> Result<QueryResult> {
        let plan = from_fetch_xml(document)?;
        self.execute(&plan)
    }

    /// Run an already translated plan
    pub fn execute(&self, plan: &QueryPlan) -> Result<QueryResult> {
        self.executor().execute(plan)
    }

    /// Drop every record; relationship definitions are kept.
    pub fn clear(&self) {
        self.store.clear();
    }

    fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(
            &self.store,
            &self.relationships,
            self.schema.as_ref(),
            self.options(),
        )
    }

    fn options(&self) -> ExecutorOptions {
        self.config.executor_options()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
