//! Query executor
//!
//! Runs a [`QueryPlan`] against a [`RecordStore`]. Stages, in order:
//!
//! 1. snapshot the target type
//! 2. joins, depth first (`alias.attribute` columns, outer rows kept)
//! 3. filter
//! 4. distinct
//! 5. aggregation, when the plan carries directives
//! 6. stable multi-key sort
//! 7. top
//! 8. total count, then paging and the continuation cookie
//! 9. projection, reference names and option labels
//!
//! Top is applied after distinct, so `top=N` with distinct yields N distinct
//! rows whenever that many exist.

pub(crate) mod compare;
mod filter;
mod join;
mod labels;
mod page;

pub use page::PagingCookie;

use crate::aggregate;
use crate::key::row_key;
use crate::plan::{Join, QueryPlan, SortKey};
use recordfake_core::{Limits, Record, Result, SchemaLookup, Value};
use recordfake_storage::{RecordStore, RelationshipRegistry};
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::cmp::Ordering;
use tracing::debug;

/// Executor settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Page size default and hierarchy depth bound
    pub limits: Limits,
    /// Compare strings ignoring case (default: true)
    pub case_insensitive_strings: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            case_insensitive_strings: true,
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Records on this page
    pub records: Vec<Record>,
    /// Whether a later page exists
    pub more_records: bool,
    /// Continuation cookie for the next page
    pub paging_cookie: Option<String>,
    /// Matching rows before paging, when requested
    pub total_record_count: Option<usize>,
}

/// Row flowing through the pipeline: the target record with joined columns
/// merged in, plus the outer-join aliases that matched nothing.
#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub record: Record,
    pub unmatched: SmallVec<[String; 2]>,
}

impl Row {
    fn new(record: Record) -> Self {
        Self {
            record,
            unmatched: SmallVec::new(),
        }
    }
}

/// Executes query plans against a store
pub struct QueryExecutor<'a> {
    store: &'a RecordStore,
    relationships: &'a RelationshipRegistry,
    schema: &'a dyn SchemaLookup,
    options: ExecutorOptions,
    patterns: RefCell<FxHashMap<(String, bool), Regex>>,
}

impl<'a> QueryExecutor<'a> {
    /// Create an executor over borrowed state
    pub fn new(
        store: &'a RecordStore,
        relationships: &'a RelationshipRegistry,
        schema: &'a dyn SchemaLookup,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            store,
            relationships,
            schema,
            options,
            patterns: RefCell::new(FxHashMap::default()),
        }
    }

    /// Run a plan and return the requested page.
    ///
    /// # Errors
    ///
    /// `UnknownRelationship` for a join that names or implies no registered
    /// relationship; `InvalidQuery` for hierarchy operators on types without
    /// a hierarchy attribute or malformed like patterns;
    /// `UnsupportedAggregateType` for arithmetic over non-numeric values.
    pub fn execute(&self, plan: &QueryPlan) -> Result<QueryResult> {
        let snapshot = self.store.snapshot(&plan.entity);
        let scanned = snapshot.len();
        let mut rows: Vec<Row> = snapshot.into_iter().map(Row::new).collect();

        for join in &plan.joins {
            rows = self.join(rows, join, &plan.entity, None)?;
        }

        let all_joins = plan.all_joins();
        let joins: JoinsByAlias<'_> = all_joins.iter().map(|j| (j.alias.as_str(), *j)).collect();
        let aliases: Vec<(String, String)> = all_joins
            .iter()
            .map(|j| (j.alias.clone(), j.entity.clone()))
            .collect();
        if let Some(filter) = &plan.filter {
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows {
                let scope = filter::Scope::new(&row.record, &plan.entity, &row.unmatched, &aliases);
                if self.matches(filter, &scope)? {
                    kept.push(row);
                }
            }
            rows = kept;
        }

        let mut records: Vec<Record> = rows.into_iter().map(|row| row.record).collect();
        if plan.distinct {
            records = distinct(records, &joins);
        }
        if let Some(spec) = &plan.aggregate {
            records = aggregate::aggregate(&records, spec, &plan.entity)?;
        }

        self.sort(&mut records, &plan.orders, &plan.entity);
        if let Some(top) = plan.top {
            records.truncate(top);
        }

        let request = plan.page.clone().unwrap_or_default();
        let total_record_count = request.return_total_count.then_some(records.len());
        let size = self.options.limits.page_size(request.size).max(1);
        let page = page::slice(records, request.number, size);
        let paging_cookie = if plan.aggregate.is_some() {
            None
        } else {
            page::cookie(
                &page.records,
                request.number,
                &self.schema.primary_id_attribute(&plan.entity),
            )
        };

        let mut records = page.records;
        for record in &mut records {
            if plan.aggregate.is_none() {
                project(record, plan, &joins);
            }
            self.resolve_names(record);
            self.resolve_labels(record);
        }

        debug!(
            target: "recordfake::engine",
            entity = %plan.entity,
            scanned,
            returned = records.len(),
            more = page.more_records,
            "executed query"
        );
        Ok(QueryResult {
            records,
            more_records: page.more_records,
            paging_cookie,
            total_record_count,
        })
    }

    /// Resolve reference names and labels on a record read outside a query
    pub fn decorate(&self, record: &mut Record) {
        self.resolve_names(record);
        self.resolve_labels(record);
    }

    fn sort(&self, records: &mut [Record], orders: &[SortKey], root: &str) {
        if orders.is_empty() {
            return;
        }
        let ci = self.options.case_insensitive_strings;
        records.sort_by(|a, b| {
            for key in orders {
                let ordering = compare::sort_order(
                    sort_value(a, key, root),
                    sort_value(b, key, root),
                    ci,
                );
                let ordering = if key.descending { ordering.reverse() } else { ordering };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}

pub(crate) static NULL: Value = Value::Null;

/// Value of `attribute` under `alias` on a merged row; absent reads as null
pub(crate) fn lookup<'r>(record: &'r Record, root: &str, alias: Option<&str>, attribute: &str) -> &'r Value {
    let found = match alias {
        Some(alias) if alias != root => record.get(&format!("{}.{}", alias, attribute)),
        _ => record.get(attribute),
    };
    found.unwrap_or(&NULL)
}

fn sort_value<'r>(record: &'r Record, key: &SortKey, root: &str) -> &'r Value {
    lookup(record, root, key.entity_alias.as_deref(), &key.attribute)
}

/// Joins of a plan keyed by alias, nested ones included
type JoinsByAlias<'p> = FxHashMap<&'p str, &'p Join>;

/// Split a merged column name into join and attribute
fn joined_column<'p, 'n>(joins: &JoinsByAlias<'p>, name: &'n str) -> Option<(&'p Join, &'n str)> {
    let (alias, attribute) = name.split_once('.')?;
    joins.get(alias).map(|join| (*join, attribute))
}

/// Drop structurally identical rows, keeping the first of each.
///
/// Identity covers every target attribute and the joined attributes that
/// survive projection, not just the projected target columns.
fn distinct(records: Vec<Record>, joins: &JoinsByAlias<'_>) -> Vec<Record> {
    let before = records.len();
    let mut seen = FxHashSet::default();
    let kept: Vec<Record> = records
        .into_iter()
        .filter(|record| {
            let key = row_key(record, |name| match joined_column(joins, name) {
                Some((join, attribute)) => join.columns.includes(attribute),
                None => true,
            });
            seen.insert(key)
        })
        .collect();
    debug!(target: "recordfake::engine", before, after = kept.len(), "distinct");
    kept
}

/// Keep the requested target columns and the requested joined columns
fn project(record: &mut Record, plan: &QueryPlan, joins: &JoinsByAlias<'_>) {
    let keep = |name: &str| match joined_column(joins, name) {
        Some((join, attribute)) => join.columns.includes(attribute),
        None => plan.columns.includes(name),
    };
    record.attributes.retain(|name, _| keep(name));
    record.formatted_values.retain(|name, _| keep(name));
}
