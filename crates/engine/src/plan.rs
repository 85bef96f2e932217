//! Query plan
//!
//! The format-independent representation of a query. Both translators
//! produce a [`QueryPlan`]; the executor consumes one. A plan is built once
//! per execution and never mutated after translation.

use recordfake_core::{Error, Result, Value};
use serde::{Deserialize, Serialize};

/// Column projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Columns {
    /// Every attribute
    All,
    /// Only the listed attributes
    Some(Vec<String>),
}

impl Columns {
    /// Build a column list from names
    pub fn of<S: AsRef<str>>(names: &[S]) -> Self {
        Columns::Some(names.iter().map(|n| n.as_ref().to_string()).collect())
    }

    /// Whether `attribute` survives projection
    pub fn includes(&self, attribute: &str) -> bool {
        match self {
            Columns::All => true,
            Columns::Some(names) => names.iter().any(|n| n == attribute),
        }
    }
}

impl Default for Columns {
    fn default() -> Self {
        Columns::All
    }
}

/// Logical combinator of a filter group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterKind {
    /// All members must hold
    #[default]
    And,
    /// At least one member must hold
    Or,
}

/// AND/OR group of conditions and nested groups
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filter {
    /// Combinator
    pub kind: FilterKind,
    /// Leaf conditions
    pub conditions: Vec<Condition>,
    /// Nested groups
    pub filters: Vec<Filter>,
}

impl Filter {
    /// Empty group of the given kind
    pub fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            conditions: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// True when the group has no members at any depth
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.filters.iter().all(Filter::is_empty)
    }

    /// Visit every condition at any depth
    pub fn conditions_mut(&mut self) -> Vec<&mut Condition> {
        let mut out: Vec<&mut Condition> = self.conditions.iter_mut().collect();
        for nested in &mut self.filters {
            out.extend(nested.conditions_mut());
        }
        out
    }
}

/// Condition operators shared by both query formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ConditionOperator {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    Like,
    NotLike,
    BeginsWith,
    DoesNotBeginWith,
    EndsWith,
    DoesNotEndWith,
    Contains,
    DoesNotContain,
    Null,
    NotNull,
    In,
    NotIn,
    Between,
    NotBetween,
    Above,
    AboveOrEqual,
    Under,
    UnderOrEqual,
    NotUnder,
    On,
    OnOrBefore,
    OnOrAfter,
    Today,
    Yesterday,
    Tomorrow,
    LastXDays,
    NextXDays,
    ThisYear,
    ContainValues,
    DoesNotContainValues,
}

/// Number of operand values an operator takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// No operand
    Zero,
    /// Exactly one
    One,
    /// Exactly two
    Two,
    /// One or more
    AtLeastOne,
}

impl ConditionOperator {
    /// Operand count this operator requires
    pub fn arity(self) -> Arity {
        use ConditionOperator::*;
        match self {
            Null | NotNull | Today | Yesterday | Tomorrow | ThisYear => Arity::Zero,
            Between | NotBetween => Arity::Two,
            In | NotIn | ContainValues | DoesNotContainValues => Arity::AtLeastOne,
            _ => Arity::One,
        }
    }

    /// Operators that may compare against another column
    pub fn supports_column_operand(self) -> bool {
        use ConditionOperator::*;
        matches!(
            self,
            Equal | NotEqual | GreaterThan | LessThan | GreaterEqual | LessEqual
        )
    }

    /// Null checks keep their meaning under an outer join that found nothing
    pub fn is_null_check(self) -> bool {
        matches!(self, ConditionOperator::Null | ConditionOperator::NotNull)
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Operand {
    /// Unary operator
    #[default]
    None,
    /// Literal values
    Values(Vec<Value>),
    /// Another attribute of the same row
    Column(String),
}

/// Leaf condition: attribute, operator, operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Join alias owning the attribute; `None` for the target type
    pub entity_alias: Option<String>,
    /// Attribute name
    pub attribute: String,
    /// Operator
    pub operator: ConditionOperator,
    /// Operand
    pub operand: Operand,
    /// Holds automatically when the owning outer join matched nothing
    pub outer_only: bool,
}

impl Condition {
    /// Condition against literal values
    pub fn new(attribute: impl Into<String>, operator: ConditionOperator, values: Vec<Value>) -> Self {
        let operand = if values.is_empty() {
            Operand::None
        } else {
            Operand::Values(values)
        };
        Self {
            entity_alias: None,
            attribute: attribute.into(),
            operator,
            operand,
            outer_only: false,
        }
    }

    /// Column-to-column condition
    pub fn column(
        attribute: impl Into<String>,
        operator: ConditionOperator,
        other: impl Into<String>,
    ) -> Self {
        Self {
            entity_alias: None,
            attribute: attribute.into(),
            operator,
            operand: Operand::Column(other.into()),
            outer_only: false,
        }
    }

    /// Attach a join alias
    pub fn on_alias(mut self, alias: impl Into<String>) -> Self {
        self.entity_alias = Some(alias.into());
        self
    }

    /// Literal operand values (empty for unary and column operands)
    pub fn values(&self) -> &[Value] {
        match &self.operand {
            Operand::Values(values) => values,
            _ => &[],
        }
    }

    /// Check operand shape against the operator.
    ///
    /// # Errors
    ///
    /// `InvalidQuery` on wrong arity or an unsupported column comparison.
    pub fn validate(&self) -> Result<()> {
        if let Operand::Column(other) = &self.operand {
            if !self.operator.supports_column_operand() {
                return Err(Error::invalid_query(format!(
                    "operator {:?} cannot compare {} against column {}",
                    self.operator, self.attribute, other
                )));
            }
            return Ok(());
        }
        let count = self.values().len();
        let ok = match self.operator.arity() {
            Arity::Zero => count == 0,
            Arity::One => count == 1,
            Arity::Two => count == 2,
            Arity::AtLeastOne => count >= 1,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::invalid_query(format!(
                "operator {:?} on {} takes {:?} values, got {}",
                self.operator,
                self.attribute,
                self.operator.arity(),
                count
            )))
        }
    }
}

/// Join flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JoinKind {
    /// Outer rows without a match are dropped
    #[default]
    Inner,
    /// Outer rows without a match are kept with inner attributes absent
    LeftOuter,
}

/// Join from the parent (target type or enclosing join) to another type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// Joined record type
    pub entity: String,
    /// Alias prefixing joined attributes (`alias.attribute`)
    pub alias: String,
    /// Attribute on the parent side; inferred from a relationship when absent
    pub from_attribute: Option<String>,
    /// Attribute on the joined side; inferred from a relationship when absent
    pub to_attribute: Option<String>,
    /// Flavor
    pub kind: JoinKind,
    /// Joined columns kept by projection
    pub columns: Columns,
    /// Filter applied to joined records before matching
    pub filter: Option<Filter>,
    /// Joins hanging off this one
    pub joins: Vec<Join>,
    /// Relationship the join goes through, when named explicitly
    pub relationship: Option<String>,
}

/// Sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Join alias owning the attribute; `None` for the target type
    pub entity_alias: Option<String>,
    /// Attribute, or output alias in aggregate queries
    pub attribute: String,
    /// Descending order
    pub descending: bool,
}

/// Paging request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number
    pub number: usize,
    /// Page size; the context default when absent
    pub size: Option<usize>,
    /// Continuation cookie returned with the previous page
    pub cookie: Option<String>,
    /// Report the total number of matching rows
    pub return_total_count: bool,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            number: 1,
            size: None,
            cookie: None,
            return_total_count: false,
        }
    }
}

/// Date bucket applied to a date-time group-by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DateGrouping {
    /// Group by the full value
    #[default]
    Raw,
    /// Day of month
    Day,
    /// ISO week number
    Week,
    /// Month number
    Month,
    /// Quarter number
    Quarter,
    /// Calendar year
    Year,
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    /// Every row, nulls included
    Count,
    /// Non-null values of the column
    CountColumn,
    /// Sum of non-null values
    Sum,
    /// Mean of non-null values
    Avg,
    /// Smallest non-null value
    Min,
    /// Largest non-null value
    Max,
}

impl AggregateFunction {
    /// Lower-case name
    pub fn name(self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::CountColumn => "countcolumn",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

/// Group-by column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupBy {
    /// Record type the attribute belongs to
    pub entity: String,
    /// Join alias owning the attribute; `None` for the target type
    pub entity_alias: Option<String>,
    /// Source attribute
    pub attribute: String,
    /// Output alias
    pub alias: String,
    /// Date bucket
    pub date_grouping: DateGrouping,
}

/// Aggregate column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDirective {
    /// Record type the attribute belongs to
    pub entity: String,
    /// Join alias owning the attribute; `None` for the target type
    pub entity_alias: Option<String>,
    /// Source attribute
    pub attribute: String,
    /// Output alias
    pub alias: String,
    /// Function
    pub function: AggregateFunction,
    /// De-duplicate values first (count-column)
    pub distinct: bool,
}

/// Aggregate directives of an aggregate query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateSpec {
    /// Grouping key columns, in declaration order
    pub group_by: Vec<GroupBy>,
    /// Aggregate columns, in declaration order
    pub aggregates: Vec<AggregateDirective>,
}

/// Format-independent query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Target record type
    pub entity: String,
    /// Projection of target attributes
    pub columns: Columns,
    /// Top-level filter
    pub filter: Option<Filter>,
    /// Joins off the target type
    pub joins: Vec<Join>,
    /// Sort keys, primary first
    pub orders: Vec<SortKey>,
    /// Row cap applied before paging
    pub top: Option<usize>,
    /// Paging request
    pub page: Option<PageRequest>,
    /// De-duplicate structurally identical rows
    pub distinct: bool,
    /// Present for aggregate queries
    pub aggregate: Option<AggregateSpec>,
}

impl QueryPlan {
    /// Plan selecting every record of a type
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            columns: Columns::All,
            filter: None,
            joins: Vec::new(),
            orders: Vec::new(),
            top: None,
            page: None,
            distinct: false,
            aggregate: None,
        }
    }

    /// Every join at any depth, parents before children
    pub fn all_joins(&self) -> Vec<&Join> {
        fn walk<'a>(joins: &'a [Join], out: &mut Vec<&'a Join>) {
            for join in joins {
                out.push(join);
                walk(&join.joins, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.joins, &mut out);
        out
    }

    /// Find a join by alias
    pub fn join(&self, alias: &str) -> Option<&Join> {
        self.all_joins().into_iter().find(|j| j.alias == alias)
    }
}
