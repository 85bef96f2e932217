//! Structured query form
//!
//! Query objects as callers build them in code: a [`QueryExpression`] with
//! nested filter expressions and link entities, or a [`QueryByAttribute`]
//! listing attribute/value equality pairs. [`Query`] also carries the XML
//! form so callers can submit either through one entry point.

use crate::plan::ConditionOperator;
use recordfake_core::Value;
use serde::{Deserialize, Serialize};

/// Column selection of the structured form
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnSet {
    /// Every attribute
    #[default]
    AllColumns,
    /// Only the listed attributes
    Columns(Vec<String>),
}

impl ColumnSet {
    /// Select the listed attributes
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        ColumnSet::Columns(names.iter().map(|n| n.as_ref().to_string()).collect())
    }
}

/// AND / OR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogicalOperator {
    /// All members must hold
    #[default]
    And,
    /// At least one member must hold
    Or,
}

/// Leaf condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionExpression {
    /// Link-entity alias owning the attribute
    pub entity_name: Option<String>,
    /// Attribute name
    pub attribute_name: String,
    /// Operator
    pub operator: ConditionOperator,
    /// Operand values; a single attribute name when `compare_columns` is set
    pub values: Vec<Value>,
    /// Compare against another attribute instead of literals
    pub compare_columns: bool,
}

impl ConditionExpression {
    /// Condition against literal values
    pub fn new(
        attribute_name: impl Into<String>,
        operator: ConditionOperator,
        values: Vec<Value>,
    ) -> Self {
        Self {
            entity_name: None,
            attribute_name: attribute_name.into(),
            operator,
            values,
            compare_columns: false,
        }
    }

    /// Condition comparing two attributes of the same row
    pub fn columns(
        attribute_name: impl Into<String>,
        operator: ConditionOperator,
        other_attribute: impl Into<String>,
    ) -> Self {
        Self {
            entity_name: None,
            attribute_name: attribute_name.into(),
            operator,
            values: vec![Value::String(other_attribute.into())],
            compare_columns: true,
        }
    }

    /// Scope the condition to a link-entity alias
    pub fn with_entity(mut self, entity_name: impl Into<String>) -> Self {
        self.entity_name = Some(entity_name.into());
        self
    }
}

/// Group of conditions and nested filters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterExpression {
    /// Combinator
    pub filter_operator: LogicalOperator,
    /// Leaf conditions
    pub conditions: Vec<ConditionExpression>,
    /// Nested filters
    pub filters: Vec<FilterExpression>,
}

impl FilterExpression {
    /// Empty filter
    pub fn new(filter_operator: LogicalOperator) -> Self {
        Self {
            filter_operator,
            conditions: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Append a literal condition
    pub fn add_condition(
        &mut self,
        attribute_name: impl Into<String>,
        operator: ConditionOperator,
        values: Vec<Value>,
    ) -> &mut Self {
        self.conditions
            .push(ConditionExpression::new(attribute_name, operator, values));
        self
    }

    /// Append a prepared condition
    pub fn push(&mut self, condition: ConditionExpression) -> &mut Self {
        self.conditions.push(condition);
        self
    }

    /// Append a nested filter
    pub fn add_filter(&mut self, filter: FilterExpression) -> &mut Self {
        self.filters.push(filter);
        self
    }
}

/// Join flavor of a link entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JoinOperator {
    /// Inner join
    #[default]
    Inner,
    /// Left outer join
    LeftOuter,
    /// Natural join (not modelled)
    Natural,
    /// Semi join (not modelled)
    Exists,
}

/// Join to another record type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkEntity {
    /// Type on the "from" side; the parent when unset
    pub link_from_entity_name: Option<String>,
    /// Attribute on the "from" side
    pub link_from_attribute_name: Option<String>,
    /// Type on the "to" side
    pub link_to_entity_name: String,
    /// Attribute on the "to" side
    pub link_to_attribute_name: Option<String>,
    /// Join flavor
    pub join_operator: JoinOperator,
    /// Alias; generated when unset
    pub entity_alias: Option<String>,
    /// Columns of the joined type to return
    pub columns: ColumnSet,
    /// Filter on the joined type
    pub link_criteria: FilterExpression,
    /// Nested joins
    pub link_entities: Vec<LinkEntity>,
    /// Relationship to infer missing attributes from
    pub relationship_name: Option<String>,
}

impl LinkEntity {
    /// Join `from_entity.from_attribute` to `to_entity.to_attribute`
    pub fn new(
        from_entity: impl Into<String>,
        to_entity: impl Into<String>,
        from_attribute: impl Into<String>,
        to_attribute: impl Into<String>,
        join_operator: JoinOperator,
    ) -> Self {
        Self {
            link_from_entity_name: Some(from_entity.into()),
            link_from_attribute_name: Some(from_attribute.into()),
            link_to_entity_name: to_entity.into(),
            link_to_attribute_name: Some(to_attribute.into()),
            join_operator,
            entity_alias: None,
            columns: ColumnSet::Columns(Vec::new()),
            link_criteria: FilterExpression::default(),
            link_entities: Vec::new(),
            relationship_name: None,
        }
    }

    /// Join through a registered relationship, attributes inferred
    pub fn through(
        relationship_name: impl Into<String>,
        to_entity: impl Into<String>,
        join_operator: JoinOperator,
    ) -> Self {
        Self {
            link_to_entity_name: to_entity.into(),
            join_operator,
            columns: ColumnSet::Columns(Vec::new()),
            relationship_name: Some(relationship_name.into()),
            ..Self::default()
        }
    }

    /// Set the alias
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.entity_alias = Some(alias.into());
        self
    }

    /// Set the returned columns
    pub fn with_columns(mut self, columns: ColumnSet) -> Self {
        self.columns = columns;
        self
    }

    /// Set the link criteria
    pub fn with_criteria(mut self, criteria: FilterExpression) -> Self {
        self.link_criteria = criteria;
        self
    }

    /// Add a nested join
    pub fn with_link(mut self, link: LinkEntity) -> Self {
        self.link_entities.push(link);
        self
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderType {
    /// Ascending
    #[default]
    Ascending,
    /// Descending
    Descending,
}

/// Sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExpression {
    /// Attribute name
    pub attribute_name: String,
    /// Direction
    pub order_type: OrderType,
    /// Link-entity alias owning the attribute
    pub entity_name: Option<String>,
}

impl OrderExpression {
    /// Sort by an attribute of the target type
    pub fn new(attribute_name: impl Into<String>, order_type: OrderType) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            order_type,
            entity_name: None,
        }
    }
}

/// Paging request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingInfo {
    /// 1-based page number
    pub page_number: usize,
    /// Page size; the context default when zero
    pub count: usize,
    /// Cookie returned with the previous page
    pub paging_cookie: Option<String>,
    /// Report the total number of matching rows
    pub return_total_record_count: bool,
}

impl Default for PagingInfo {
    fn default() -> Self {
        Self {
            page_number: 1,
            count: 0,
            paging_cookie: None,
            return_total_record_count: false,
        }
    }
}

/// Structured query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExpression {
    /// Target record type
    pub entity_name: String,
    /// Returned columns
    pub column_set: ColumnSet,
    /// Top-level filter
    pub criteria: FilterExpression,
    /// Joins
    pub link_entities: Vec<LinkEntity>,
    /// Sort keys
    pub orders: Vec<OrderExpression>,
    /// Row cap
    pub top_count: Option<usize>,
    /// Paging request
    pub page_info: Option<PagingInfo>,
    /// De-duplicate rows
    pub distinct: bool,
}

impl QueryExpression {
    /// Query every record of a type
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            column_set: ColumnSet::AllColumns,
            criteria: FilterExpression::default(),
            link_entities: Vec::new(),
            orders: Vec::new(),
            top_count: None,
            page_info: None,
            distinct: false,
        }
    }

    /// Set the returned columns
    pub fn columns(mut self, column_set: ColumnSet) -> Self {
        self.column_set = column_set;
        self
    }

    /// Append a condition to the top-level filter
    pub fn condition(
        mut self,
        attribute_name: impl Into<String>,
        operator: ConditionOperator,
        values: Vec<Value>,
    ) -> Self {
        self.criteria.add_condition(attribute_name, operator, values);
        self
    }

    /// Replace the top-level filter
    pub fn criteria(mut self, criteria: FilterExpression) -> Self {
        self.criteria = criteria;
        self
    }

    /// Append a join
    pub fn link(mut self, link: LinkEntity) -> Self {
        self.link_entities.push(link);
        self
    }

    /// Append a sort key
    pub fn order(mut self, attribute_name: impl Into<String>, order_type: OrderType) -> Self {
        self.orders.push(OrderExpression::new(attribute_name, order_type));
        self
    }

    /// Cap the number of rows
    pub fn top(mut self, count: usize) -> Self {
        self.top_count = Some(count);
        self
    }

    /// Request one page
    pub fn page(mut self, page_number: usize, count: usize) -> Self {
        let info = self.page_info.get_or_insert_with(PagingInfo::default);
        info.page_number = page_number;
        info.count = count;
        self
    }

    /// Request the total row count
    pub fn total_count(mut self) -> Self {
        self.page_info
            .get_or_insert_with(PagingInfo::default)
            .return_total_record_count = true;
        self
    }

    /// De-duplicate rows
    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }
}

/// Equality-only query over attribute/value pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryByAttribute {
    /// Target record type
    pub entity_name: String,
    /// Returned columns
    pub column_set: ColumnSet,
    /// Attribute names, paired with `values` by position
    pub attributes: Vec<String>,
    /// Values, paired with `attributes` by position
    pub values: Vec<Value>,
    /// Sort keys
    pub orders: Vec<OrderExpression>,
    /// Row cap
    pub top_count: Option<usize>,
    /// Paging request
    pub page_info: Option<PagingInfo>,
}

impl QueryByAttribute {
    /// Query a type
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            column_set: ColumnSet::AllColumns,
            attributes: Vec::new(),
            values: Vec::new(),
            orders: Vec::new(),
            top_count: None,
            page_info: None,
        }
    }

    /// Add an attribute/value pair
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.push(name.into());
        self.values.push(value.into());
        self
    }
}

/// Any query a caller can submit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    /// Structured query
    Expression(QueryExpression),
    /// Attribute/value equality query
    ByAttribute(QueryByAttribute),
    /// XML query document
    Fetch(String),
}

impl From<QueryExpression> for Query {
    fn from(query: QueryExpression) -> Self {
        Query::Expression(query)
    }
}

impl From<QueryByAttribute> for Query {
    fn from(query: QueryByAttribute) -> Self {
        Query::ByAttribute(query)
    }
}
