//! Filter and sort expressions attached to search requests.
//!
//! Both languages come in a single and a compound form. Every constructor
//! validates its input, and deserialization goes through the same checks, so an
//! expression that exists can always be sent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ShilpError};

/// Comparison operator of a filter condition. Encoded on the wire as an integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FilterOp {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    NotIn,
}

impl FilterOp {
    pub const ALL: [FilterOp; 8] = [
        FilterOp::Equals,
        FilterOp::NotEquals,
        FilterOp::GreaterThan,
        FilterOp::GreaterThanOrEqual,
        FilterOp::LessThan,
        FilterOp::LessThanOrEqual,
        FilterOp::In,
        FilterOp::NotIn,
    ];

    pub fn code(self) -> u8 {
        match self {
            FilterOp::Equals => 0,
            FilterOp::NotEquals => 1,
            FilterOp::GreaterThan => 2,
            FilterOp::GreaterThanOrEqual => 3,
            FilterOp::LessThan => 4,
            FilterOp::LessThanOrEqual => 5,
            FilterOp::In => 6,
            FilterOp::NotIn => 7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Equals => "=",
            FilterOp::NotEquals => "!=",
            FilterOp::GreaterThan => ">",
            FilterOp::GreaterThanOrEqual => ">=",
            FilterOp::LessThan => "<",
            FilterOp::LessThanOrEqual => "<=",
            FilterOp::In => "in",
            FilterOp::NotIn => "not in",
        }
    }

    /// `In` and `NotIn` take a sequence of values; every other operator a scalar.
    pub fn takes_sequence(self) -> bool {
        matches!(self, FilterOp::In | FilterOp::NotIn)
    }
}

impl From<FilterOp> for u8 {
    fn from(op: FilterOp) -> Self {
        op.code()
    }
}

impl TryFrom<u8> for FilterOp {
    type Error = ShilpError;

    fn try_from(code: u8) -> Result<Self> {
        FilterOp::ALL
            .into_iter()
            .find(|op| op.code() == code)
            .ok_or_else(|| ShilpError::Validation(format!("unknown filter op code: {code}")))
    }
}

/// A single `attribute <op> value` condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub struct FilterCondition {
    attribute: String,
    op: FilterOp,
    value: Value,
}

impl FilterCondition {
    /// Build a condition, rejecting value shapes the operator cannot take.
    pub fn new(attribute: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Result<Self> {
        let attribute = attribute.into();
        let value = value.into();

        if attribute.is_empty() {
            return Err(ShilpError::Validation(
                "filter attribute name must not be empty".into(),
            ));
        }

        if op.takes_sequence() {
            match &value {
                Value::Array(items) if items.is_empty() => {
                    return Err(ShilpError::Validation(format!(
                        "operator `{}` requires at least one value",
                        op.as_str()
                    )));
                }
                Value::Array(items) => {
                    if let Some(bad) = items.iter().find(|v| !is_scalar(v)) {
                        return Err(ShilpError::Validation(format!(
                            "operator `{}` requires scalar elements, got {bad}",
                            op.as_str()
                        )));
                    }
                }
                other => {
                    return Err(ShilpError::Validation(format!(
                        "operator `{}` requires a sequence value, got {other}",
                        op.as_str()
                    )));
                }
            }
        } else if !is_scalar(&value) {
            return Err(ShilpError::Validation(format!(
                "operator `{}` requires a scalar value, got {value}",
                op.as_str()
            )));
        }

        Ok(Self {
            attribute,
            op,
            value,
        })
    }

    pub fn eq(attribute: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::new(attribute, FilterOp::Equals, value)
    }

    pub fn ne(attribute: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::new(attribute, FilterOp::NotEquals, value)
    }

    pub fn gt(attribute: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::new(attribute, FilterOp::GreaterThan, value)
    }

    pub fn gte(attribute: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::new(attribute, FilterOp::GreaterThanOrEqual, value)
    }

    pub fn lt(attribute: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::new(attribute, FilterOp::LessThan, value)
    }

    pub fn lte(attribute: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::new(attribute, FilterOp::LessThanOrEqual, value)
    }

    pub fn is_in<I, V>(attribute: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new(attribute, FilterOp::In, Value::Array(values))
    }

    pub fn not_in<I, V>(attribute: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new(attribute, FilterOp::NotIn, Value::Array(values))
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn op(&self) -> FilterOp {
        self.op
    }

    /// The scalar operand, or the array of operands for `In`/`NotIn`.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

#[derive(Clone, Serialize, Deserialize)]
struct RawCondition {
    attribute: String,
    op: FilterOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Value>>,
}

impl TryFrom<RawCondition> for FilterCondition {
    type Error = ShilpError;

    fn try_from(raw: RawCondition) -> Result<Self> {
        let value = if raw.op.takes_sequence() {
            raw.values.map(Value::Array).or(raw.value)
        } else {
            raw.value
        };
        let value = value.ok_or_else(|| {
            ShilpError::Validation(format!(
                "filter on `{}` is missing its value",
                raw.attribute
            ))
        })?;
        FilterCondition::new(raw.attribute, raw.op, value)
    }
}

impl From<FilterCondition> for RawCondition {
    fn from(cond: FilterCondition) -> Self {
        let (value, values) = match (cond.op.takes_sequence(), cond.value) {
            (true, Value::Array(items)) => (None, Some(items)),
            (_, other) => (Some(other), None),
        };
        RawCondition {
            attribute: cond.attribute,
            op: cond.op,
            value,
            values,
        }
    }
}

/// Filter expression: one condition, or a conjunction of conditions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFilter", into = "RawFilter")]
pub enum Filter {
    Condition(FilterCondition),
    And(Vec<FilterCondition>),
}

impl Filter {
    pub fn condition(attribute: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Result<Self> {
        FilterCondition::new(attribute, op, value).map(Filter::Condition)
    }

    /// Conjunction of the given conditions; fails when there are none.
    pub fn all(conditions: impl IntoIterator<Item = FilterCondition>) -> Result<Self> {
        let conditions: Vec<FilterCondition> = conditions.into_iter().collect();
        if conditions.is_empty() {
            return Err(ShilpError::Validation(
                "compound filter requires at least one condition".into(),
            ));
        }
        Ok(Filter::And(conditions))
    }

    /// Conjunction of both expressions.
    pub fn merge(self, other: Filter) -> Filter {
        let mut conditions = self.into_conditions();
        conditions.extend(other.into_conditions());
        Filter::And(conditions)
    }

    pub fn conditions(&self) -> &[FilterCondition] {
        match self {
            Filter::Condition(c) => std::slice::from_ref(c),
            Filter::And(cs) => cs,
        }
    }

    pub fn into_conditions(self) -> Vec<FilterCondition> {
        match self {
            Filter::Condition(c) => vec![c],
            Filter::And(cs) => cs,
        }
    }

    /// The compound form, as accepted by the search endpoint.
    pub fn into_conjunction(self) -> Filter {
        Filter::And(self.into_conditions())
    }
}

impl From<FilterCondition> for Filter {
    fn from(cond: FilterCondition) -> Self {
        Filter::Condition(cond)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawFilter {
    And { and: Vec<FilterCondition> },
    Condition(FilterCondition),
}

impl TryFrom<RawFilter> for Filter {
    type Error = ShilpError;

    fn try_from(raw: RawFilter) -> Result<Self> {
        match raw {
            RawFilter::And { and } => Filter::all(and),
            RawFilter::Condition(c) => Ok(Filter::Condition(c)),
        }
    }
}

impl From<Filter> for RawFilter {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Condition(c) => RawFilter::Condition(c),
            Filter::And(and) => RawFilter::And { and },
        }
    }
}

/// Sort direction. Encoded on the wire as an integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl From<SortOrder> for u8 {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Ascending => 0,
            SortOrder::Descending => 1,
        }
    }
}

impl TryFrom<u8> for SortOrder {
    type Error = ShilpError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(SortOrder::Ascending),
            1 => Ok(SortOrder::Descending),
            other => Err(ShilpError::Validation(format!(
                "unknown sort order code: {other}"
            ))),
        }
    }
}

/// One `(attribute, order)` sort criterion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSortKey", into = "RawSortKey")]
pub struct SortKey {
    attribute: String,
    order: SortOrder,
}

impl SortKey {
    pub fn new(attribute: impl Into<String>, order: SortOrder) -> Result<Self> {
        let attribute = attribute.into();
        if attribute.is_empty() {
            return Err(ShilpError::Validation(
                "sort attribute must not be empty".into(),
            ));
        }
        Ok(Self { attribute, order })
    }

    pub fn asc(attribute: impl Into<String>) -> Result<Self> {
        Self::new(attribute, SortOrder::Ascending)
    }

    pub fn desc(attribute: impl Into<String>) -> Result<Self> {
        Self::new(attribute, SortOrder::Descending)
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct RawSortKey {
    attribute: String,
    order: SortOrder,
}

impl TryFrom<RawSortKey> for SortKey {
    type Error = ShilpError;

    fn try_from(raw: RawSortKey) -> Result<Self> {
        SortKey::new(raw.attribute, raw.order)
    }
}

impl From<SortKey> for RawSortKey {
    fn from(key: SortKey) -> Self {
        RawSortKey {
            attribute: key.attribute,
            order: key.order,
        }
    }
}

/// Sort expression: one key, or an ordered list of keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSort", into = "RawSort")]
pub enum Sort {
    Single(SortKey),
    Compound(Vec<SortKey>),
}

impl Sort {
    pub fn by(attribute: impl Into<String>, order: SortOrder) -> Result<Self> {
        SortKey::new(attribute, order).map(Sort::Single)
    }

    /// Ordered list of keys; fails when there are none.
    pub fn compound(keys: impl IntoIterator<Item = SortKey>) -> Result<Self> {
        let keys: Vec<SortKey> = keys.into_iter().collect();
        if keys.is_empty() {
            return Err(ShilpError::Validation(
                "compound sort requires at least one key".into(),
            ));
        }
        Ok(Sort::Compound(keys))
    }

    /// Append a tie-breaking key.
    pub fn then(self, key: SortKey) -> Sort {
        let mut keys = self.into_keys();
        keys.push(key);
        Sort::Compound(keys)
    }

    pub fn keys(&self) -> &[SortKey] {
        match self {
            Sort::Single(k) => std::slice::from_ref(k),
            Sort::Compound(ks) => ks,
        }
    }

    pub fn into_keys(self) -> Vec<SortKey> {
        match self {
            Sort::Single(k) => vec![k],
            Sort::Compound(ks) => ks,
        }
    }

    /// The compound form, as accepted by the search endpoint.
    pub fn into_compound(self) -> Sort {
        Sort::Compound(self.into_keys())
    }
}

impl From<SortKey> for Sort {
    fn from(key: SortKey) -> Self {
        Sort::Single(key)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSort {
    Compound { sorts: Vec<SortKey> },
    Single(SortKey),
}

impl TryFrom<RawSort> for Sort {
    type Error = ShilpError;

    fn try_from(raw: RawSort) -> Result<Self> {
        match raw {
            RawSort::Compound { sorts } => Sort::compound(sorts),
            RawSort::Single(k) => Ok(Sort::Single(k)),
        }
    }
}

impl From<Sort> for RawSort {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Single(k) => RawSort::Single(k),
            Sort::Compound(sorts) => RawSort::Compound { sorts },
        }
    }
}
