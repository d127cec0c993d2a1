//! Metadata filter types for queries.
//!
//! A [`Predicate`] is a tree of leaf [`FilterCondition`]s joined by `And` / `Or`
//! combinators. It is used by `get` for exact retrieval and by `query` to narrow
//! similarity results.

use crate::document::MetadataValue;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A boolean predicate over a document's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predicate {
    /// A single field comparison.
    Condition(FilterCondition),
    /// True iff every child is true. An empty `And` is true.
    And(Vec<Predicate>),
    /// True iff at least one child is true. An empty `Or` is false.
    Or(Vec<Predicate>),
}

/// A single filter condition on a metadata field.
///
/// Scalar operators read `value`; `in` / `nin` read `values`. A condition
/// missing the operand its operator needs never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOperator,
    #[serde(default)]
    pub value: Option<MetadataValue>,
    #[serde(default)]
    pub values: Option<Vec<MetadataValue>>,
}

/// Comparison operator for filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    Nin,
}

impl FilterOperator {
    fn from_where_key(key: &str) -> Option<Self> {
        Some(match key {
            "$eq" => FilterOperator::Eq,
            "$ne" => FilterOperator::Ne,
            "$gt" => FilterOperator::Gt,
            "$lt" => FilterOperator::Lt,
            "$gte" => FilterOperator::Gte,
            "$lte" => FilterOperator::Lte,
            "$in" => FilterOperator::In,
            "$nin" => FilterOperator::Nin,
            _ => return None,
        })
    }

    /// Returns true for operators that take a set operand.
    pub fn is_set_operator(self) -> bool {
        matches!(self, FilterOperator::In | FilterOperator::Nin)
    }
}

impl FilterCondition {
    fn scalar(field: impl Into<String>, op: FilterOperator, value: MetadataValue) -> Self {
        Self {
            field: field.into(),
            op,
            value: Some(value),
            values: None,
        }
    }
}

impl Predicate {
    /// `field == value`
    pub fn eq(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Predicate::Condition(FilterCondition::scalar(field, FilterOperator::Eq, value.into()))
    }

    /// `field != value`
    pub fn ne(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Predicate::Condition(FilterCondition::scalar(field, FilterOperator::Ne, value.into()))
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Predicate::Condition(FilterCondition::scalar(field, FilterOperator::Gt, value.into()))
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Predicate::Condition(FilterCondition::scalar(field, FilterOperator::Lt, value.into()))
    }

    /// `field >= value`
    pub fn gte(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Predicate::Condition(FilterCondition::scalar(field, FilterOperator::Gte, value.into()))
    }

    /// `field <= value`
    pub fn lte(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Predicate::Condition(FilterCondition::scalar(field, FilterOperator::Lte, value.into()))
    }

    /// `field` is one of `values`
    pub fn is_in<V: Into<MetadataValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Predicate::Condition(FilterCondition {
            field: field.into(),
            op: FilterOperator::In,
            value: None,
            values: Some(values.into_iter().map(Into::into).collect()),
        })
    }

    /// `field` is none of `values`
    pub fn not_in<V: Into<MetadataValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Predicate::Condition(FilterCondition {
            field: field.into(),
            op: FilterOperator::Nin,
            value: None,
            values: Some(values.into_iter().map(Into::into).collect()),
        })
    }

    pub fn and(children: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(children.into_iter().collect())
    }

    /// Parses a Chroma-style `where` clause.
    ///
    /// Accepted shapes:
    /// - `{"genre": "Fantasy"}` (implicit `$eq`)
    /// - `{"rating": {"$gte": 4.3}}`
    /// - `{"location": {"$in": ["San Francisco", "Seattle"]}}`
    /// - `{"$and": [..]}` / `{"$or": [..]}`
    ///
    /// An object with several keys is an implicit `And` of its entries.
    pub fn from_where(clause: &serde_json::Value) -> Result<Self> {
        let obj = clause
            .as_object()
            .ok_or_else(|| Error::validation("where clause must be a JSON object"))?;
        if obj.is_empty() {
            return Err(Error::validation("where clause must not be empty"));
        }

        let mut parts = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            parts.push(match key.as_str() {
                "$and" | "$or" => {
                    let children = value
                        .as_array()
                        .ok_or_else(|| Error::validation(format!("{key} expects an array")))?
                        .iter()
                        .map(Predicate::from_where)
                        .collect::<Result<Vec<_>>>()?;
                    if key == "$and" {
                        Predicate::And(children)
                    } else {
                        Predicate::Or(children)
                    }
                }
                k if k.starts_with('$') => {
                    return Err(Error::validation(format!("unknown logical operator {k}")));
                }
                field => parse_field_clause(field, value)?,
            });
        }

        Ok(if parts.len() == 1 {
            parts.pop().unwrap_or(Predicate::And(Vec::new()))
        } else {
            Predicate::And(parts)
        })
    }
}

fn scalar_operand(field: &str, value: &serde_json::Value) -> Result<MetadataValue> {
    MetadataValue::from_json(value).ok_or_else(|| {
        Error::validation(format!(
            "operand for field '{field}' must be a string, number, or boolean"
        ))
    })
}

fn parse_field_clause(field: &str, value: &serde_json::Value) -> Result<Predicate> {
    let Some(ops) = value.as_object() else {
        return Ok(Predicate::Condition(FilterCondition::scalar(
            field,
            FilterOperator::Eq,
            scalar_operand(field, value)?,
        )));
    };
    if ops.is_empty() {
        return Err(Error::validation(format!(
            "operator object for field '{field}' is empty"
        )));
    }

    let mut conditions = Vec::with_capacity(ops.len());
    for (op_key, operand) in ops {
        let op = FilterOperator::from_where_key(op_key)
            .ok_or_else(|| Error::validation(format!("unknown operator {op_key}")))?;
        let condition = if op.is_set_operator() {
            let items = operand
                .as_array()
                .ok_or_else(|| Error::validation(format!("{op_key} expects an array")))?
                .iter()
                .map(|v| scalar_operand(field, v))
                .collect::<Result<Vec<_>>>()?;
            FilterCondition {
                field: field.to_string(),
                op,
                value: None,
                values: Some(items),
            }
        } else {
            FilterCondition::scalar(field, op, scalar_operand(field, operand)?)
        };
        conditions.push(Predicate::Condition(condition));
    }

    Ok(if conditions.len() == 1 {
        conditions.pop().unwrap_or(Predicate::And(Vec::new()))
    } else {
        Predicate::And(conditions)
    })
}
