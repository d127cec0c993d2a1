//! Metadata filtering engine for queries.
//!
//! Evaluates [`Predicate`] trees against document metadata. Evaluation is
//! total: missing fields, missing operands, and type mismatches all yield
//! `false` rather than an error.

use crate::document::{Metadata, MetadataValue};
use crate::filter_types::{FilterCondition, FilterOperator, Predicate};
use std::cmp::Ordering;

/// Check if a document's metadata satisfies the predicate.
/// `And` short-circuits on the first false child, `Or` on the first true one.
pub fn matches_filter(metadata: &Metadata, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Condition(cond) => evaluate_condition(metadata, cond),
        Predicate::And(children) => children.iter().all(|c| matches_filter(metadata, c)),
        Predicate::Or(children) => children.iter().any(|c| matches_filter(metadata, c)),
    }
}

/// Like [`matches_filter`], treating an absent predicate as "always true".
pub fn matches_optional(metadata: &Metadata, predicate: Option<&Predicate>) -> bool {
    predicate.map_or(true, |p| matches_filter(metadata, p))
}

fn evaluate_condition(metadata: &Metadata, cond: &FilterCondition) -> bool {
    let Some(field_value) = metadata.get(&cond.field) else {
        return false;
    };

    if cond.op.is_set_operator() {
        let Some(ref set) = cond.values else {
            return false;
        };
        let member = set.iter().any(|v| field_value.loose_eq(v));
        return match cond.op {
            FilterOperator::In => member,
            _ => !member,
        };
    }

    let Some(ref operand) = cond.value else {
        return false;
    };
    match cond.op {
        FilterOperator::Eq => field_value.loose_eq(operand),
        FilterOperator::Ne => !field_value.loose_eq(operand),
        FilterOperator::Gt => numeric_cmp(field_value, operand) == Some(Ordering::Greater),
        FilterOperator::Lt => numeric_cmp(field_value, operand) == Some(Ordering::Less),
        FilterOperator::Gte => {
            numeric_cmp(field_value, operand).is_some_and(|o| o != Ordering::Less)
        }
        FilterOperator::Lte => {
            numeric_cmp(field_value, operand).is_some_and(|o| o != Ordering::Greater)
        }
        FilterOperator::In | FilterOperator::Nin => false,
    }
}

/// Orders two values numerically. `None` if either side is not a number (or is NaN).
fn numeric_cmp(meta: &MetadataValue, operand: &MetadataValue) -> Option<Ordering> {
    match (meta, operand) {
        (MetadataValue::Integer(a), MetadataValue::Integer(b)) => Some(a.cmp(b)),
        _ => meta.as_f64()?.partial_cmp(&operand.as_f64()?),
    }
}
