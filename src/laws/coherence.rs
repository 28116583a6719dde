// Copyright 2025 Cowboy AI, LLC.

//! Type and Cardinality Coherence
//!
//! The static half of these laws is carried by the generics of
//! [`crate::Combinator::bind`]: a read producing `D` only binds to a write
//! accepting `D`. What remains is checked here, once against the declared
//! descriptors when a combination is built, and once against the actual
//! payload right before the write for dynamically typed data.

use serde_json::Value;

use crate::errors::{CombinatorError, CombinatorResult, ErrorCode, StructuredError};
use crate::operations::OperationDescriptor;
use crate::payload::Cardinality;
use crate::shape::Shape;

use super::LawKind;

/// Construction-time cardinality check
///
/// `produced` is what actually reaches the write: the read's declared
/// cardinality, or the transform's output cardinality when one is present.
pub fn check_cardinality(
    producer: &str,
    produced: Cardinality,
    write: &OperationDescriptor,
) -> CombinatorResult<()> {
    if produced.is_compatible_with(write.cardinality) {
        return Ok(());
    }

    Err(CombinatorError::CardinalityMismatch {
        read: producer.to_string(),
        write: write.name.clone(),
        read_cardinality: produced,
        write_cardinality: write.cardinality,
    })
}

/// Construction-time shape check between two declared shapes
///
/// Skipped when either side declares no shape.
pub fn check_types(
    producer: &str,
    produced: Option<&Shape>,
    write: &OperationDescriptor,
) -> CombinatorResult<()> {
    let (Some(produced), Some(accepted)) = (produced, write.shape.as_ref()) else {
        return Ok(());
    };

    accepted
        .accepts(produced)
        .map_err(|issues| CombinatorError::TypeIncoherent {
            read: producer.to_string(),
            write: write.name.clone(),
            reason: issues.join("; "),
        })
}

/// Runtime shape check of a dynamic payload against the write's shape
pub fn check_payload_shape(write: &OperationDescriptor, payload: &Value) -> Option<StructuredError> {
    let shape = write.shape.as_ref()?;
    let issues = shape.check(payload).err()?;
    Some(shape_error(shape, write, issues))
}

/// Runtime shape check of every dynamic element of a sequence payload
///
/// Issues are prefixed with the element's position in the sequence.
pub fn check_payload_items(write: &OperationDescriptor, items: &[&Value]) -> Option<StructuredError> {
    let shape = write.shape.as_ref()?;
    let issues: Vec<String> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| shape.check(item).err().map(|issues| (index, issues)))
        .flat_map(|(index, issues)| issues.into_iter().map(move |issue| format!("[{index}].{issue}")))
        .collect();

    if issues.is_empty() {
        None
    } else {
        Some(shape_error(shape, write, issues))
    }
}

fn shape_error(shape: &Shape, write: &OperationDescriptor, issues: Vec<String>) -> StructuredError {
    StructuredError::validation(
        ErrorCode::TypeIncoherent,
        format!(
            "Payload does not match the `{}` shape accepted by `{}`: {}",
            shape.name,
            write.name,
            issues.join("; ")
        ),
    )
    .with_detail("law", LawKind::TypeCoherence.name())
    .with_detail("issues", issues)
}

/// Runtime cardinality check of the payload about to be written
pub fn check_observed_cardinality(
    write: &OperationDescriptor,
    observed: Cardinality,
) -> Option<StructuredError> {
    if observed.is_compatible_with(write.cardinality) {
        return None;
    }

    Some(
        StructuredError::validation(
            ErrorCode::CardinalityMismatch,
            format!(
                "`{}` accepts {} payloads but received a {} payload",
                write.name, write.cardinality, observed
            ),
        )
        .with_detail("law", LawKind::CardinalityCoherence.name()),
    )
}
