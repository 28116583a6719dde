// Copyright 2025 Cowboy AI, LLC.

//! Advisory laws
//!
//! Resource Conservation, Idempotency and Aggregation Coherence describe good
//! practice rather than correctness. They only ever produce
//! [`ViolationSeverity::Info`](super::ViolationSeverity::Info) findings, which
//! are logged and attached to successful outcomes but never fail a pipeline.

use std::collections::BTreeSet;

use crate::errors::ErrorCode;
use crate::operations::OperationDescriptor;
use crate::payload::Cardinality;

use super::{Law, LawContext, LawKind, LawViolation, ViolationLocation};

/// Single-item read with a known batch alternative
pub fn resource_conservation(read: &OperationDescriptor) -> Option<LawViolation> {
    let batch = read.batch_alternative.as_deref()?;
    if read.cardinality != Cardinality::Single {
        return None;
    }

    Some(LawViolation::advisory(
        LawKind::ResourceConservation,
        ErrorCode::Custom("BATCH_AVAILABLE".to_string()),
        format!(
            "`{}` fetches one item per call; `{batch}` serves the same data in one batch call",
            read.name
        ),
        ViolationLocation::Combination,
    ))
}

/// Single-item read invoked with arguments covering several items
pub fn batch_arguments(read: &OperationDescriptor, item_count: Option<usize>) -> Option<LawViolation> {
    let count = item_count.filter(|count| *count > 1)?;
    if read.cardinality != Cardinality::Single {
        return None;
    }

    Some(LawViolation::advisory(
        LawKind::ResourceConservation,
        ErrorCode::Custom("BATCH_AVAILABLE".to_string()),
        format!(
            "`{}` is a single-item read called with {count} items; one batch call would do",
            read.name
        ),
        ViolationLocation::Arguments,
    ))
}

/// Write that is not declared safe to retry
pub fn idempotency(write: &OperationDescriptor) -> Option<LawViolation> {
    if write.idempotent {
        return None;
    }

    Some(LawViolation::advisory(
        LawKind::Idempotency,
        ErrorCode::Custom("NON_IDEMPOTENT_WRITE".to_string()),
        format!(
            "`{}` is not declared idempotent; retrying it may duplicate effects",
            write.name
        ),
        ViolationLocation::Combination,
    ))
}

/// Sequences should not mix records from several sources
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationCoherenceLaw;

impl Law for AggregationCoherenceLaw {
    fn kind(&self) -> LawKind {
        LawKind::AggregationCoherence
    }

    fn description(&self) -> &str {
        "Records aggregated into one sequence come from a single source"
    }

    fn check(&self, context: &LawContext<'_>) -> Vec<LawViolation> {
        if context.records.len() < 2 {
            return Vec::new();
        }

        let sources: BTreeSet<&str> = context
            .records
            .iter()
            .filter_map(|record| record.source.as_deref())
            .filter(|source| !source.trim().is_empty())
            .collect();
        if sources.len() < 2 {
            return Vec::new();
        }

        vec![LawViolation::advisory(
            self.kind(),
            ErrorCode::Custom("MIXED_SOURCES".to_string()),
            format!(
                "Sequence aggregates {} sources: {}",
                sources.len(),
                sources.into_iter().collect::<Vec<_>>().join(", ")
            ),
            ViolationLocation::Payload,
        )]
    }
}
