// Copyright 2025 Cowboy AI, LLC.

//! Attribution Preservation
//!
//! Market records carry a source, an origin identifier and a last-updated
//! timestamp. [`AttributionLaw`] checks presence on the read output;
//! [`check_preserved`] compares the attribution entering the write with the
//! snapshot taken when the read finished.

use std::collections::HashSet;

use crate::errors::ErrorCode;
use crate::payload::{Attribution, RecordView};

use super::{Law, LawContext, LawKind, LawViolation, ViolationLocation};

/// Every market record carries complete attribution
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributionLaw;

impl Law for AttributionLaw {
    fn kind(&self) -> LawKind {
        LawKind::AttributionPreservation
    }

    fn description(&self) -> &str {
        "Market records carry source, exchange and last-updated attribution"
    }

    fn check(&self, context: &LawContext<'_>) -> Vec<LawViolation> {
        context
            .records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| missing_attribution(record.position_or(index), record))
            .collect()
    }
}

fn missing_attribution(index: usize, record: &RecordView) -> Option<LawViolation> {
    let missing = record.missing_attribution();
    if missing.is_empty() {
        return None;
    }

    let field = (missing.len() == 1).then(|| missing[0]);
    Some(LawViolation::error(
        LawKind::AttributionPreservation,
        ErrorCode::MissingAttribution,
        format!("Missing attribution: {}", missing.join(", ")),
        ViolationLocation::record(index, field),
    ))
}

/// Attribution of each record, `None` where incomplete
pub fn snapshot(records: &[RecordView]) -> Vec<Option<Attribution>> {
    records.iter().map(RecordView::attribution).collect()
}

/// Compare the records about to be written with the read-time snapshot
///
/// Every outgoing record must be fully attributed. When the read produced
/// attributed records, each outgoing attribution must equal one of them by
/// value; a transform may drop or merge records but may not invent or alter
/// provenance.
pub fn check_preserved(before: &[Option<Attribution>], after: &[RecordView]) -> Vec<LawViolation> {
    let known: HashSet<&Attribution> = before.iter().flatten().collect();
    let mut violations = Vec::new();

    for (index, record) in after.iter().enumerate() {
        let index = record.position_or(index);
        match record.attribution() {
            None => violations.extend(missing_attribution(index, record)),
            Some(attribution) if !known.is_empty() && !known.contains(&attribution) => {
                violations.push(LawViolation::error(
                    LawKind::AttributionPreservation,
                    ErrorCode::AttributionChanged,
                    format!(
                        "Attribution changed between read and write: {}/{} at {}",
                        attribution.source,
                        attribution.exchange_id,
                        attribution.last_updated.to_rfc3339()
                    ),
                    ViolationLocation::record(index, None),
                ))
            }
            Some(_) => {}
        }
    }

    violations
}
