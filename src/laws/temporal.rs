// Copyright 2025 Cowboy AI, LLC.

//! Temporal Consistency
//!
//! Requested ranges must be ordered and must not reach into the future, and
//! no record may be stamped later than the evaluation time.

use chrono::{DateTime, Utc};

use crate::errors::ErrorCode;

use super::{Law, LawContext, LawKind, LawViolation, ViolationLocation};

/// Ranges are ordered and nothing lies in the future
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalConsistencyLaw;

impl Law for TemporalConsistencyLaw {
    fn kind(&self) -> LawKind {
        LawKind::TemporalConsistency
    }

    fn description(&self) -> &str {
        "Range starts precede range ends, and neither ranges nor data lie in the future"
    }

    fn check(&self, context: &LawContext<'_>) -> Vec<LawViolation> {
        let mut violations = Vec::new();
        // No horizon when the skew reaches past the last representable instant.
        let horizon = context.now.checked_add_signed(context.config.future_skew());
        let in_future = |instant: DateTime<Utc>| horizon.is_some_and(|horizon| instant > horizon);

        if let Some(range) = context.date_range {
            if range.start >= range.end {
                violations.push(LawViolation::error(
                    self.kind(),
                    ErrorCode::InvalidDateRange,
                    format!(
                        "Start date {} must precede end date {}",
                        range.start.to_rfc3339(),
                        range.end.to_rfc3339()
                    ),
                    ViolationLocation::Arguments,
                ));
            }
            if in_future(range.end) {
                violations.push(LawViolation::error(
                    self.kind(),
                    ErrorCode::FutureHistoricalData,
                    format!(
                        "End date {} must not lie in the future",
                        range.end.to_rfc3339()
                    ),
                    ViolationLocation::Arguments,
                ));
            }
        }

        for (index, record) in context.records.iter().enumerate() {
            if let Some(stamp) = record.last_updated {
                if in_future(stamp) {
                    violations.push(LawViolation::error(
                        self.kind(),
                        ErrorCode::FutureHistoricalData,
                        format!(
                            "Data timestamp {} must not lie in the future",
                            stamp.to_rfc3339()
                        ),
                        ViolationLocation::record(record.position_or(index), Some("lastUpdated")),
                    ));
                }
            }
        }

        violations
    }
}
