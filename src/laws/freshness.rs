// Copyright 2025 Cowboy AI, LLC.

//! Data Freshness
//!
//! Reads with current semantics must return data younger than the staleness
//! bound. Historical and unspecified reads are exempt. Severity follows
//! [`FreshnessMode`]: strict makes staleness an error, lenient a warning.

use crate::config::FreshnessMode;
use crate::errors::ErrorCode;
use crate::operations::Semantics;

use super::{Law, LawContext, LawKind, LawViolation, ViolationLocation};

/// "Current" data is younger than the staleness bound
#[derive(Debug, Clone, Copy, Default)]
pub struct DataFreshnessLaw;

impl Law for DataFreshnessLaw {
    fn kind(&self) -> LawKind {
        LawKind::DataFreshness
    }

    fn description(&self) -> &str {
        "Current data is no older than the configured staleness bound"
    }

    fn check(&self, context: &LawContext<'_>) -> Vec<LawViolation> {
        if context.semantics != Semantics::Current {
            return Vec::new();
        }

        let bound = context.config.staleness_bound();
        let mut violations = Vec::new();

        for (index, record) in context.records.iter().enumerate() {
            let Some(stamp) = record.last_updated else {
                continue;
            };
            let age = context.now - stamp;
            if age <= bound {
                continue;
            }

            let message = format!(
                "Data is {} minutes old, exceeding the {}-minute staleness bound",
                age.num_minutes(),
                bound.num_minutes()
            );
            let location = ViolationLocation::record(record.position_or(index), Some("lastUpdated"));
            violations.push(match context.config.freshness_mode {
                FreshnessMode::Strict => {
                    LawViolation::error(self.kind(), ErrorCode::StaleData, message, location)
                }
                FreshnessMode::Lenient => {
                    LawViolation::warning(self.kind(), ErrorCode::StaleData, message, location)
                }
            });
        }

        violations
    }
}
