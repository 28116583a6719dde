// Copyright 2025 Cowboy AI, LLC.

//! Laws every read-write combination must obey
//!
//! A law is an invariant that holds for any valid combination, whatever the
//! concrete data source or sink. Laws fall into three groups:
//!
//! - **Structural** laws hold by construction of the pipeline and are never
//!   evaluated at runtime: Error Propagation (the write is unreachable after a
//!   failed read), Temporal Execution (each stage awaits the previous one) and
//!   Data Flow Purity (transforms only ever see `&T`).
//! - **Construction** laws are checked when a combination is bound: Type
//!   Coherence and Cardinality Coherence. Generics cover the static case; the
//!   [`coherence`] module covers dynamically typed payloads.
//! - **Payload** laws implement [`Law`] and run against every read result:
//!   Temporal Consistency, Attribution Preservation, Data Freshness, Market
//!   Data Validation and the advisory Aggregation Coherence.
//!
//! Each payload law reports every violation it finds. [`LawChecker`] gathers
//! them into a [`LawReport`]; only error-severity violations fail a pipeline.

pub mod advisory;
pub mod attribution;
pub mod coherence;
pub mod freshness;
pub mod market;
pub mod temporal;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::arguments::DateRange;
use crate::config::LawConfig;
use crate::errors::{ErrorCode, StructuredError};
use crate::operations::Semantics;
use crate::payload::{Payload, RecordView};

pub use advisory::AggregationCoherenceLaw;
pub use attribution::AttributionLaw;
pub use freshness::DataFreshnessLaw;
pub use market::MarketDataLaw;
pub use temporal::TemporalConsistencyLaw;

/// Every law the engine knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LawKind {
    /// Read output feeds the write input
    TypeCoherence,
    /// Sequences meet sequences, single items meet single items
    CardinalityCoherence,
    /// A failed stage stops the pipeline with its own error
    ErrorPropagation,
    /// Transforms never mutate their input
    DataFlowPurity,
    /// Stages run strictly in order
    TemporalExecution,
    /// Market records carry source, origin and timestamp end to end
    AttributionPreservation,
    /// Ranges are ordered and nothing lies in the future
    TemporalConsistency,
    /// "Current" data is younger than the staleness bound
    DataFreshness,
    /// Prices, volumes and OHLC bounds are sane
    MarketDataValidation,
    /// Prefer one batch call over many single calls (advisory)
    ResourceConservation,
    /// Sequences are drawn from a single source (advisory)
    AggregationCoherence,
    /// Writes are safe to retry (advisory)
    Idempotency,
}

impl LawKind {
    /// All laws, in evaluation order
    pub fn all() -> &'static [LawKind] {
        &[
            LawKind::TypeCoherence,
            LawKind::CardinalityCoherence,
            LawKind::ErrorPropagation,
            LawKind::DataFlowPurity,
            LawKind::TemporalExecution,
            LawKind::TemporalConsistency,
            LawKind::AttributionPreservation,
            LawKind::DataFreshness,
            LawKind::MarketDataValidation,
            LawKind::AggregationCoherence,
            LawKind::ResourceConservation,
            LawKind::Idempotency,
        ]
    }

    /// Snake-case name
    pub fn name(&self) -> &'static str {
        match self {
            LawKind::TypeCoherence => "type_coherence",
            LawKind::CardinalityCoherence => "cardinality_coherence",
            LawKind::ErrorPropagation => "error_propagation",
            LawKind::DataFlowPurity => "data_flow_purity",
            LawKind::TemporalExecution => "temporal_execution",
            LawKind::AttributionPreservation => "attribution_preservation",
            LawKind::TemporalConsistency => "temporal_consistency",
            LawKind::DataFreshness => "data_freshness",
            LawKind::MarketDataValidation => "market_data_validation",
            LawKind::ResourceConservation => "resource_conservation",
            LawKind::AggregationCoherence => "aggregation_coherence",
            LawKind::Idempotency => "idempotency",
        }
    }

    /// Laws guaranteed by the shape of the pipeline itself
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            LawKind::ErrorPropagation | LawKind::DataFlowPurity | LawKind::TemporalExecution
        )
    }

    /// Laws that only ever produce warnings
    pub fn is_advisory(&self) -> bool {
        matches!(
            self,
            LawKind::ResourceConservation | LawKind::AggregationCoherence | LawKind::Idempotency
        )
    }
}

impl fmt::Display for LawKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Severity of a law violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// Advisory finding, never fails a pipeline
    Info,
    /// Attached to a successful outcome
    Warning,
    /// Fails the pipeline before the write
    Error,
}

/// Where a violation was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "at", rename_all = "snake_case")]
pub enum ViolationLocation {
    /// In how the combination was assembled
    Combination,
    /// In the read arguments
    Arguments,
    /// In the payload as a whole
    Payload,
    /// In one record of the payload
    Record {
        /// Position of the record in the payload
        index: usize,
        /// Offending field, when one can be named
        field: Option<String>,
    },
}

impl ViolationLocation {
    /// A record, optionally narrowed to one field
    pub fn record(index: usize, field: Option<&str>) -> Self {
        ViolationLocation::Record {
            index,
            field: field.map(str::to_string),
        }
    }
}

/// One violation of one law
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LawViolation {
    /// Which law was violated
    pub law: LawKind,
    /// Machine-readable code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// How serious the violation is
    pub severity: ViolationSeverity,
    /// Where it was found
    pub location: ViolationLocation,
}

impl LawViolation {
    /// Error-severity violation
    pub fn error(
        law: LawKind,
        code: ErrorCode,
        message: impl Into<String>,
        location: ViolationLocation,
    ) -> Self {
        Self {
            law,
            code,
            message: message.into(),
            severity: ViolationSeverity::Error,
            location,
        }
    }

    /// Warning-severity violation
    pub fn warning(
        law: LawKind,
        code: ErrorCode,
        message: impl Into<String>,
        location: ViolationLocation,
    ) -> Self {
        Self {
            severity: ViolationSeverity::Warning,
            ..Self::error(law, code, message, location)
        }
    }

    /// Advisory finding
    pub fn advisory(
        law: LawKind,
        code: ErrorCode,
        message: impl Into<String>,
        location: ViolationLocation,
    ) -> Self {
        Self {
            severity: ViolationSeverity::Info,
            ..Self::error(law, code, message, location)
        }
    }

    /// Whether this violation fails the pipeline
    pub fn is_error(&self) -> bool {
        self.severity == ViolationSeverity::Error
    }

    /// JSON form used in error details
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl fmt::Display for LawViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.law, self.code, self.message)
    }
}

/// Everything a payload law may look at
#[derive(Debug, Clone, Copy)]
pub struct LawContext<'a> {
    /// Name of the operation that produced the payload
    pub operation: &'a str,
    /// Market records of the payload
    pub records: &'a [RecordView],
    /// Current or historical semantics of the read
    pub semantics: Semantics,
    /// Date range the read requested, if any
    pub date_range: Option<DateRange>,
    /// Evaluation time
    pub now: DateTime<Utc>,
    /// Active configuration
    pub config: &'a LawConfig,
}

/// A payload-level law
pub trait Law: Send + Sync {
    /// Which law this is
    fn kind(&self) -> LawKind;

    /// What the law ensures
    fn description(&self) -> &str;

    /// Every violation found in the context; empty when the law holds
    fn check(&self, context: &LawContext<'_>) -> Vec<LawViolation>;
}

/// Outcome of evaluating a set of laws
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LawReport {
    /// Laws that were evaluated
    pub laws_checked: Vec<LawKind>,
    /// Violations found, in law order
    pub violations: Vec<LawViolation>,
    /// Evaluation time
    pub checked_at: DateTime<Utc>,
}

impl LawReport {
    /// No error-severity violation was found
    pub fn is_satisfied(&self) -> bool {
        !self.violations.iter().any(LawViolation::is_error)
    }

    /// Error-severity violations
    pub fn errors(&self) -> impl Iterator<Item = &LawViolation> {
        self.violations.iter().filter(|v| v.is_error())
    }

    /// Warnings and advisories
    pub fn warnings(&self) -> impl Iterator<Item = &LawViolation> {
        self.violations.iter().filter(|v| !v.is_error())
    }

    /// Collapse the error-severity violations into one validation error
    ///
    /// The first failing law names the code. Its messages form the error
    /// message, and every error-severity violation is listed under
    /// `details["violations"]`.
    pub fn to_error(&self) -> Option<StructuredError> {
        let errors: Vec<&LawViolation> = self.errors().collect();
        let primary = *errors.first()?;

        let message = errors
            .iter()
            .filter(|v| v.law == primary.law)
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        Some(
            StructuredError::validation(primary.code.clone(), message)
                .with_detail("law", primary.law.name())
                .with_detail(
                    "violations",
                    errors.iter().map(|v| v.to_json()).collect::<Vec<_>>(),
                ),
        )
    }
}

/// Runs the enabled payload laws
pub struct LawChecker {
    laws: Vec<Box<dyn Law>>,
    config: LawConfig,
}

impl LawChecker {
    /// Checker holding every payload law the configuration enables
    pub fn new(config: LawConfig) -> Self {
        let candidates: Vec<Box<dyn Law>> = vec![
            Box::new(TemporalConsistencyLaw),
            Box::new(AttributionLaw),
            Box::new(DataFreshnessLaw),
            Box::new(MarketDataLaw),
            Box::new(AggregationCoherenceLaw),
        ];
        let laws = candidates
            .into_iter()
            .filter(|law| config.is_enabled(law.kind()))
            .collect();
        Self { laws, config }
    }

    /// Checker with no laws; add them with [`LawChecker::register`]
    pub fn empty(config: LawConfig) -> Self {
        Self {
            laws: Vec::new(),
            config,
        }
    }

    /// Add a law
    pub fn register(&mut self, law: Box<dyn Law>) {
        self.laws.push(law);
    }

    /// Configuration the checker evaluates against
    pub fn config(&self) -> &LawConfig {
        &self.config
    }

    /// Laws that will be evaluated
    pub fn laws(&self) -> Vec<LawKind> {
        self.laws.iter().map(|law| law.kind()).collect()
    }

    /// Evaluate every law against a context
    pub fn check(&self, context: &LawContext<'_>) -> LawReport {
        let mut violations = Vec::new();

        for law in &self.laws {
            let found = law.check(context);
            for violation in &found {
                if violation.severity == ViolationSeverity::Info {
                    debug!(law = %violation.law, code = %violation.code, "{}", violation.message);
                } else {
                    warn!(
                        operation = context.operation,
                        law = %violation.law,
                        code = %violation.code,
                        "{}",
                        violation.message
                    );
                }
            }
            violations.extend(found);
        }

        LawReport {
            laws_checked: self.laws(),
            violations,
            checked_at: context.now,
        }
    }

    /// Evaluate every law against a payload outside of a pipeline
    pub fn check_payload<P: Payload>(
        &self,
        operation: &str,
        payload: &P,
        semantics: Semantics,
        now: DateTime<Utc>,
    ) -> LawReport {
        let records = payload.records();
        self.check(&LawContext {
            operation,
            records: &records,
            semantics,
            date_range: None,
            now,
            config: &self.config,
        })
    }
}

impl fmt::Debug for LawChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LawChecker")
            .field("laws", &self.laws())
            .field("config", &self.config)
            .finish()
    }
}
