// Copyright 2025 Cowboy AI, LLC.

//! Error types for combinator operations
//!
//! Two kinds of failure exist in this crate:
//!
//! - [`StructuredError`] is the runtime currency. Every read, transform and
//!   write resolves to an [`OperationResult`], and every failed execution
//!   hands one of these back to the caller.
//! - [`CombinatorError`] is raised while a combination is being built. It
//!   signals a programming mistake (incoherent types, mismatched cardinality,
//!   a broken configuration) and is never deferred to execution time.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payload::Cardinality;

/// Broad classification of a structured error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// A law or invariant was violated; the caller can correct the input
    Validation,
    /// Domain logic refused to proceed
    Business,
    /// Infrastructure or I/O failure surfaced by a collaborator
    System,
    /// The transform step failed; a specialisation of [`ErrorCategory::Business`]
    Transformation,
    /// The execution was cancelled before it finished
    Cancelled,
}

impl ErrorCategory {
    /// Wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "VALIDATION",
            ErrorCategory::Business => "BUSINESS",
            ErrorCategory::System => "SYSTEM",
            ErrorCategory::Transformation => "TRANSFORMATION",
            ErrorCategory::Cancelled => "CANCELLED",
        }
    }

    /// Transformation failures are business failures as well
    pub fn is_business(&self) -> bool {
        matches!(self, ErrorCategory::Business | ErrorCategory::Transformation)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable error code
///
/// The engine originates the named codes. Collaborators may report any other
/// code through [`ErrorCode::Custom`]; it is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ErrorCode {
    /// Payload shape does not match what the write accepts
    TypeIncoherent,
    /// A sequence met a single-item operation or vice versa
    CardinalityMismatch,
    /// Source, exchange or timestamp is absent from a market record
    MissingAttribution,
    /// Attribution differs between the read output and the write input
    AttributionChanged,
    /// Requested range is empty or inverted
    InvalidDateRange,
    /// Data or requested range lies in the future
    FutureHistoricalData,
    /// "Current" data is older than the staleness bound
    StaleData,
    /// Numeric market-data invariants failed
    MarketDataInvalid,
    /// The transform step raised an error or panicked
    TransformationFailed,
    /// The execution was cancelled
    Cancelled,
    /// Any collaborator-defined code
    Custom(String),
}

impl ErrorCode {
    /// Wire form of the code
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::TypeIncoherent => "TYPE_INCOHERENT",
            ErrorCode::CardinalityMismatch => "CARDINALITY_MISMATCH",
            ErrorCode::MissingAttribution => "MISSING_ATTRIBUTION",
            ErrorCode::AttributionChanged => "ATTRIBUTION_CHANGED",
            ErrorCode::InvalidDateRange => "INVALID_DATE_RANGE",
            ErrorCode::FutureHistoricalData => "FUTURE_HISTORICAL_DATA",
            ErrorCode::StaleData => "STALE_DATA",
            ErrorCode::MarketDataInvalid => "MARKET_DATA_INVALID",
            ErrorCode::TransformationFailed => "TRANSFORMATION_FAILED",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Custom(code) => code,
        }
    }

    /// Parse a wire code, falling back to [`ErrorCode::Custom`]
    pub fn parse(code: &str) -> Self {
        match code {
            "TYPE_INCOHERENT" => ErrorCode::TypeIncoherent,
            "CARDINALITY_MISMATCH" => ErrorCode::CardinalityMismatch,
            "MISSING_ATTRIBUTION" => ErrorCode::MissingAttribution,
            "ATTRIBUTION_CHANGED" => ErrorCode::AttributionChanged,
            "INVALID_DATE_RANGE" => ErrorCode::InvalidDateRange,
            "FUTURE_HISTORICAL_DATA" => ErrorCode::FutureHistoricalData,
            "STALE_DATA" => ErrorCode::StaleData,
            "MARKET_DATA_INVALID" => ErrorCode::MarketDataInvalid,
            "TRANSFORMATION_FAILED" => ErrorCode::TransformationFailed,
            "CANCELLED" => ErrorCode::Cancelled,
            other => ErrorCode::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        ErrorCode::parse(&code)
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        ErrorCode::parse(code)
    }
}

/// Structured failure exchanged between every pipeline stage
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("[{category}] {code}: {message}")]
pub struct StructuredError {
    /// Machine-readable code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Broad classification
    pub category: ErrorCategory,
    /// Open map of contextual details, in insertion order
    #[serde(default)]
    pub details: IndexMap<String, serde_json::Value>,
}

impl StructuredError {
    /// Create an error with an explicit category
    pub fn new(
        code: impl Into<ErrorCode>,
        category: ErrorCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            category,
            details: IndexMap::new(),
        }
    }

    /// Caller-correctable law or invariant violation
    pub fn validation(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self::new(code, ErrorCategory::Validation, message)
    }

    /// Domain-logic failure
    pub fn business(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self::new(code, ErrorCategory::Business, message)
    }

    /// Infrastructure failure reported by a read or write operation
    pub fn system(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self::new(code, ErrorCategory::System, message)
    }

    /// Failure raised inside the transform step
    pub fn transformation(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TransformationFailed,
            ErrorCategory::Transformation,
            message,
        )
    }

    /// Cancellation observed while `stage` was running
    pub fn cancelled(stage: &str) -> Self {
        Self::new(
            ErrorCode::Cancelled,
            ErrorCategory::Cancelled,
            format!("execution cancelled during {stage}"),
        )
        .with_detail("stage", stage)
    }

    /// Attach a contextual detail
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Look up a contextual detail
    pub fn detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.details.get(key)
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        self.category == ErrorCategory::Validation
    }

    /// Check if this is a business error, transformation failures included
    pub fn is_business(&self) -> bool {
        self.category.is_business()
    }

    /// Check if this is a system error
    pub fn is_system(&self) -> bool {
        self.category == ErrorCategory::System
    }

    /// Check if the execution was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.category == ErrorCategory::Cancelled
    }
}

impl From<serde_json::Error> for StructuredError {
    fn from(err: serde_json::Error) -> Self {
        StructuredError::system("SERIALIZATION_ERROR", err.to_string())
    }
}

/// Result type for every asynchronous operation boundary
pub type OperationResult<T> = Result<T, StructuredError>;

/// Lift foreign errors into [`StructuredError`]
pub trait ResultExt<T> {
    /// Map the error to a `SYSTEM` error carrying `code`
    fn into_structured(self, code: &str) -> OperationResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::error::Error,
{
    fn into_structured(self, code: &str) -> OperationResult<T> {
        self.map_err(|err| StructuredError::system(code, err.to_string()))
    }
}

/// Errors raised while building a combination
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombinatorError {
    /// The producer's shape cannot feed the write operation
    #[error("Type incoherent: `{read}` cannot feed `{write}`: {reason}")]
    TypeIncoherent {
        /// Producing operation
        read: String,
        /// Consuming operation
        write: String,
        /// Which fields disagree
        reason: String,
    },

    /// A sequence read was paired with a single-item write or vice versa
    #[error("Cardinality mismatch: `{read}` yields {read_cardinality} but `{write}` accepts {write_cardinality}")]
    CardinalityMismatch {
        /// Producing operation
        read: String,
        /// Consuming operation
        write: String,
        /// What the producer yields
        read_cardinality: Cardinality,
        /// What the write accepts
        write_cardinality: Cardinality,
    },

    /// The law configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CombinatorError {
    /// Wire code matching the runtime counterpart of this error
    pub fn code(&self) -> ErrorCode {
        match self {
            CombinatorError::TypeIncoherent { .. } => ErrorCode::TypeIncoherent,
            CombinatorError::CardinalityMismatch { .. } => ErrorCode::CardinalityMismatch,
            CombinatorError::InvalidConfig(_) => ErrorCode::Custom("INVALID_CONFIG".to_string()),
        }
    }
}

/// Result type for combination construction
pub type CombinatorResult<T> = Result<T, CombinatorError>;
