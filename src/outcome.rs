// Copyright 2025 Cowboy AI, LLC.

//! Successful execution outcome

use crate::errors::ErrorCode;
use crate::execution::ExecutionTrace;
use crate::laws::{LawKind, LawViolation};

/// Write result of a successful execution, with the findings that did not fail it
///
/// Equality compares the value and the warnings; the trace differs between
/// runs by construction and is ignored.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    value: T,
    warnings: Vec<LawViolation>,
    trace: ExecutionTrace,
}

impl<T> Outcome<T> {
    pub(crate) fn new(value: T, warnings: Vec<LawViolation>, trace: ExecutionTrace) -> Self {
        Self {
            value,
            warnings,
            trace,
        }
    }

    /// The write operation's result
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Take the write operation's result
    pub fn into_value(self) -> T {
        self.value
    }

    /// Warnings and advisories attached to the run
    pub fn warnings(&self) -> &[LawViolation] {
        &self.warnings
    }

    /// Whether anything was attached
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// First warning carrying `code`
    pub fn warning(&self, code: &ErrorCode) -> Option<&LawViolation> {
        self.warnings.iter().find(|w| &w.code == code)
    }

    /// Warnings raised by one law
    pub fn warnings_for(&self, law: LawKind) -> impl Iterator<Item = &LawViolation> {
        self.warnings.iter().filter(move |w| w.law == law)
    }

    /// States the run passed through
    pub fn trace(&self) -> &ExecutionTrace {
        &self.trace
    }

    /// Map the value, keeping warnings and trace
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
            trace: self.trace,
        }
    }

    /// Split into value, warnings and trace
    pub fn into_parts(self) -> (T, Vec<LawViolation>, ExecutionTrace) {
        (self.value, self.warnings, self.trace)
    }
}

impl<T: PartialEq> PartialEq for Outcome<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.warnings == other.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::laws::ViolationLocation;
    use uuid::Uuid;

    #[test]
    fn test_equality_ignores_trace() {
        let warning = LawViolation::warning(
            LawKind::DataFreshness,
            ErrorCode::StaleData,
            "Data is 120 minutes old",
            ViolationLocation::record(0, Some("lastUpdated")),
        );
        let a = Outcome::new(7, vec![warning.clone()], ExecutionTrace::new(Uuid::new_v4()));
        let b = Outcome::new(7, vec![warning], ExecutionTrace::new(Uuid::new_v4()));

        assert_eq!(a, b);
        assert!(a.warning(&ErrorCode::StaleData).is_some());
        assert_eq!(a.warnings_for(LawKind::DataFreshness).count(), 1);
        assert_eq!(a.map(|v| v * 2).into_value(), 14);
    }
}
