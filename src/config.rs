// Copyright 2025 Cowboy AI, LLC.

//! Law configuration and evaluation clock
//!
//! Configuration is handed to [`crate::Combinator::new`] explicitly. Nothing
//! here is global, so combinations built from different configurations never
//! interfere with each other.

use std::collections::BTreeSet;
use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CombinatorError, CombinatorResult};
use crate::laws::LawKind;

/// How stale "current" data is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessMode {
    /// Stale data fails the execution with `STALE_DATA`
    #[default]
    Strict,
    /// Stale data is written and a warning is attached to the outcome
    Lenient,
}

/// Which laws are active and how they are parameterised
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LawConfig {
    /// Laws evaluated by combinations built with this configuration
    pub enabled: BTreeSet<LawKind>,
    /// Maximum age of "current" data, in seconds
    pub staleness_bound_secs: i64,
    /// Severity of freshness violations
    pub freshness_mode: FreshnessMode,
    /// Clock skew tolerated before a timestamp counts as "in the future", in seconds
    pub max_future_skew_secs: i64,
    /// Attach advisory findings to successful outcomes
    pub emit_advisories: bool,
}

impl Default for LawConfig {
    fn default() -> Self {
        Self {
            enabled: LawKind::all().iter().copied().collect(),
            staleness_bound_secs: 60 * 60,
            freshness_mode: FreshnessMode::Strict,
            max_future_skew_secs: 0,
            emit_advisories: true,
        }
    }
}

impl LawConfig {
    /// Load a configuration document; absent fields take their defaults
    pub fn from_json(document: &str) -> CombinatorResult<Self> {
        let config: LawConfig = serde_json::from_str(document)
            .map_err(|err| CombinatorError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject unusable settings
    pub fn validate(&self) -> CombinatorResult<()> {
        if self.staleness_bound_secs <= 0 {
            return Err(CombinatorError::InvalidConfig(format!(
                "staleness bound must be positive, got {}s",
                self.staleness_bound_secs
            )));
        }
        if self.max_future_skew_secs < 0 {
            return Err(CombinatorError::InvalidConfig(format!(
                "future skew must not be negative, got {}s",
                self.max_future_skew_secs
            )));
        }
        representable("staleness bound", self.staleness_bound_secs)?;
        representable("future skew", self.max_future_skew_secs)?;
        Ok(())
    }

    /// Whether a law is evaluated
    ///
    /// Structural laws hold by construction of the pipeline and cannot be
    /// switched off.
    pub fn is_enabled(&self, law: LawKind) -> bool {
        law.is_structural() || self.enabled.contains(&law)
    }

    /// Enable a law
    pub fn with_law(mut self, law: LawKind) -> Self {
        self.enabled.insert(law);
        self
    }

    /// Disable a law
    pub fn without_law(mut self, law: LawKind) -> Self {
        self.enabled.remove(&law);
        self
    }

    /// Set the staleness bound for "current" data
    pub fn with_staleness_bound(mut self, bound: Duration) -> Self {
        self.staleness_bound_secs = bound.num_seconds();
        self
    }

    /// Set the tolerated clock skew
    pub fn with_future_skew(mut self, skew: Duration) -> Self {
        self.max_future_skew_secs = skew.num_seconds();
        self
    }

    /// Set the freshness mode
    pub fn with_freshness_mode(mut self, mode: FreshnessMode) -> Self {
        self.freshness_mode = mode;
        self
    }

    /// Demote staleness to a warning
    pub fn lenient(self) -> Self {
        self.with_freshness_mode(FreshnessMode::Lenient)
    }

    /// Treat staleness as a failure
    pub fn strict(self) -> Self {
        self.with_freshness_mode(FreshnessMode::Strict)
    }

    /// Staleness bound as a duration, saturating when out of range
    pub fn staleness_bound(&self) -> Duration {
        Duration::try_seconds(self.staleness_bound_secs).unwrap_or(Duration::MAX)
    }

    /// Future skew as a duration, saturating when out of range
    pub fn future_skew(&self) -> Duration {
        Duration::try_seconds(self.max_future_skew_secs).unwrap_or(Duration::MAX)
    }
}

/// A bound must be a valid duration that can be added to the present
fn representable(setting: &str, secs: i64) -> CombinatorResult<()> {
    Duration::try_seconds(secs)
        .filter(|bound| Utc::now().checked_add_signed(*bound).is_some())
        .map(|_| ())
        .ok_or_else(|| {
            CombinatorError::InvalidConfig(format!("{setting} of {secs}s is out of range"))
        })
}

/// Source of evaluation time for the freshness and temporal laws
pub trait Clock: Debug + Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LawConfig::default();
        assert_eq!(config.staleness_bound(), Duration::minutes(60));
        assert_eq!(config.freshness_mode, FreshnessMode::Strict);
        assert!(config.is_enabled(LawKind::DataFreshness));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = LawConfig::from_json(
            r#"{ "staleness_bound_secs": 300, "freshness_mode": "lenient" }"#,
        )
        .expect("valid config");
        assert_eq!(config.staleness_bound(), Duration::minutes(5));
        assert_eq!(config.freshness_mode, FreshnessMode::Lenient);
        assert!(config.emit_advisories);
        assert_eq!(config.enabled.len(), LawKind::all().len());
    }

    #[test]
    fn test_from_json_rejects_bad_documents() {
        assert!(matches!(
            LawConfig::from_json(r#"{ "staleness_bound_secs": 0 }"#),
            Err(CombinatorError::InvalidConfig(_))
        ));
        assert!(matches!(
            LawConfig::from_json("not json"),
            Err(CombinatorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_out_of_range_bounds_are_rejected() {
        for document in [
            r#"{ "max_future_skew_secs": 10000000000000 }"#,
            r#"{ "staleness_bound_secs": 9223372036854775807 }"#,
        ] {
            assert!(matches!(
                LawConfig::from_json(document),
                Err(CombinatorError::InvalidConfig(message)) if message.contains("out of range")
            ));
        }

        let config = LawConfig {
            staleness_bound_secs: i64::MAX,
            ..LawConfig::default()
        };
        assert!(crate::Combinator::new(config.clone()).is_err());
        assert_eq!(config.staleness_bound(), Duration::MAX);
    }

    #[test]
    fn test_structural_laws_cannot_be_disabled() {
        let config = LawConfig::default()
            .without_law(LawKind::ErrorPropagation)
            .without_law(LawKind::MarketDataValidation);
        assert!(config.is_enabled(LawKind::ErrorPropagation));
        assert!(!config.is_enabled(LawKind::MarketDataValidation));
    }

    #[test]
    fn test_fixed_clock() {
        let instant = Utc::now();
        assert_eq!(FixedClock(instant).now(), instant);
    }
}
