// Copyright 2025 Cowboy AI, LLC.

//! Market Data Validation
//!
//! Numeric invariants of market records. Violations are collected across
//! every record and field rather than stopping at the first, so the caller
//! sees the complete set of issues in one error.

use crate::errors::ErrorCode;
use crate::payload::RecordView;

use super::{Law, LawContext, LawKind, LawViolation, ViolationLocation};

/// Prices positive, volumes non-negative, OHLC bounds and percentages sane
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketDataLaw;

impl Law for MarketDataLaw {
    fn kind(&self) -> LawKind {
        LawKind::MarketDataValidation
    }

    fn description(&self) -> &str {
        "Prices are positive, volumes non-negative, OHLC values consistent and percentages within [0, 100]"
    }

    fn check(&self, context: &LawContext<'_>) -> Vec<LawViolation> {
        context
            .records
            .iter()
            .enumerate()
            .flat_map(|(index, record)| validate_record(record.position_or(index), record))
            .collect()
    }
}

/// Every numeric violation in one record
pub fn validate_record(index: usize, record: &RecordView) -> Vec<LawViolation> {
    let mut issues = Issues::new(index);

    issues.positive("price", "Price", record.price);
    issues.positive("open", "Open price", record.open);
    issues.positive("high", "High price", record.high);
    issues.positive("low", "Low price", record.low);
    issues.positive("close", "Close price", record.close);
    issues.positive("marketCap", "Market capitalization", record.market_cap);

    if let Some(volume) = record.volume {
        if !volume.is_finite() || volume < 0.0 {
            issues.push("volume", "Volume must be non-negative".to_string());
        }
    }

    if let Some(dominance) = record.dominance {
        if !(0.0..=100.0).contains(&dominance) {
            issues.push(
                "dominance",
                format!("Dominance must be between 0 and 100, got {dominance}"),
            );
        }
    }

    if let (Some(high), Some(low)) = (record.high, record.low) {
        if high < low {
            issues.push(
                "high",
                format!("High ({high}) must be greater than or equal to low ({low})"),
            );
        } else {
            for (field, label, value) in [("open", "Open", record.open), ("close", "Close", record.close)] {
                if let Some(value) = value {
                    if value < low || value > high {
                        issues.push(
                            field,
                            format!("{label} ({value}) must lie within [{low}, {high}]"),
                        );
                    }
                }
            }
        }
    }

    issues.into_violations()
}

struct Issues {
    index: usize,
    violations: Vec<LawViolation>,
}

impl Issues {
    fn new(index: usize) -> Self {
        Self {
            index,
            violations: Vec::new(),
        }
    }

    fn push(&mut self, field: &str, message: String) {
        self.violations.push(LawViolation::error(
            LawKind::MarketDataValidation,
            ErrorCode::MarketDataInvalid,
            message,
            ViolationLocation::record(self.index, Some(field)),
        ));
    }

    fn positive(&mut self, field: &str, label: &str, value: Option<f64>) {
        if let Some(value) = value {
            if !value.is_finite() || value <= 0.0 {
                self.push(field, format!("{label} must be positive"));
            }
        }
    }

    fn into_violations(self) -> Vec<LawViolation> {
        self.violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::RecordKind;

    fn messages(record: &RecordView) -> Vec<String> {
        validate_record(0, record)
            .into_iter()
            .map(|v| v.message)
            .collect()
    }

    #[test]
    fn test_valid_ticker_passes() {
        let record = RecordView::new(RecordKind::Price)
            .with_price(50000.0)
            .with_ohlc(50200.0, 51000.0, 49000.0, 50500.0)
            .with_volume(0.0);
        assert!(messages(&record).is_empty());
    }

    #[test]
    fn test_negative_price() {
        let record = RecordView::new(RecordKind::Price).with_price(-1.0);
        assert_eq!(messages(&record), vec!["Price must be positive"]);
    }

    #[test]
    fn test_collects_every_issue() {
        let mut record = RecordView::new(RecordKind::Ohlcv)
            .with_ohlc(-5.0, 90.0, 100.0, 95.0)
            .with_volume(-3.0);
        record.dominance = Some(130.0);

        let found = messages(&record);
        assert_eq!(found.len(), 4);
        assert_eq!(found[0], "Open price must be positive");
        assert_eq!(found[1], "Volume must be non-negative");
        assert!(found[2].starts_with("Dominance must be between 0 and 100"));
        assert_eq!(found[3], "High (90) must be greater than or equal to low (100)");
    }

    #[test]
    fn test_open_and_close_bounds() {
        let record = RecordView::new(RecordKind::Ohlcv).with_ohlc(8.0, 12.0, 9.0, 12.5);
        let found = validate_record(3, &record);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].location, ViolationLocation::record(3, Some("open")));
        assert_eq!(found[1].location, ViolationLocation::record(3, Some("close")));
    }

    #[test]
    fn test_market_cap_must_be_positive() {
        let mut record = RecordView::new(RecordKind::Analytics);
        record.market_cap = Some(0.0);
        assert_eq!(messages(&record), vec!["Market capitalization must be positive"]);
    }
}
