// Copyright 2025 Cowboy AI, LLC.

//! Arguments passed to read and write operations
//!
//! Arguments are opaque to the engine except for two hints: the date range a
//! range-based read requests, and how many items a batched call covers.
//! Implement [`Arguments`] for your own argument types; the defaults report
//! neither.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Requested time window of a range-based read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Create a range without validating it; the temporal law does that
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Range ending at `end` and spanning `span` backwards
    pub fn ending_at(end: DateTime<Utc>, span: Duration) -> Self {
        Self {
            start: end - span,
            end,
        }
    }

    /// Length of the range; negative when inverted
    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}

/// Hints the engine reads from operation arguments
pub trait Arguments: Clone + Send + Sync + 'static {
    /// Date range requested by a range-based read
    fn date_range(&self) -> Option<DateRange> {
        None
    }

    /// Number of items the call covers, when it covers several
    fn item_count(&self) -> Option<usize> {
        None
    }
}

impl Arguments for () {}
impl Arguments for String {}
impl Arguments for &'static str {}
impl Arguments for u64 {}

impl Arguments for DateRange {
    fn date_range(&self) -> Option<DateRange> {
        Some(*self)
    }
}

impl<T> Arguments for Vec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn item_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl Arguments for Value {
    fn date_range(&self) -> Option<DateRange> {
        let bound = |keys: &[&str]| {
            keys.iter().find_map(|key| {
                self.get(*key)
                    .and_then(Value::as_str)
                    .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
                    .map(|ts| ts.with_timezone(&Utc))
            })
        };
        Some(DateRange::new(bound(&["start", "from"])?, bound(&["end", "to"])?))
    }

    fn item_count(&self) -> Option<usize> {
        ["symbols", "ids"]
            .iter()
            .find_map(|key| self.get(*key).and_then(Value::as_array))
            .map(Vec::len)
    }
}

/// Arguments of a historical read for one symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalQuery {
    /// Instrument symbol
    pub symbol: String,
    /// Requested window
    pub range: DateRange,
}

impl HistoricalQuery {
    /// Create a historical query
    pub fn new(symbol: impl Into<String>, range: DateRange) -> Self {
        Self {
            symbol: symbol.into(),
            range,
        }
    }
}

impl Arguments for HistoricalQuery {
    fn date_range(&self) -> Option<DateRange> {
        Some(self.range)
    }
}

/// Arguments of a read covering several symbols in one call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchArgs {
    /// Instrument symbols
    pub symbols: Vec<String>,
}

impl BatchArgs {
    /// Batch over the given symbols
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

impl Arguments for BatchArgs {
    fn item_count(&self) -> Option<usize> {
        Some(self.symbols.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_json_arguments_expose_range_and_count() {
        let args = json!({
            "symbols": ["BTC", "ETH", "SOL"],
            "from": "2025-01-01T00:00:00Z",
            "to": "2025-01-02T00:00:00Z"
        });
        let range = args.date_range().expect("range");
        assert_eq!(range.span(), Duration::days(1));
        assert_eq!(args.item_count(), Some(3));

        assert!(json!({"start": "2025-01-01T00:00:00Z"}).date_range().is_none());
    }

    #[test]
    fn test_inverted_range_has_negative_span() {
        let start = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(DateRange::new(start, end).span() < Duration::zero());
        assert_eq!(
            DateRange::ending_at(end, Duration::hours(6)).start,
            Utc.with_ymd_and_hms(2024, 12, 31, 18, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_plain_arguments_report_nothing() {
        assert!(().date_range().is_none());
        assert!("BTC".date_range().is_none());
        assert_eq!(vec!["BTC", "ETH"].item_count(), Some(2));
        assert_eq!(BatchArgs::new(["BTC", "ETH", "SOL"]).item_count(), Some(3));
    }
}
