// Copyright 2025 Cowboy AI, LLC.

//! Payloads exchanged between the read and write steps
//!
//! The engine never looks inside a payload directly. A payload describes
//! itself through [`Payload`]: how many items it carries and which market
//! records (if any) the attribution, freshness and validation laws apply to.
//! Types that are not market data simply report no records.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How many items an operation produces or accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Exactly one item
    Single,
    /// A sequence of items
    Sequence,
    /// Only known at runtime (dynamically typed payloads)
    Dynamic,
}

impl Cardinality {
    /// Dynamic cardinality is compatible with anything; otherwise both sides must agree
    pub fn is_compatible_with(self, other: Cardinality) -> bool {
        self == Cardinality::Dynamic || other == Cardinality::Dynamic || self == other
    }

    /// Name used in messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::Single => "single",
            Cardinality::Sequence => "sequence",
            Cardinality::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance carried by every market record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    /// Data source identifier
    pub source: String,
    /// Exchange or other origin identifier
    pub exchange_id: String,
    /// When the source last updated the data
    pub last_updated: DateTime<Utc>,
}

impl Attribution {
    /// Create an attribution triple
    pub fn new(
        source: impl Into<String>,
        exchange_id: impl Into<String>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            exchange_id: exchange_id.into(),
            last_updated,
        }
    }
}

/// What a market record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A price point, possibly with a day range
    Price,
    /// An OHLCV candle
    Ohlcv,
    /// Market-wide analytics (capitalisation, dominance)
    Analytics,
    /// Attributed data with no numeric fields the laws know about
    #[default]
    Generic,
}

/// Flattened, law-facing view of one market record
///
/// Every field is optional so a view can describe incomplete data; the laws
/// decide what absence means.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordView {
    /// Record kind
    pub kind: RecordKind,
    /// Source identifier
    pub source: Option<String>,
    /// Origin identifier
    pub exchange_id: Option<String>,
    /// Last update timestamp
    pub last_updated: Option<DateTime<Utc>>,
    /// Spot price
    pub price: Option<f64>,
    /// Opening price
    pub open: Option<f64>,
    /// High price
    pub high: Option<f64>,
    /// Low price
    pub low: Option<f64>,
    /// Closing price
    pub close: Option<f64>,
    /// Traded volume
    pub volume: Option<f64>,
    /// Market capitalisation
    pub market_cap: Option<f64>,
    /// Dominance percentage
    pub dominance: Option<f64>,
    /// Position within the enclosing payload, when it differs from the
    /// record's index among all records
    pub position: Option<usize>,
}

impl RecordView {
    /// Empty view of the given kind
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// View pre-filled with an attribution triple
    pub fn attributed(kind: RecordKind, attribution: &Attribution) -> Self {
        Self {
            kind,
            source: Some(attribution.source.clone()),
            exchange_id: Some(attribution.exchange_id.clone()),
            last_updated: Some(attribution.last_updated),
            ..Self::default()
        }
    }

    /// Set the spot price
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Set open, high, low and close together
    pub fn with_ohlc(mut self, open: f64, high: f64, low: f64, close: f64) -> Self {
        self.open = Some(open);
        self.high = Some(high);
        self.low = Some(low);
        self.close = Some(close);
        self
    }

    /// Set the traded volume
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Index violations on this record are reported at
    pub fn position_or(&self, index: usize) -> usize {
        self.position.unwrap_or(index)
    }

    /// The full attribution triple, if every part is present and non-blank
    pub fn attribution(&self) -> Option<Attribution> {
        let source = non_blank(self.source.as_deref())?;
        let exchange_id = non_blank(self.exchange_id.as_deref())?;
        let last_updated = self.last_updated?;
        Some(Attribution::new(source, exchange_id, last_updated))
    }

    /// Names of the attribution fields that are absent or blank
    pub fn missing_attribution(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if non_blank(self.source.as_deref()).is_none() {
            missing.push("source");
        }
        if non_blank(self.exchange_id.as_deref()).is_none() {
            missing.push("exchangeId");
        }
        if self.last_updated.is_none() {
            missing.push("lastUpdated");
        }
        missing
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Self-description every payload provides to the engine
pub trait Payload: Send + Sync + 'static {
    /// Cardinality known from the type alone
    fn cardinality() -> Cardinality
    where
        Self: Sized,
    {
        Cardinality::Single
    }

    /// Cardinality of this particular value
    fn observed_cardinality(&self) -> Cardinality
    where
        Self: Sized,
    {
        Self::cardinality()
    }

    /// Market records the payload-level laws are evaluated against
    fn records(&self) -> Vec<RecordView> {
        Vec::new()
    }

    /// Dynamically typed parts of the payload, checked against the write's
    /// shape at runtime
    ///
    /// A JSON value is its own single item; containers forward the items of
    /// their elements.
    fn json_items(&self) -> Vec<&Value> {
        Vec::new()
    }
}

impl<T: Payload> Payload for Vec<T> {
    fn cardinality() -> Cardinality {
        Cardinality::Sequence
    }

    fn records(&self) -> Vec<RecordView> {
        self.iter()
            .enumerate()
            .flat_map(|(index, item)| {
                let mut records = item.records();
                if let [record] = records.as_mut_slice() {
                    record.position.get_or_insert(index);
                }
                records
            })
            .collect()
    }

    fn json_items(&self) -> Vec<&Value> {
        self.iter().flat_map(Payload::json_items).collect()
    }
}

impl<T: Payload> Payload for Option<T> {
    fn cardinality() -> Cardinality {
        T::cardinality()
    }

    fn records(&self) -> Vec<RecordView> {
        self.as_ref().map(Payload::records).unwrap_or_default()
    }

    fn json_items(&self) -> Vec<&Value> {
        self.iter().flat_map(Payload::json_items).collect()
    }
}

macro_rules! opaque_payload {
    ($($ty:ty),* $(,)?) => {
        $(impl Payload for $ty {})*
    };
}

opaque_payload!((), bool, String, u32, u64, i64, usize, f64);

impl Payload for Value {
    fn cardinality() -> Cardinality {
        Cardinality::Dynamic
    }

    fn observed_cardinality(&self) -> Cardinality {
        match self {
            Value::Array(_) => Cardinality::Sequence,
            _ => Cardinality::Single,
        }
    }

    fn records(&self) -> Vec<RecordView> {
        match self {
            Value::Object(map) => record_from_json(map).into_iter().collect(),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| {
                    let mut record = record_from_json(item.as_object()?)?;
                    record.position = Some(index);
                    Some(record)
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn json_items(&self) -> Vec<&Value> {
        vec![self]
    }
}

/// Build a record view from a JSON object
///
/// Accepts both camelCase and snake_case keys. Timestamps may be RFC 3339
/// strings or epoch milliseconds. Objects that carry neither attribution nor
/// any known numeric field are not market records and yield `None`.
pub fn record_from_json(map: &Map<String, Value>) -> Option<RecordView> {
    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    };
    let number = |keys: &[&str]| keys.iter().find_map(|key| map.get(*key).and_then(Value::as_f64));

    let mut view = RecordView {
        kind: RecordKind::Generic,
        source: text(&["source"]),
        exchange_id: text(&["exchangeId", "exchange_id", "exchange"]),
        last_updated: ["lastUpdated", "last_updated", "timestamp"]
            .iter()
            .find_map(|key| map.get(*key).and_then(timestamp_from_json)),
        price: number(&["price"]),
        open: number(&["open"]),
        high: number(&["high"]),
        low: number(&["low"]),
        close: number(&["close"]),
        volume: number(&["volume"]),
        market_cap: number(&["marketCap", "market_cap"]),
        dominance: number(&["dominance"]),
        position: None,
    };

    view.kind = if view.open.is_some() && view.close.is_some() && view.price.is_none() {
        RecordKind::Ohlcv
    } else if view.price.is_some() {
        RecordKind::Price
    } else if view.market_cap.is_some() || view.dominance.is_some() {
        RecordKind::Analytics
    } else {
        RecordKind::Generic
    };

    let has_attribution = view.source.is_some()
        || view.exchange_id.is_some()
        || map.contains_key("lastUpdated")
        || map.contains_key("last_updated");
    let has_numbers = view.price.is_some()
        || view.open.is_some()
        || view.high.is_some()
        || view.low.is_some()
        || view.close.is_some()
        || view.volume.is_some()
        || view.market_cap.is_some()
        || view.dominance.is_some();

    (has_attribution || has_numbers).then_some(view)
}

fn timestamp_from_json(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(number) => number
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}
