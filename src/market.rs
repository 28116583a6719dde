// Copyright 2025 Cowboy AI, LLC.

//! Attributed market-data payloads
//!
//! Concrete record types the engine understands out of the box. They carry
//! the attribution triple as plain fields and expose themselves to the laws
//! through [`Payload`]. Construction does not validate: numeric invariants
//! are the job of the market-data law, so invalid records can be built,
//! passed through a combination and rejected with a complete violation list.
//!
//! | Type | Record kind |
//! |------|-------------|
//! | [`PriceRecord`] | spot price, optional day range |
//! | [`Candle`] | OHLCV candle for one interval |
//! | [`MarketSnapshot`] | market-wide analytics |

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::payload::{Attribution, Payload, RecordKind, RecordView};

/// Spot price for a symbol with optional day range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    /// Instrument symbol
    pub symbol: String,
    /// Last traded price
    pub price: f64,
    /// Day open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    /// Day high
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    /// Day low
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    /// Last close
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<f64>,
    /// Traded volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Data source
    pub source: String,
    /// Exchange the price was observed on
    pub exchange_id: String,
    /// Last update time at the source
    pub last_updated: DateTime<Utc>,
}

impl PriceRecord {
    /// Create a price record
    pub fn new(symbol: impl Into<String>, price: f64, attribution: Attribution) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
            source: attribution.source,
            exchange_id: attribution.exchange_id,
            last_updated: attribution.last_updated,
        }
    }

    /// Attach the day range
    pub fn with_range(mut self, open: f64, high: f64, low: f64, close: f64) -> Self {
        self.open = Some(open);
        self.high = Some(high);
        self.low = Some(low);
        self.close = Some(close);
        self
    }

    /// Attach the traded volume
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Provenance of this record
    pub fn attribution(&self) -> Attribution {
        Attribution::new(&self.source, &self.exchange_id, self.last_updated)
    }
}

impl Payload for PriceRecord {
    fn records(&self) -> Vec<RecordView> {
        vec![RecordView {
            price: Some(self.price),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            ..attributed_view(RecordKind::Price, &self.source, &self.exchange_id, self.last_updated)
        }]
    }
}

/// OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    /// Instrument symbol
    pub symbol: String,
    /// Start of the candle interval
    pub open_time: DateTime<Utc>,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Traded volume
    pub volume: f64,
    /// Data source
    pub source: String,
    /// Exchange the candle was built from
    pub exchange_id: String,
    /// Last update time at the source
    pub last_updated: DateTime<Utc>,
}

impl Candle {
    /// Create a candle
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        open_time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        attribution: Attribution,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            open_time,
            open,
            high,
            low,
            close,
            volume,
            source: attribution.source,
            exchange_id: attribution.exchange_id,
            last_updated: attribution.last_updated,
        }
    }

    /// Provenance of this candle
    pub fn attribution(&self) -> Attribution {
        Attribution::new(&self.source, &self.exchange_id, self.last_updated)
    }
}

impl Payload for Candle {
    fn records(&self) -> Vec<RecordView> {
        vec![RecordView {
            open: Some(self.open),
            high: Some(self.high),
            low: Some(self.low),
            close: Some(self.close),
            volume: Some(self.volume),
            ..attributed_view(RecordKind::Ohlcv, &self.source, &self.exchange_id, self.last_updated)
        }]
    }
}

/// Market-wide analytics snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    /// Total market capitalisation
    pub market_cap: f64,
    /// Share of the leading asset, in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominance: Option<f64>,
    /// 24h traded volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_volume: Option<f64>,
    /// Data source
    pub source: String,
    /// Aggregator or exchange identifier
    pub exchange_id: String,
    /// Last update time at the source
    pub last_updated: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Create a snapshot
    pub fn new(market_cap: f64, attribution: Attribution) -> Self {
        Self {
            market_cap,
            dominance: None,
            total_volume: None,
            source: attribution.source,
            exchange_id: attribution.exchange_id,
            last_updated: attribution.last_updated,
        }
    }

    /// Attach the dominance percentage
    pub fn with_dominance(mut self, dominance: f64) -> Self {
        self.dominance = Some(dominance);
        self
    }

    /// Attach the total volume
    pub fn with_total_volume(mut self, volume: f64) -> Self {
        self.total_volume = Some(volume);
        self
    }
}

impl Payload for MarketSnapshot {
    fn records(&self) -> Vec<RecordView> {
        vec![RecordView {
            market_cap: Some(self.market_cap),
            dominance: self.dominance,
            volume: self.total_volume,
            ..attributed_view(RecordKind::Analytics, &self.source, &self.exchange_id, self.last_updated)
        }]
    }
}

fn attributed_view(
    kind: RecordKind,
    source: &str,
    exchange_id: &str,
    last_updated: DateTime<Utc>,
) -> RecordView {
    RecordView {
        kind,
        source: Some(source.to_string()),
        exchange_id: Some(exchange_id.to_string()),
        last_updated: Some(last_updated),
        ..RecordView::default()
    }
}
