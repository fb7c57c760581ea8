//! Relay message shapes
//!
//! The relay re-broadcasts exchange liquidations as JSON text frames:
//! - `{"type":"liquidation","data":{...}}` - one event
//! - `{"type":"liquidations","data":[...]}` - snapshot/batch
//! - `{"type":"stats","data":{...}}` - running aggregates for the sidebar
//! - `{"type":"candles","data":[...]}` - price history for the background
//! - `{"type":"candle","data":{...}}` - newest closed bar

use std::collections::VecDeque;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Liquidated position direction.
///
/// Exchanges report the liquidation order side: a forced SELL closes a long,
/// a forced BUY closes a short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[serde(alias = "LONG", alias = "Long", alias = "sell", alias = "SELL", alias = "Sell")]
    Long,
    #[serde(alias = "SHORT", alias = "Short", alias = "buy", alias = "BUY", alias = "Buy")]
    Short,
}

/// One liquidation as delivered by the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationEvent {
    /// Stable source identifier
    pub id: String,
    /// Exchange timestamp (Unix ms)
    #[serde(alias = "time")]
    pub timestamp: f64,
    /// Exchange ticker, e.g. `BTCUSDT`
    #[serde(default)]
    pub symbol: String,
    pub side: Side,
    /// Position size in base units
    #[serde(default, alias = "quantity")]
    pub size: f64,
    #[serde(default)]
    pub price: f64,
    /// USD value; filled from `size * price` when the relay omits it
    #[serde(default)]
    pub value: f64,
}

impl LiquidationEvent {
    /// Fill in the USD value when missing
    pub fn normalized(mut self) -> Self {
        if self.value <= 0.0 {
            self.value = self.size * self.price;
        }
        self
    }

    /// Composite dedup key (source id, timestamp, value)
    pub fn dedup_key(&self) -> String {
        format!("{}-{}-{}", self.id, self.timestamp as i64, self.value.round() as i64)
    }

    /// A usable event names a symbol and carries a positive value
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty()
            && !self.symbol.trim().is_empty()
            && self.value.is_finite()
            && self.value > 0.0
            && self.timestamp.is_finite()
    }
}

/// Maximum number of volume buckets kept for the sidebar chart
pub const MAX_VOLUME_BUCKETS: usize = 60;
/// Width of one volume bucket (ms)
pub const VOLUME_BUCKET_MS: f64 = 60_000.0;

/// Liquidation volume within one time bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeBucket {
    /// Bucket start (Unix ms)
    pub timestamp: f64,
    pub long_usd: f64,
    pub short_usd: f64,
}

/// Running aggregates displayed next to the scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregateStats {
    pub total_long_usd: f64,
    pub total_short_usd: f64,
    /// Liquidations currently on screen, as counted by the producer
    pub active_count: u32,
    /// Long/short share of total volume, in percent
    pub ratio: (f64, f64),
    /// Recent volume, oldest first
    pub volume_buckets: VecDeque<VolumeBucket>,
}

impl AggregateStats {
    /// Fold one liquidation into the totals (used when the relay sends no stats)
    pub fn record(&mut self, event: &LiquidationEvent) {
        match event.side {
            Side::Long => self.total_long_usd += event.value,
            Side::Short => self.total_short_usd += event.value,
        }

        let total = self.total_long_usd + self.total_short_usd;
        if total > 0.0 {
            let long = self.total_long_usd / total * 100.0;
            self.ratio = (long, 100.0 - long);
        }

        let start = (event.timestamp / VOLUME_BUCKET_MS).floor() * VOLUME_BUCKET_MS;
        if self
            .volume_buckets
            .back()
            .is_none_or(|last| last.timestamp != start)
        {
            self.volume_buckets.push_back(VolumeBucket {
                timestamp: start,
                long_usd: 0.0,
                short_usd: 0.0,
            });
            while self.volume_buckets.len() > MAX_VOLUME_BUCKETS {
                self.volume_buckets.pop_front();
            }
        }
        if let Some(bucket) = self.volume_buckets.back_mut() {
            match event.side {
                Side::Long => bucket.long_usd += event.value,
                Side::Short => bucket.short_usd += event.value,
            }
        }
    }
}

/// One OHLC bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// Relay message decoding failure
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed relay message: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A decoded relay frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum RelayMessage {
    Liquidation(LiquidationEvent),
    #[serde(deserialize_with = "lenient_batch")]
    Liquidations(Vec<LiquidationEvent>),
    Stats(AggregateStats),
    Candles(Vec<Candle>),
    Candle(Candle),
}

/// Decode a batch element by element, dropping the ones that don't parse
fn lenient_batch<'de, D>(deserializer: D) -> Result<Vec<LiquidationEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let total = raw.len();
    let events: Vec<LiquidationEvent> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(event) => Some(event),
            Err(e) => {
                log::debug!("Skipping batch entry: {}", e);
                None
            }
        })
        .collect();
    if events.len() < total {
        log::warn!("Dropped {} of {} batch entries", total - events.len(), total);
    }
    Ok(events)
}

/// Delay schedule for reopening the relay socket: doubles per failed
/// attempt up to a cap, starts over after a successful open
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial_ms: u32,
    max_ms: u32,
    attempt: u32,
}

/// First reconnect delay (ms)
pub const RECONNECT_INITIAL_MS: u32 = 1_000;
/// Reconnect delay ceiling (ms)
pub const RECONNECT_MAX_MS: u32 = 30_000;

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(RECONNECT_INITIAL_MS, RECONNECT_MAX_MS)
    }
}

impl ReconnectBackoff {
    pub fn new(initial_ms: u32, max_ms: u32) -> Self {
        Self {
            initial_ms,
            max_ms,
            attempt: 0,
        }
    }

    /// Delay before the next attempt; advances the schedule
    pub fn next_delay_ms(&mut self) -> u32 {
        let factor = 2u32.saturating_pow(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.initial_ms.saturating_mul(factor).min(self.max_ms)
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl RelayMessage {
    /// Decode one text frame
    pub fn decode(text: &str) -> Result<Self, FeedError> {
        let message = match serde_json::from_str::<RelayMessage>(text)? {
            RelayMessage::Liquidation(event) => RelayMessage::Liquidation(event.normalized()),
            RelayMessage::Liquidations(events) => RelayMessage::Liquidations(
                events.into_iter().map(LiquidationEvent::normalized).collect(),
            ),
            other => other,
        };
        Ok(message)
    }

    /// Liquidations carried by this message (empty for stats and candles)
    pub fn into_events(self) -> Vec<LiquidationEvent> {
        match self {
            RelayMessage::Liquidation(event) => vec![event],
            RelayMessage::Liquidations(events) => events,
            RelayMessage::Stats(_) | RelayMessage::Candles(_) | RelayMessage::Candle(_) => {
                Vec::new()
            }
        }
    }
}
