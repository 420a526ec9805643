use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// OHLCV bar for one symbol
///
/// Series are always ordered oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Direction reported by a single indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
    Neutral,
}

/// Side of an actionable recommendation or an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TradeSide> for Direction {
    fn from(side: TradeSide) -> Self {
        match side {
            TradeSide::Buy => Direction::Buy,
            TradeSide::Sell => Direction::Sell,
        }
    }
}

/// Output of one indicator over one bar series
///
/// `strength` is always within [0, 100]; Neutral readings carry 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReading {
    pub direction: Direction,
    pub strength: f64,
    /// Value in the indicator's native unit (RSI points, MACD histogram, ...)
    pub raw_value: f64,
}

impl IndicatorReading {
    pub fn neutral(raw_value: f64) -> Self {
        Self {
            direction: Direction::Neutral,
            strength: 0.0,
            raw_value,
        }
    }

    /// Build a directional reading, clamping strength into [0, cap]
    pub fn directional(direction: Direction, strength: f64, cap: f64, raw_value: f64) -> Self {
        let cap = cap.clamp(0.0, 100.0);
        Self {
            direction,
            strength: strength.clamp(0.0, cap),
            raw_value,
        }
    }
}

/// Aggregated recommendation for one symbol in one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolAssessment {
    pub symbol: String,
    pub direction: TradeSide,
    pub strength: f64,
    /// Only readings that passed the confidence filter
    pub contributing: BTreeMap<String, IndicatorReading>,
    /// Last close of the evaluated series
    pub price: f64,
    pub evaluated_at: DateTime<Utc>,
}

/// One executed (or paper) trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub symbol: String,
    pub side: TradeSide,
    pub price: f64,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directional_reading_is_clamped() {
        let reading = IndicatorReading::directional(Direction::Buy, 140.0, 80.0, 12.0);
        assert_eq!(reading.strength, 80.0);

        let reading = IndicatorReading::directional(Direction::Sell, -5.0, 100.0, 90.0);
        assert_eq!(reading.strength, 0.0);
    }

    #[test]
    fn test_cap_never_exceeds_hundred() {
        let reading = IndicatorReading::directional(Direction::Buy, 250.0, 400.0, 0.0);
        assert_eq!(reading.strength, 100.0);
    }

    #[test]
    fn test_trade_side_serializes_lowercase() {
        let json = serde_json::to_string(&TradeSide::Sell).unwrap();
        assert_eq!(json, "\"sell\"");
        assert_eq!(Direction::from(TradeSide::Buy), Direction::Buy);
    }
}
