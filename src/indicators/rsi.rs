use super::{closes, finite, require_bars, Evaluation, Indicator, InsufficientData};
use crate::models::{Bar, Direction, IndicatorReading};
use serde::{Deserialize, Serialize};

/// Calculate Relative Strength Index (RSI) with Wilder smoothing
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// Returns `None` when there are fewer than `period + 1` prices or when the
/// average loss is zero (relative strength undefined).
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let mut gains = Vec::with_capacity(prices.len() - 1);
    let mut losses = Vec::with_capacity(prices.len() - 1);

    for window in prices.windows(2) {
        let change = window[1] - window[0];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    // Seed with simple averages, then apply Wilder's smoothing
    let mut avg_gain: f64 = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss: f64 = losses[..period].iter().sum::<f64>() / period as f64;

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period as f64 - 1.0) + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + losses[i]) / period as f64;
    }

    if avg_loss == 0.0 {
        return None;
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiConfig {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub max_strength: f64,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
            max_strength: 100.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RsiIndicator {
    config: RsiConfig,
}

impl RsiIndicator {
    pub fn new(config: RsiConfig) -> Self {
        Self { config }
    }

    /// Raw RSI over the bars, for callers that only need the value
    pub fn value(&self, bars: &[Bar]) -> Result<f64, InsufficientData> {
        require_bars(bars, self.min_bars())?;
        let rsi = calculate_rsi(&closes(bars), self.config.period)
            .ok_or(InsufficientData::Undefined("rsi average loss is zero"))?;
        finite(rsi, "rsi")
    }

    /// Raw RSI where an all-gain or flat series reads as 100
    ///
    /// Only too few bars or a non-finite value remain errors.
    pub fn saturated_value(&self, bars: &[Bar]) -> Result<f64, InsufficientData> {
        match self.value(bars) {
            Err(InsufficientData::Undefined(_)) => Ok(100.0),
            other => other,
        }
    }
}

impl Indicator for RsiIndicator {
    fn name(&self) -> &'static str {
        "rsi"
    }

    fn min_bars(&self) -> usize {
        self.config.period + 1
    }

    fn evaluate(&self, bars: &[Bar]) -> Evaluation {
        let rsi = self.value(bars)?;
        let cfg = &self.config;

        let reading = if rsi < cfg.oversold {
            let strength = (cfg.oversold - rsi) / cfg.oversold * cfg.max_strength;
            IndicatorReading::directional(Direction::Buy, strength, cfg.max_strength, rsi)
        } else if rsi > cfg.overbought {
            let band = 100.0 - cfg.overbought;
            let strength = (rsi - cfg.overbought) / band * cfg.max_strength;
            IndicatorReading::directional(Direction::Sell, strength, cfg.max_strength, rsi)
        } else {
            IndicatorReading::neutral(rsi)
        };

        Ok(reading)
    }
}
