//! MACD (Moving Average Convergence Divergence)
//!
//! MACD line = EMA(fast) - EMA(slow), signal = EMA(signal) of the MACD line,
//! histogram = MACD - signal. Strength is the histogram as a fraction of the
//! last close, scaled.

use super::moving_average::{calculate_ema, calculate_ema_series};
use super::{closes, finite, require_bars, Evaluation, Indicator, InsufficientData};
use crate::models::{Bar, Direction, IndicatorReading};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line, signal line and histogram at the last close
pub fn calculate_macd(
    prices: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Option<MacdValue> {
    if fast_period == 0 || fast_period >= slow_period || signal_period == 0 {
        return None;
    }

    let fast = calculate_ema_series(prices, fast_period);
    let slow = calculate_ema_series(prices, slow_period);
    if slow.is_empty() {
        return None;
    }

    // fast[i] is aligned to prices[fast_period - 1 + i]
    let offset = slow_period - fast_period;
    let macd_line: Vec<f64> = slow
        .iter()
        .enumerate()
        .map(|(i, slow_ema)| fast[i + offset] - slow_ema)
        .collect();

    let signal = calculate_ema(&macd_line, signal_period)?;
    let macd = *macd_line.last()?;

    Some(MacdValue {
        macd,
        signal,
        histogram: macd - signal,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
    pub max_strength: f64,
    /// Multiplier applied to |histogram| / close
    pub strength_scale: f64,
    /// Report Buy/Sell on every evaluation, never Neutral
    pub always_directional: bool,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
            max_strength: 100.0,
            strength_scale: 10_000.0,
            always_directional: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MacdIndicator {
    config: MacdConfig,
}

impl MacdIndicator {
    pub fn new(config: MacdConfig) -> Self {
        Self { config }
    }
}

impl Indicator for MacdIndicator {
    fn name(&self) -> &'static str {
        "macd"
    }

    fn min_bars(&self) -> usize {
        self.config.slow_period + self.config.signal_period - 1
    }

    fn evaluate(&self, bars: &[Bar]) -> Evaluation {
        require_bars(bars, self.min_bars())?;
        let cfg = &self.config;

        let value = calculate_macd(
            &closes(bars),
            cfg.fast_period,
            cfg.slow_period,
            cfg.signal_period,
        )
        .ok_or(InsufficientData::Undefined("macd periods"))?;
        let histogram = finite(value.histogram, "macd histogram")?;

        let last_close = bars.last().map(|b| b.close).unwrap_or(0.0);
        if last_close == 0.0 {
            return Err(InsufficientData::Undefined("last close is zero"));
        }

        let strength = finite(
            histogram.abs() / last_close * cfg.strength_scale,
            "macd strength",
        )?;

        let direction = if histogram > 0.0 && value.macd > value.signal {
            Direction::Buy
        } else if histogram < 0.0 && value.macd < value.signal {
            Direction::Sell
        } else if cfg.always_directional {
            Direction::Buy
        } else {
            return Ok(IndicatorReading::neutral(histogram));
        };

        Ok(IndicatorReading::directional(
            direction,
            strength,
            cfg.max_strength,
            histogram,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::bars_from_closes;

    #[test]
    fn test_requires_slow_plus_signal_bars() {
        let indicator = MacdIndicator::default();
        assert_eq!(indicator.min_bars(), 34);

        let bars = bars_from_closes(&[100.0; 33]);
        assert!(matches!(
            indicator.evaluate(&bars),
            Err(InsufficientData::TooFewBars { needed: 34, got: 33 })
        ));
    }

    #[test]
    fn test_accelerating_uptrend_is_buy() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64).powi(2) * 0.05).collect();
        let bars = bars_from_closes(&prices);

        let reading = MacdIndicator::default().evaluate(&bars).unwrap();
        assert_eq!(reading.direction, Direction::Buy);
        assert!(reading.raw_value > 0.0);
        assert!(reading.strength > 0.0 && reading.strength <= 100.0);
    }

    #[test]
    fn test_accelerating_downtrend_is_sell() {
        let prices: Vec<f64> = (0..60).map(|i| 300.0 - (i as f64).powi(2) * 0.05).collect();
        let bars = bars_from_closes(&prices);

        let reading = MacdIndicator::default().evaluate(&bars).unwrap();
        assert_eq!(reading.direction, Direction::Sell);
        assert!(reading.raw_value < 0.0);
    }

    #[test]
    fn test_flat_series_is_neutral_unless_always_directional() {
        let bars = bars_from_closes(&[100.0; 50]);

        let reading = MacdIndicator::default().evaluate(&bars).unwrap();
        assert_eq!(reading.direction, Direction::Neutral);
        assert_eq!(reading.strength, 0.0);

        let strict = MacdIndicator::new(MacdConfig {
            always_directional: true,
            ..Default::default()
        });
        let reading = strict.evaluate(&bars).unwrap();
        assert_eq!(reading.direction, Direction::Buy);
        assert_eq!(reading.strength, 0.0);
    }

    #[test]
    fn test_calculate_macd_rejects_inverted_periods() {
        let prices = vec![100.0; 50];
        assert!(calculate_macd(&prices, 26, 12, 9).is_none());
    }
}
