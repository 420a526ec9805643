//! Bollinger Bands indicator
//!
//! Middle Band = SMA(period)
//! Upper Band = Middle + (std_dev * standard deviation)
//! Lower Band = Middle - (std_dev * standard deviation)

use super::moving_average::{calculate_sma, calculate_std_dev};
use super::{closes, finite, require_bars, Evaluation, Indicator, InsufficientData};
use crate::models::{Bar, Direction, IndicatorReading};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn calculate_bands(prices: &[f64], period: usize, std_dev: f64) -> Option<Bands> {
    let middle = calculate_sma(prices, period)?;
    let sd = calculate_std_dev(prices, period)?;

    Some(Bands {
        upper: middle + std_dev * sd,
        middle,
        lower: middle - std_dev * sd,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerConfig {
    pub period: usize,
    pub std_dev: f64,
    pub max_strength: f64,
    /// Multiplier applied to the distance past the band as a fraction of close
    pub strength_scale: f64,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev: 2.0,
            max_strength: 100.0,
            strength_scale: 1_000.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BollingerIndicator {
    config: BollingerConfig,
}

impl BollingerIndicator {
    pub fn new(config: BollingerConfig) -> Self {
        Self { config }
    }
}

impl Indicator for BollingerIndicator {
    fn name(&self) -> &'static str {
        "bollinger"
    }

    fn min_bars(&self) -> usize {
        self.config.period
    }

    fn evaluate(&self, bars: &[Bar]) -> Evaluation {
        require_bars(bars, self.min_bars())?;
        let cfg = &self.config;

        let bands = calculate_bands(&closes(bars), cfg.period, cfg.std_dev)
            .ok_or(InsufficientData::Undefined("bollinger period"))?;
        let width = finite(bands.upper - bands.lower, "bollinger bands")?;
        if width == 0.0 {
            return Err(InsufficientData::Undefined("bollinger band width is zero"));
        }

        let close = bars.last().map(|b| b.close).unwrap_or(0.0);
        if close == 0.0 {
            return Err(InsufficientData::Undefined("last close is zero"));
        }

        // A close sitting exactly on a band has zero distance and stays Neutral
        let reading = if close < bands.lower {
            let strength = (bands.lower - close) / close * cfg.strength_scale;
            IndicatorReading::directional(Direction::Buy, strength, cfg.max_strength, close)
        } else if close > bands.upper {
            let strength = (close - bands.upper) / close * cfg.strength_scale;
            IndicatorReading::directional(Direction::Sell, strength, cfg.max_strength, close)
        } else {
            IndicatorReading::neutral(close)
        };

        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::bars_from_closes;

    #[test]
    fn test_bands_are_symmetric() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + (i % 5) as f64).collect();
        let bands = calculate_bands(&prices, 20, 2.0).unwrap();
        assert!((bands.upper - bands.middle - (bands.middle - bands.lower)).abs() < 1e-9);
    }

    #[test]
    fn test_flat_series_is_insufficient() {
        let bars = bars_from_closes(&[100.0; 25]);
        assert_eq!(
            BollingerIndicator::default().evaluate(&bars),
            Err(InsufficientData::Undefined("bollinger band width is zero"))
        );
    }

    #[test]
    fn test_close_below_lower_band_is_buy() {
        let mut prices: Vec<f64> = (0..24).map(|i| 100.0 + (i % 2) as f64).collect();
        prices.push(80.0);
        let bars = bars_from_closes(&prices);

        let reading = BollingerIndicator::default().evaluate(&bars).unwrap();
        assert_eq!(reading.direction, Direction::Buy);
        assert_eq!(reading.strength, 100.0);
    }

    #[test]
    fn test_close_above_upper_band_is_sell() {
        let mut prices: Vec<f64> = (0..24).map(|i| 100.0 + (i % 2) as f64).collect();
        prices.push(103.0);
        let bars = bars_from_closes(&prices);

        let reading = BollingerIndicator::default().evaluate(&bars).unwrap();
        assert_eq!(reading.direction, Direction::Sell);
        assert!(reading.strength > 0.0);
    }

    #[test]
    fn test_close_on_band_has_zero_strength() {
        // Alternating 98/102 has mean 100 and population sd exactly 2,
        // so with k = 1 the bands are exactly 98 and 102
        let indicator = BollingerIndicator::new(BollingerConfig {
            std_dev: 1.0,
            ..Default::default()
        });

        let on_upper: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 98.0 } else { 102.0 }).collect();
        let reading = indicator.evaluate(&bars_from_closes(&on_upper)).unwrap();
        assert_eq!(reading.direction, Direction::Neutral);
        assert_eq!(reading.strength, 0.0);

        let on_lower: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 102.0 } else { 98.0 }).collect();
        let reading = indicator.evaluate(&bars_from_closes(&on_lower)).unwrap();
        assert_eq!(reading.direction, Direction::Neutral);
        assert_eq!(reading.strength, 0.0);
    }
}
