use super::moving_average::calculate_ema;
use super::{closes, finite, require_bars, Evaluation, Indicator, InsufficientData};
use crate::models::{Bar, Direction, IndicatorReading};
use serde::{Deserialize, Serialize};

/// Fast/slow EMA crossover. Not enabled by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaCrossConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub max_strength: f64,
    pub strength_scale: f64,
}

impl Default for EmaCrossConfig {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            max_strength: 100.0,
            strength_scale: 1_000.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmaCrossIndicator {
    config: EmaCrossConfig,
}

impl EmaCrossIndicator {
    pub fn new(config: EmaCrossConfig) -> Self {
        Self { config }
    }
}

impl Indicator for EmaCrossIndicator {
    fn name(&self) -> &'static str {
        "ema_cross"
    }

    fn min_bars(&self) -> usize {
        self.config.fast_period.max(self.config.slow_period)
    }

    fn evaluate(&self, bars: &[Bar]) -> Evaluation {
        require_bars(bars, self.min_bars())?;
        let cfg = &self.config;
        let prices = closes(bars);

        let fast = calculate_ema(&prices, cfg.fast_period)
            .ok_or(InsufficientData::Undefined("fast ema period"))?;
        let slow = calculate_ema(&prices, cfg.slow_period)
            .ok_or(InsufficientData::Undefined("slow ema period"))?;
        if slow == 0.0 {
            return Err(InsufficientData::Undefined("slow ema is zero"));
        }

        let spread = finite(fast - slow, "ema spread")?;
        let strength = spread.abs() / slow.abs() * cfg.strength_scale;

        let reading = if spread > 0.0 {
            IndicatorReading::directional(Direction::Buy, strength, cfg.max_strength, spread)
        } else if spread < 0.0 {
            IndicatorReading::directional(Direction::Sell, strength, cfg.max_strength, spread)
        } else {
            IndicatorReading::neutral(spread)
        };

        Ok(reading)
    }
}
