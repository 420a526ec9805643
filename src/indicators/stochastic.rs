use super::{finite, high_low, require_bars, Evaluation, Indicator, InsufficientData};
use crate::models::{Bar, Direction, IndicatorReading};
use serde::{Deserialize, Serialize};

/// Stochastic oscillator
///
/// %K = (close - lowest low) / (highest high - lowest low) * 100 over `k_period` bars,
/// %D = simple average of the last `d_period` %K values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StochasticConfig {
    pub k_period: usize,
    pub d_period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub max_strength: f64,
    /// Also require %D beyond the threshold before reporting a direction
    pub require_d_confirmation: bool,
}

impl Default for StochasticConfig {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
            oversold: 20.0,
            overbought: 80.0,
            max_strength: 100.0,
            require_d_confirmation: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticValue {
    pub k: f64,
    pub d: f64,
}

/// %K and %D at the last bar
pub fn calculate_stochastic(
    bars: &[Bar],
    k_period: usize,
    d_period: usize,
) -> Result<StochasticValue, InsufficientData> {
    if k_period == 0 || d_period == 0 {
        return Err(InsufficientData::Undefined("stochastic periods"));
    }
    require_bars(bars, k_period + d_period - 1)?;

    let mut k_values = Vec::with_capacity(d_period);
    for end in (bars.len() - d_period + 1)..=bars.len() {
        let window = &bars[end - k_period..end];
        let (high, low) = high_low(window).ok_or(InsufficientData::Undefined("empty window"))?;
        let range = high - low;
        if range == 0.0 {
            return Err(InsufficientData::Undefined("stochastic range is zero"));
        }
        let close = window[window.len() - 1].close;
        k_values.push(finite((close - low) / range * 100.0, "stochastic %K")?);
    }

    let k = k_values[k_values.len() - 1];
    let d = k_values.iter().sum::<f64>() / d_period as f64;
    Ok(StochasticValue { k, d })
}

#[derive(Debug, Clone, Default)]
pub struct StochasticIndicator {
    config: StochasticConfig,
}

impl StochasticIndicator {
    pub fn new(config: StochasticConfig) -> Self {
        Self { config }
    }
}

impl Indicator for StochasticIndicator {
    fn name(&self) -> &'static str {
        "stochastic"
    }

    fn min_bars(&self) -> usize {
        self.config.k_period + self.config.d_period - 1
    }

    fn evaluate(&self, bars: &[Bar]) -> Evaluation {
        let cfg = &self.config;
        let StochasticValue { k, d } = calculate_stochastic(bars, cfg.k_period, cfg.d_period)?;

        let oversold = k < cfg.oversold && (!cfg.require_d_confirmation || d < cfg.oversold);
        let overbought =
            k > cfg.overbought && (!cfg.require_d_confirmation || d > cfg.overbought);

        let reading = if oversold {
            let strength = (cfg.oversold - k) / cfg.oversold * cfg.max_strength;
            IndicatorReading::directional(Direction::Buy, strength, cfg.max_strength, k)
        } else if overbought {
            let band = 100.0 - cfg.overbought;
            let strength = (k - cfg.overbought) / band * cfg.max_strength;
            IndicatorReading::directional(Direction::Sell, strength, cfg.max_strength, k)
        } else {
            IndicatorReading::neutral(k)
        };

        Ok(reading)
    }
}
