//! Ichimoku Tenkan/Kijun crossover
//!
//! Tenkan-sen and Kijun-sen are midpoints of the high/low range over 9 and 26
//! bars. Senkou Span A/B form the cloud, used only when `cloud_filter` is on.

use super::{finite, high_low, require_bars, Evaluation, Indicator, InsufficientData};
use crate::models::{Bar, Direction, IndicatorReading};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IchimokuConfig {
    pub tenkan_period: usize,
    pub kijun_period: usize,
    pub senkou_b_period: usize,
    pub max_strength: f64,
    pub strength_scale: f64,
    /// Buy only above the cloud, sell only below it
    pub cloud_filter: bool,
}

impl Default for IchimokuConfig {
    fn default() -> Self {
        Self {
            tenkan_period: 9,
            kijun_period: 26,
            senkou_b_period: 52,
            max_strength: 100.0,
            strength_scale: 1_000.0,
            cloud_filter: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IchimokuLines {
    pub tenkan: f64,
    pub kijun: f64,
    pub senkou_a: f64,
    pub senkou_b: f64,
}

fn midpoint(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let (high, low) = high_low(&bars[bars.len() - period..])?;
    Some((high + low) / 2.0)
}

pub fn calculate_ichimoku(bars: &[Bar], config: &IchimokuConfig) -> Option<IchimokuLines> {
    let tenkan = midpoint(bars, config.tenkan_period)?;
    let kijun = midpoint(bars, config.kijun_period)?;
    let senkou_b = midpoint(bars, config.senkou_b_period)?;

    Some(IchimokuLines {
        tenkan,
        kijun,
        senkou_a: (tenkan + kijun) / 2.0,
        senkou_b,
    })
}

#[derive(Debug, Clone, Default)]
pub struct IchimokuIndicator {
    config: IchimokuConfig,
}

impl IchimokuIndicator {
    pub fn new(config: IchimokuConfig) -> Self {
        Self { config }
    }
}

impl Indicator for IchimokuIndicator {
    fn name(&self) -> &'static str {
        "ichimoku"
    }

    fn min_bars(&self) -> usize {
        self.config
            .tenkan_period
            .max(self.config.kijun_period)
            .max(self.config.senkou_b_period)
    }

    fn evaluate(&self, bars: &[Bar]) -> Evaluation {
        require_bars(bars, self.min_bars())?;
        let cfg = &self.config;

        let lines = calculate_ichimoku(bars, cfg)
            .ok_or(InsufficientData::Undefined("ichimoku periods"))?;
        let spread = finite(lines.tenkan - lines.kijun, "ichimoku lines")?;

        let close = bars.last().map(|b| b.close).unwrap_or(0.0);
        if close == 0.0 {
            return Err(InsufficientData::Undefined("last close is zero"));
        }

        let cloud_top = lines.senkou_a.max(lines.senkou_b);
        let cloud_bottom = lines.senkou_a.min(lines.senkou_b);
        let strength = (close - lines.tenkan).abs() / close * cfg.strength_scale;

        let bullish = close > lines.tenkan
            && lines.tenkan > lines.kijun
            && (!cfg.cloud_filter || close > cloud_top);
        let bearish = close < lines.tenkan
            && lines.tenkan < lines.kijun
            && (!cfg.cloud_filter || close < cloud_bottom);

        let reading = if bullish {
            IndicatorReading::directional(Direction::Buy, strength, cfg.max_strength, spread)
        } else if bearish {
            IndicatorReading::directional(Direction::Sell, strength, cfg.max_strength, spread)
        } else {
            IndicatorReading::neutral(spread)
        };

        Ok(reading)
    }
}
