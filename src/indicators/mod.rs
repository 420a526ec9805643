// Technical indicators module
// Each indicator maps a bar series to a directional reading or InsufficientData

pub mod bollinger;
pub mod ema_cross;
pub mod ichimoku;
pub mod macd;
pub mod moving_average;
pub mod registry;
pub mod rsi;
pub mod stochastic;
pub mod volume;

use crate::models::{Bar, IndicatorReading};
use thiserror::Error;

pub use bollinger::{BollingerConfig, BollingerIndicator};
pub use ema_cross::{EmaCrossConfig, EmaCrossIndicator};
pub use ichimoku::{IchimokuConfig, IchimokuIndicator};
pub use macd::{MacdConfig, MacdIndicator};
pub use moving_average::{calculate_ema, calculate_ema_series, calculate_sma, calculate_std_dev};
pub use registry::{IndicatorRegistry, IndicatorSettings};
pub use rsi::{calculate_rsi, RsiConfig, RsiIndicator};
pub use stochastic::{StochasticConfig, StochasticIndicator};
pub use volume::{VolumeConfig, VolumeIndicator};

/// Why an indicator could not produce a reading
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InsufficientData {
    #[error("need {needed} bars, got {got}")]
    TooFewBars { needed: usize, got: usize },

    #[error("undefined statistic: {0}")]
    Undefined(&'static str),

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// Result of evaluating one indicator
pub type Evaluation = Result<IndicatorReading, InsufficientData>;

/// A technical indicator evaluated over bars ordered oldest first
pub trait Indicator: Send + Sync {
    /// Registry key, e.g. "rsi"
    fn name(&self) -> &'static str;

    /// Minimum bars needed to produce a reading
    fn min_bars(&self) -> usize;

    fn evaluate(&self, bars: &[Bar]) -> Evaluation;
}

pub(crate) fn require_bars(bars: &[Bar], needed: usize) -> Result<(), InsufficientData> {
    if bars.len() < needed {
        return Err(InsufficientData::TooFewBars {
            needed,
            got: bars.len(),
        });
    }
    Ok(())
}

pub(crate) fn finite(value: f64, what: &'static str) -> Result<f64, InsufficientData> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InsufficientData::NonFinite(what))
    }
}

pub(crate) fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Highest high and lowest low of the given bars
pub(crate) fn high_low(bars: &[Bar]) -> Option<(f64, f64)> {
    let first = bars.first()?;
    Some(bars.iter().fold((first.high, first.low), |(hi, lo), b| {
        (hi.max(b.high), lo.min(b.low))
    }))
}
