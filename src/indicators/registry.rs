//! Indicator registry: name -> configured indicator

use super::{
    BollingerConfig, BollingerIndicator, EmaCrossConfig, EmaCrossIndicator, Evaluation,
    IchimokuConfig, IchimokuIndicator, Indicator, MacdConfig, MacdIndicator, RsiConfig,
    RsiIndicator, StochasticConfig, StochasticIndicator, VolumeConfig, VolumeIndicator,
};
use crate::models::Bar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_INDICATORS: &[&str] =
    &["rsi", "macd", "bollinger", "stochastic", "ichimoku", "volume"];

pub const KNOWN_INDICATORS: &[&str] = &[
    "rsi",
    "macd",
    "bollinger",
    "stochastic",
    "ichimoku",
    "volume",
    "ema_cross",
];

/// `[indicators]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub enabled: Vec<String>,
    pub rsi: RsiConfig,
    pub macd: MacdConfig,
    pub bollinger: BollingerConfig,
    pub stochastic: StochasticConfig,
    pub ichimoku: IchimokuConfig,
    pub volume: VolumeConfig,
    pub ema_cross: EmaCrossConfig,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_INDICATORS.iter().map(|s| s.to_string()).collect(),
            rsi: RsiConfig::default(),
            macd: MacdConfig::default(),
            bollinger: BollingerConfig::default(),
            stochastic: StochasticConfig::default(),
            ichimoku: IchimokuConfig::default(),
            volume: VolumeConfig::default(),
            ema_cross: EmaCrossConfig::default(),
        }
    }
}

pub struct IndicatorRegistry {
    indicators: BTreeMap<&'static str, Box<dyn Indicator>>,
}

impl IndicatorRegistry {
    pub fn empty() -> Self {
        Self {
            indicators: BTreeMap::new(),
        }
    }

    /// Build the enabled indicators from configuration
    pub fn from_settings(settings: &IndicatorSettings) -> anyhow::Result<Self> {
        let mut registry = Self::empty();

        for name in &settings.enabled {
            let indicator: Box<dyn Indicator> = match name.as_str() {
                "rsi" => Box::new(RsiIndicator::new(settings.rsi.clone())),
                "macd" => Box::new(MacdIndicator::new(settings.macd.clone())),
                "bollinger" => Box::new(BollingerIndicator::new(settings.bollinger.clone())),
                "stochastic" => Box::new(StochasticIndicator::new(settings.stochastic.clone())),
                "ichimoku" => Box::new(IchimokuIndicator::new(settings.ichimoku.clone())),
                "volume" => Box::new(VolumeIndicator::new(settings.volume.clone())),
                "ema_cross" => Box::new(EmaCrossIndicator::new(settings.ema_cross.clone())),
                other => anyhow::bail!(
                    "Unknown indicator '{}' (known: {})",
                    other,
                    KNOWN_INDICATORS.join(", ")
                ),
            };
            registry.register(indicator);
        }

        if registry.is_empty() {
            anyhow::bail!("No indicators enabled");
        }

        Ok(registry)
    }

    /// Add or replace an indicator under its own name
    pub fn register(&mut self, indicator: Box<dyn Indicator>) {
        self.indicators.insert(indicator.name(), indicator);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.indicators.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Indicator> {
        self.indicators.get(name).map(|i| i.as_ref())
    }

    /// Largest lookback among registered indicators
    pub fn max_lookback(&self) -> usize {
        self.indicators
            .values()
            .map(|i| i.min_bars())
            .max()
            .unwrap_or(0)
    }

    /// Evaluate every indicator independently over the same bars
    pub fn evaluate_all(&self, bars: &[Bar]) -> BTreeMap<&'static str, Evaluation> {
        self.indicators
            .iter()
            .map(|(&name, indicator)| (name, indicator.evaluate(bars)))
            .collect()
    }
}

impl Default for IndicatorRegistry {
    fn default() -> Self {
        Self::from_settings(&IndicatorSettings::default())
            .unwrap_or_else(|_| Self::empty())
    }
}
