use crate::models::{Direction, IndicatorReading, SymbolAssessment, TradeSide};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How equal Buy/Sell vote counts are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    Buy,
    Sell,
    /// No assessment on a tie
    Skip,
}

/// How contributing strengths are combined into the overall strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthCombine {
    /// Mean over every contributing reading
    Mean,
    /// Mean over readings that agree with the winning direction
    MajorityMean,
}

/// `[aggregator]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Readings at or below this strength are discarded
    pub confidence_threshold: f64,
    /// Assessments must be strictly above this strength to be acted on
    pub action_threshold: f64,
    pub tie_break: TieBreak,
    pub combine: StrengthCombine,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 50.0,
            action_threshold: 60.0,
            tie_break: TieBreak::Buy,
            combine: StrengthCombine::Mean,
        }
    }
}

/// Combines per-indicator readings into one recommendation per symbol
#[derive(Debug, Clone, Default)]
pub struct SignalAggregator {
    config: AggregatorConfig,
}

impl SignalAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Readings that clear the confidence filter
    pub fn contributing<'a, I>(&self, readings: I) -> BTreeMap<String, IndicatorReading>
    where
        I: IntoIterator<Item = (&'a str, &'a IndicatorReading)>,
    {
        readings
            .into_iter()
            .filter(|(_, r)| {
                r.direction != Direction::Neutral && r.strength > self.config.confidence_threshold
            })
            .map(|(name, r)| (name.to_string(), *r))
            .collect()
    }

    /// Aggregate readings for one symbol. `None` means no contributing signal.
    pub fn aggregate<'a, I>(&self, symbol: &str, price: f64, readings: I) -> Option<SymbolAssessment>
    where
        I: IntoIterator<Item = (&'a str, &'a IndicatorReading)>,
    {
        let contributing = self.contributing(readings);
        if contributing.is_empty() {
            return None;
        }

        let buys = contributing
            .values()
            .filter(|r| r.direction == Direction::Buy)
            .count();
        let sells = contributing.len() - buys;

        let direction = if buys > sells {
            TradeSide::Buy
        } else if sells > buys {
            TradeSide::Sell
        } else {
            match self.config.tie_break {
                TieBreak::Buy => TradeSide::Buy,
                TieBreak::Sell => TradeSide::Sell,
                TieBreak::Skip => return None,
            }
        };

        let strengths: Vec<f64> = match self.config.combine {
            StrengthCombine::Mean => contributing.values().map(|r| r.strength).collect(),
            StrengthCombine::MajorityMean => contributing
                .values()
                .filter(|r| r.direction == Direction::from(direction))
                .map(|r| r.strength)
                .collect(),
        };
        if strengths.is_empty() {
            return None;
        }
        let strength = strengths.iter().sum::<f64>() / strengths.len() as f64;

        Some(SymbolAssessment {
            symbol: symbol.to_string(),
            direction,
            strength,
            contributing,
            price,
            evaluated_at: Utc::now(),
        })
    }

    /// Whether the assessment should be forwarded to a notifier or order sink
    pub fn is_actionable(&self, assessment: &SymbolAssessment) -> bool {
        assessment.strength > self.config.action_threshold
    }
}
