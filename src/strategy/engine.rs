use super::aggregator::SignalAggregator;
use super::signals::{validate_bars, SeriesError};
use super::Strategy;
use crate::indicators::IndicatorRegistry;
use crate::models::{Bar, IndicatorReading, SymbolAssessment};

/// Multi-indicator signal engine
///
/// Runs every registered indicator over the same bars, drops the ones that
/// report insufficient data, and hands the rest to the aggregator. Holds no
/// per-symbol state, so one engine can serve any number of symbols from a
/// sequential loop or from concurrent workers.
pub struct SignalEngine {
    registry: IndicatorRegistry,
    aggregator: SignalAggregator,
    expected_interval_secs: Option<u64>,
}

impl SignalEngine {
    pub fn new(registry: IndicatorRegistry, aggregator: SignalAggregator) -> Self {
        Self {
            registry,
            aggregator,
            expected_interval_secs: None,
        }
    }

    /// Reject series with gaps larger than 1.5x this interval
    pub fn with_expected_interval(mut self, interval_secs: u64) -> Self {
        self.expected_interval_secs = Some(interval_secs);
        self
    }

    pub fn registry(&self) -> &IndicatorRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &SignalAggregator {
        &self.aggregator
    }

    /// Every indicator that produced a reading, keyed by name
    pub fn readings(&self, symbol: &str, bars: &[Bar]) -> Vec<(&'static str, IndicatorReading)> {
        let mut readings = Vec::new();

        for (name, evaluation) in self.registry.evaluate_all(bars) {
            match evaluation {
                Ok(reading) => {
                    tracing::debug!(
                        symbol,
                        indicator = name,
                        direction = ?reading.direction,
                        strength = reading.strength,
                        raw = reading.raw_value,
                        "Indicator reading"
                    );
                    readings.push((name, reading));
                }
                Err(reason) => {
                    tracing::debug!(symbol, indicator = name, %reason, "Insufficient data");
                }
            }
        }

        readings
    }

    pub fn is_actionable(&self, assessment: &SymbolAssessment) -> bool {
        self.aggregator.is_actionable(assessment)
    }
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new(IndicatorRegistry::default(), SignalAggregator::default())
    }
}

impl Strategy for SignalEngine {
    fn assess(&self, symbol: &str, bars: &[Bar]) -> Result<Option<SymbolAssessment>, SeriesError> {
        validate_bars(bars, self.expected_interval_secs)?;

        let Some(last) = bars.last() else {
            return Ok(None);
        };

        let needed = self.registry.max_lookback();
        if bars.len() < needed {
            tracing::debug!(symbol, bars = bars.len(), needed, "Series shorter than lookback");
            return Ok(None);
        }

        let readings = self.readings(symbol, bars);
        let assessment = self
            .aggregator
            .aggregate(symbol, last.close, readings.iter().map(|(n, r)| (*n, r)));

        match &assessment {
            Some(a) => tracing::debug!(
                symbol,
                direction = %a.direction,
                strength = a.strength,
                contributing = a.contributing.len(),
                "Assessment"
            ),
            None => tracing::debug!(symbol, "No contributing signal"),
        }

        Ok(assessment)
    }

    fn name(&self) -> &str {
        "SignalEngine"
    }

    fn min_bars_required(&self) -> usize {
        self.registry.max_lookback()
    }
}
