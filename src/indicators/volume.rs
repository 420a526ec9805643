use super::{finite, require_bars, Evaluation, Indicator, InsufficientData};
use crate::models::{Bar, Direction, IndicatorReading};
use serde::{Deserialize, Serialize};

/// Volume surge: current volume against the average of the preceding bars
///
/// Only ever reports Buy or Neutral.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub period: usize,
    pub surge_ratio: f64,
    pub max_strength: f64,
    /// Strength per unit of ratio above 1.0
    pub strength_scale: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            period: 20,
            surge_ratio: 1.5,
            max_strength: 100.0,
            strength_scale: 50.0,
        }
    }
}

/// Ratio of the last volume to the average of the `period` volumes before it
pub fn calculate_volume_ratio(volumes: &[f64], period: usize) -> Result<f64, InsufficientData> {
    if period == 0 || volumes.len() < period + 1 {
        return Err(InsufficientData::TooFewBars {
            needed: period + 1,
            got: volumes.len(),
        });
    }

    let current = volumes[volumes.len() - 1];
    let history = &volumes[volumes.len() - 1 - period..volumes.len() - 1];
    let average = history.iter().sum::<f64>() / period as f64;
    if average == 0.0 {
        return Err(InsufficientData::Undefined("average volume is zero"));
    }

    finite(current / average, "volume ratio")
}

#[derive(Debug, Clone, Default)]
pub struct VolumeIndicator {
    config: VolumeConfig,
}

impl VolumeIndicator {
    pub fn new(config: VolumeConfig) -> Self {
        Self { config }
    }
}

impl Indicator for VolumeIndicator {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn min_bars(&self) -> usize {
        self.config.period + 1
    }

    fn evaluate(&self, bars: &[Bar]) -> Evaluation {
        require_bars(bars, self.min_bars())?;
        let cfg = &self.config;

        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let ratio = calculate_volume_ratio(&volumes, cfg.period)?;

        if ratio > cfg.surge_ratio {
            let strength = (ratio - 1.0) * cfg.strength_scale;
            Ok(IndicatorReading::directional(
                Direction::Buy,
                strength,
                cfg.max_strength,
                ratio,
            ))
        } else {
            Ok(IndicatorReading::neutral(ratio))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::bars_from_closes;

    fn bars_with_volumes(volumes: &[f64]) -> Vec<Bar> {
        let mut bars = bars_from_closes(&vec![100.0; volumes.len()]);
        for (bar, &volume) in bars.iter_mut().zip(volumes) {
            bar.volume = volume;
        }
        bars
    }

    #[test]
    fn test_surge_is_buy() {
        let mut volumes = vec![1000.0; 20];
        volumes.push(3000.0);

        let reading = VolumeIndicator::default()
            .evaluate(&bars_with_volumes(&volumes))
            .unwrap();
        assert_eq!(reading.direction, Direction::Buy);
        assert_eq!(reading.raw_value, 3.0);
        assert_eq!(reading.strength, 100.0);
    }

    #[test]
    fn test_moderate_surge_strength() {
        let mut volumes = vec![1000.0; 20];
        volumes.push(2000.0);

        let reading = VolumeIndicator::default()
            .evaluate(&bars_with_volumes(&volumes))
            .unwrap();
        assert_eq!(reading.strength, 50.0);
    }

    #[test]
    fn test_ratio_at_threshold_is_neutral() {
        let mut volumes = vec![1000.0; 20];
        volumes.push(1500.0);

        let reading = VolumeIndicator::default()
            .evaluate(&bars_with_volumes(&volumes))
            .unwrap();
        assert_eq!(reading.direction, Direction::Neutral);
    }

    #[test]
    fn test_zero_average_is_insufficient() {
        let mut volumes = vec![0.0; 20];
        volumes.push(500.0);

        assert_eq!(
            VolumeIndicator::default().evaluate(&bars_with_volumes(&volumes)),
            Err(InsufficientData::Undefined("average volume is zero"))
        );
    }
}
