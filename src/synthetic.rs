use crate::models::Bar;
use chrono::{DateTime, Duration, DurationRound, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Bars at the end of a series that carry the crash or rally move
pub const SHOCK_BARS: usize = 5;

/// Market scenario types for synthetic bar generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Steady uptrend with noise
    Uptrend,
    /// Steady downtrend with noise
    Downtrend,
    /// Choppy market pulled back toward the starting price
    Sideways,
    /// Sideways, then a sharp drop over the last bars on rising volume
    Crash,
    /// Sideways, then a sharp rise over the last bars on rising volume
    Rally,
}

/// Seeded generator of OHLCV series for demos and tests
pub struct SyntheticBars {
    rng: StdRng,
    base_price: f64,
    base_volume: f64,
}

impl SyntheticBars {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 100.0,
            base_volume: 1_000.0,
        }
    }

    pub fn with_base_price(mut self, base_price: f64) -> Self {
        self.base_price = base_price;
        self
    }

    /// Generate bars for a scenario
    ///
    /// # Arguments
    /// * `scenario` - The market scenario to simulate
    /// * `num_bars` - Number of bars to generate
    /// * `interval_minutes` - Minutes between bars
    ///
    /// # Returns
    /// Bars ordered oldest first, the last one ending at the current hour
    pub fn generate(&mut self, scenario: Scenario, num_bars: usize, interval_minutes: i64) -> Vec<Bar> {
        let interval = Duration::minutes(interval_minutes.max(1));
        let now = Utc::now();
        let end = now.duration_trunc(Duration::hours(1)).unwrap_or(now);
        let start = end - interval * num_bars as i32;

        let mut bars = Vec::with_capacity(num_bars);
        let mut price = self.base_price;
        let shock_start = num_bars.saturating_sub(SHOCK_BARS);

        for i in 0..num_bars {
            let timestamp = start + interval * (i as i32 + 1);
            let mut volume_factor = 1.0;

            price = match scenario {
                Scenario::Uptrend => self.trend_step(price, 0.004),
                Scenario::Downtrend => self.trend_step(price, -0.004),
                Scenario::Sideways => self.sideways_step(price),
                Scenario::Crash | Scenario::Rally if i >= shock_start => {
                    // Volume ramps up 2x, 3x, ... through the move
                    volume_factor = (i - shock_start + 2) as f64;
                    let direction = if scenario == Scenario::Crash { -1.0 } else { 1.0 };
                    let noise = self.rng.gen_range(-0.005..0.005);
                    price * (1.0 + direction * 0.06 + noise)
                }
                Scenario::Crash | Scenario::Rally => self.sideways_step(price),
            };

            bars.push(self.create_bar(price, timestamp, volume_factor));
        }

        bars
    }

    fn trend_step(&mut self, price: f64, drift: f64) -> f64 {
        let noise = self.rng.gen_range(-0.002..0.002);
        price * (1.0 + drift + noise)
    }

    /// Mean-reverting random walk around the base price
    fn sideways_step(&mut self, price: f64) -> f64 {
        let reversion = (self.base_price - price) * 0.1;
        let noise = price * self.rng.gen_range(-0.01..0.01);
        price + reversion + noise
    }

    fn create_bar(&mut self, close: f64, timestamp: DateTime<Utc>, volume_factor: f64) -> Bar {
        let noise_pct = 0.002; // ±0.2% intrabar movement

        let high = close * (1.0 + self.rng.gen_range(0.0..noise_pct));
        let low = close * (1.0 - self.rng.gen_range(0.0..noise_pct));
        let open = (close * (1.0 + self.rng.gen_range(-noise_pct..noise_pct))).clamp(low, high);

        // Vary volume ±30%
        let volume = self.base_volume * volume_factor * self.rng.gen_range(0.7..1.3);

        Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::validate_bars;

    #[test]
    fn test_trends() {
        let mut gen = SyntheticBars::new(42);
        let up = gen.generate(Scenario::Uptrend, 200, 60);
        let down = gen.generate(Scenario::Downtrend, 200, 60);

        assert!(up.last().unwrap().close > up[0].close);
        assert!(down.last().unwrap().close < down[0].close);
    }

    #[test]
    fn test_sideways_stays_near_base() {
        let mut gen = SyntheticBars::new(42);
        for bar in gen.generate(Scenario::Sideways, 500, 60) {
            assert!(bar.close > 90.0 && bar.close < 110.0, "drifted to {}", bar.close);
        }
    }

    #[test]
    fn test_crash_drops_on_rising_volume() {
        let mut gen = SyntheticBars::new(7);
        let bars = gen.generate(Scenario::Crash, 100, 60);

        let before = bars[100 - SHOCK_BARS - 1].close;
        let last = bars[99].close;
        assert!(last < before * 0.8, "{} -> {}", before, last);

        let calm_avg: f64 = bars[..95].iter().map(|b| b.volume).sum::<f64>() / 95.0;
        assert!(bars[99].volume > calm_avg * 3.0);
    }

    #[test]
    fn test_rally_rises() {
        let mut gen = SyntheticBars::new(7);
        let bars = gen.generate(Scenario::Rally, 100, 60);
        assert!(bars[99].close > bars[94].close * 1.2);
    }

    #[test]
    fn test_same_seed_same_prices() {
        let a = SyntheticBars::new(3).generate(Scenario::Sideways, 50, 60);
        let b = SyntheticBars::new(3).generate(Scenario::Sideways, 50, 60);
        let closes = |bars: &[Bar]| bars.iter().map(|b| b.close).collect::<Vec<_>>();
        assert_eq!(closes(&a), closes(&b));
    }

    #[test]
    fn test_bars_are_well_formed() {
        let mut gen = SyntheticBars::new(11);
        for scenario in [
            Scenario::Uptrend,
            Scenario::Downtrend,
            Scenario::Sideways,
            Scenario::Crash,
            Scenario::Rally,
        ] {
            let bars = gen.generate(scenario, 120, 60);
            assert_eq!(bars.len(), 120);
            assert!(validate_bars(&bars, Some(3600)).is_ok());
            for bar in &bars {
                assert!(bar.low <= bar.open && bar.open <= bar.high);
                assert!(bar.low <= bar.close && bar.close <= bar.high);
            }
        }
    }
}
