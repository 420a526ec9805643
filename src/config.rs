//! Layered settings: defaults, optional TOML file, then environment

use crate::api::{ExchangeConfig, TelegramConfig};
use crate::dashboard::DashboardConfig;
use crate::execution::TradingConfig;
use crate::indicators::{IndicatorRegistry, IndicatorSettings};
use crate::scanner::ScanConfig;
use crate::strategy::AggregatorConfig;
use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "cryptosignal.toml";
pub const ENV_PREFIX: &str = "CRYPTOSIGNAL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub exchange: ExchangeConfig,
    pub scan: ScanConfig,
    pub indicators: IndicatorSettings,
    pub aggregator: AggregatorConfig,
    pub trading: TradingConfig,
    pub dashboard: DashboardConfig,
    pub telegram: TelegramConfig,
}

impl Settings {
    /// Load settings from every source
    ///
    /// An explicit `path` must exist; otherwise `cryptosignal.toml` is used
    /// when present. `CRYPTOSIGNAL__SECTION__KEY` variables override the
    /// file, and `TELEGRAM_TOKEN`, `TELEGRAM_CHAT_ID` and `PORT` override both.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = Self::defaults()?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("scan.symbols")
                    .with_list_parse_key("trading.symbols")
                    .with_list_parse_key("indicators.enabled"),
            )
            .set_override_option("telegram.token", std::env::var("TELEGRAM_TOKEN").ok())?
            .set_override_option("telegram.chat_id", std::env::var("TELEGRAM_CHAT_ID").ok())?
            .set_override_option("dashboard.port", std::env::var("PORT").ok())?;

        Self::build(builder)
    }

    /// Defaults overlaid with a TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::build(Self::defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let defaults = Config::try_from(&Settings::default())
            .context("Failed to serialize default settings")?;
        Ok(Config::builder().add_source(defaults))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would make the engine or the loops meaningless
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("aggregator.confidence_threshold", self.aggregator.confidence_threshold),
            ("aggregator.action_threshold", self.aggregator.action_threshold),
            ("trading.buy_rsi", self.trading.buy_rsi),
            ("trading.sell_rsi", self.trading.sell_rsi),
            ("indicators.rsi.oversold", self.indicators.rsi.oversold),
            ("indicators.rsi.overbought", self.indicators.rsi.overbought),
            ("indicators.stochastic.oversold", self.indicators.stochastic.oversold),
            ("indicators.stochastic.overbought", self.indicators.stochastic.overbought),
        ];
        for (name, value) in thresholds {
            if !(0.0..=100.0).contains(&value) {
                anyhow::bail!("{} must be within [0, 100], got {}", name, value);
            }
        }

        let periods = [
            ("indicators.rsi.period", self.indicators.rsi.period),
            ("indicators.macd.fast_period", self.indicators.macd.fast_period),
            ("indicators.macd.slow_period", self.indicators.macd.slow_period),
            ("indicators.macd.signal_period", self.indicators.macd.signal_period),
            ("indicators.bollinger.period", self.indicators.bollinger.period),
            ("indicators.stochastic.k_period", self.indicators.stochastic.k_period),
            ("indicators.stochastic.d_period", self.indicators.stochastic.d_period),
            ("indicators.ichimoku.tenkan_period", self.indicators.ichimoku.tenkan_period),
            ("indicators.ichimoku.kijun_period", self.indicators.ichimoku.kijun_period),
            ("indicators.ichimoku.senkou_b_period", self.indicators.ichimoku.senkou_b_period),
            ("indicators.volume.period", self.indicators.volume.period),
            ("indicators.ema_cross.fast_period", self.indicators.ema_cross.fast_period),
            ("indicators.ema_cross.slow_period", self.indicators.ema_cross.slow_period),
            ("trading.rsi_period", self.trading.rsi_period),
            ("scan.bar_limit", self.scan.bar_limit),
            ("trading.bar_limit", self.trading.bar_limit),
        ];
        for (name, value) in periods {
            if value == 0 {
                anyhow::bail!("{} must be greater than zero", name);
            }
        }

        if self.indicators.macd.fast_period >= self.indicators.macd.slow_period {
            anyhow::bail!("indicators.macd.fast_period must be below slow_period");
        }
        if self.indicators.rsi.oversold >= self.indicators.rsi.overbought {
            anyhow::bail!("indicators.rsi.oversold must be below overbought");
        }
        if self.trading.buy_rsi >= self.trading.sell_rsi {
            anyhow::bail!("trading.buy_rsi must be below sell_rsi");
        }

        if self.scan.symbols.is_empty() {
            anyhow::bail!("scan.symbols must not be empty");
        }
        if self.trading.symbols.is_empty() {
            anyhow::bail!("trading.symbols must not be empty");
        }
        if self.scan.interval_minutes == 0 || self.trading.poll_interval_secs == 0 {
            anyhow::bail!("scan and trading intervals must be greater than zero");
        }
        if !(self.trading.trade_amount_usd.is_finite() && self.trading.trade_amount_usd > 0.0) {
            anyhow::bail!("trading.trade_amount_usd must be positive");
        }
        if self.exchange.rate_limit_rpm == 0 {
            anyhow::bail!("exchange.rate_limit_rpm must be greater than zero");
        }

        self.trading
            .window
            .validate()
            .map_err(|e| anyhow::anyhow!("trading.window: {}", e))?;

        // Unknown indicator names fail here rather than at first use
        let registry = IndicatorRegistry::from_settings(&self.indicators)?;
        let lookback = registry.max_lookback();
        if self.scan.bar_limit < lookback {
            anyhow::bail!(
                "scan.bar_limit ({}) is below the longest indicator lookback ({})",
                self.scan.bar_limit,
                lookback
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::TieBreak;
    use chrono::Weekday;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::from_toml_str("").unwrap();

        assert_eq!(settings.scan.symbols.len(), 10);
        assert_eq!(settings.scan.interval_minutes, 15);
        assert_eq!(settings.scan.timeframe, "1h");
        assert_eq!(settings.aggregator.action_threshold, 60.0);
        assert_eq!(settings.trading.trade_amount_usd, 3.0);
        assert_eq!(settings.trading.window.buy_days, vec![Weekday::Mon, Weekday::Tue]);
        assert_eq!(settings.dashboard.port, 8000);
        assert!(settings.telegram.credentials().is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [scan]
            symbols = ["BTC/USDT", "ETH/USDT"]
            interval_minutes = 5

            [aggregator]
            tie_break = "skip"

            [indicators]
            enabled = ["rsi", "ema_cross"]

            [indicators.rsi]
            period = 21

            [trading.window]
            utc_offset_hours = 0
            "#,
        )
        .unwrap();

        assert_eq!(settings.scan.symbols, vec!["BTC/USDT", "ETH/USDT"]);
        assert_eq!(settings.scan.interval_minutes, 5);
        assert_eq!(settings.scan.bar_limit, 100);
        assert_eq!(settings.aggregator.tie_break, TieBreak::Skip);
        assert_eq!(settings.indicators.rsi.period, 21);
        assert_eq!(settings.indicators.rsi.oversold, 30.0);
        assert_eq!(settings.trading.window.utc_offset_hours, 0);
        assert_eq!(settings.trading.window.sell_days.len(), 5);
    }

    #[test]
    fn test_unknown_indicator_fails_validation() {
        let err = Settings::from_toml_str("[indicators]\nenabled = [\"rsi\", \"adx\"]\n")
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Unknown indicator 'adx'"));
    }

    #[test]
    fn test_out_of_range_threshold_fails_validation() {
        let err = Settings::from_toml_str("[aggregator]\naction_threshold = 150.0\n").unwrap_err();
        assert!(err.to_string().contains("aggregator.action_threshold"));
    }

    #[test]
    fn test_zero_period_fails_validation() {
        assert!(Settings::from_toml_str("[indicators.bollinger]\nperiod = 0\n").is_err());
    }

    #[test]
    fn test_bar_limit_below_lookback_fails_validation() {
        let err = Settings::from_toml_str("[scan]\nbar_limit = 40\n").unwrap_err();
        assert!(err.to_string().contains("scan.bar_limit (40)"));

        // Without ichimoku the longest lookback is MACD's 34 bars
        let settings = Settings::from_toml_str(
            "[scan]\nbar_limit = 40\n[indicators]\nenabled = [\"rsi\", \"macd\"]\n",
        )
        .unwrap();
        assert_eq!(settings.scan.bar_limit, 40);
    }

    #[test]
    fn test_empty_symbols_fail_validation() {
        assert!(Settings::from_toml_str("[scan]\nsymbols = []\n").is_err());
    }

    #[test]
    fn test_telegram_credentials() {
        let settings =
            Settings::from_toml_str("[telegram]\ntoken = \"abc\"\nchat_id = \"42\"\n").unwrap();
        assert_eq!(settings.telegram.credentials(), Some(("abc", "42")));
    }
}
