use super::order::{OrderRequest, OrderSink};
use super::paper::{TradeLedger, DEFAULT_STARTING_BALANCE, DEFAULT_TRADE_AMOUNT_USD};
use super::state::{StatusBoard, SymbolStatus};
use super::window::TradingWindow;
use crate::api::BarSource;
use crate::indicators::{RsiConfig, RsiIndicator};
use crate::models::{TradeRecord, TradeSide};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};

/// What caused a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Weekly time window, confirmed or not contradicted by RSI
    Window,
    /// RSI extreme outside any window
    Rsi,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Window => write!(f, "time window"),
            Trigger::Rsi => write!(f, "rsi"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeDecision {
    pub side: TradeSide,
    pub trigger: Trigger,
}

/// RSI levels that gate the trading variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiThresholds {
    pub buy_below: f64,
    pub sell_above: f64,
}

impl Default for RsiThresholds {
    fn default() -> Self {
        Self {
            buy_below: 30.0,
            sell_above: 70.0,
        }
    }
}

/// Decide whether to trade given the window bias and the latest RSI
///
/// Rules are checked in order:
/// 1. buy window and RSI unknown or below the buy level
/// 2. sell window and RSI unknown or above the sell level
/// 3. RSI below the buy level
/// 4. RSI above the sell level
pub fn decide(
    bias: Option<TradeSide>,
    rsi: Option<f64>,
    thresholds: RsiThresholds,
) -> Option<TradeDecision> {
    let oversold = rsi.map(|v| v < thresholds.buy_below);
    let overbought = rsi.map(|v| v > thresholds.sell_above);

    let (side, trigger) = match (bias, oversold, overbought) {
        (Some(TradeSide::Buy), None | Some(true), _) => (TradeSide::Buy, Trigger::Window),
        (Some(TradeSide::Sell), _, None | Some(true)) => (TradeSide::Sell, Trigger::Window),
        (_, Some(true), _) => (TradeSide::Buy, Trigger::Rsi),
        (_, _, Some(true)) => (TradeSide::Sell, Trigger::Rsi),
        _ => return None,
    };

    Some(TradeDecision { side, trigger })
}

/// `[trading]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub symbols: Vec<String>,
    pub timeframe: String,
    pub bar_limit: usize,
    pub poll_interval_secs: u64,
    pub trade_amount_usd: f64,
    pub starting_balance_usdt: f64,
    pub rsi_period: usize,
    pub buy_rsi: f64,
    pub sell_rsi: f64,
    pub window: TradingWindow,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbols: ["BTC/USDT", "ETH/USDT", "LTC/USDT", "XRP/USDT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeframe: "1h".to_string(),
            bar_limit: 100,
            poll_interval_secs: 60,
            trade_amount_usd: DEFAULT_TRADE_AMOUNT_USD,
            starting_balance_usdt: DEFAULT_STARTING_BALANCE,
            rsi_period: 14,
            buy_rsi: 30.0,
            sell_rsi: 70.0,
            window: TradingWindow::default(),
        }
    }
}

impl TradingConfig {
    pub fn thresholds(&self) -> RsiThresholds {
        RsiThresholds {
            buy_below: self.buy_rsi,
            sell_above: self.sell_rsi,
        }
    }

    pub fn ledger(&self) -> TradeLedger {
        TradeLedger::new(self.starting_balance_usdt, self.trade_amount_usd)
    }
}

/// Window + RSI trader, shared by one worker task per symbol
pub struct Trader {
    source: Arc<dyn BarSource>,
    sink: Arc<dyn OrderSink>,
    board: StatusBoard,
    ledger: Arc<Mutex<TradeLedger>>,
    rsi: RsiIndicator,
    config: TradingConfig,
}

impl Trader {
    pub fn new(
        source: Arc<dyn BarSource>,
        sink: Arc<dyn OrderSink>,
        board: StatusBoard,
        ledger: Arc<Mutex<TradeLedger>>,
        config: TradingConfig,
    ) -> Self {
        let rsi = RsiIndicator::new(RsiConfig {
            period: config.rsi_period,
            oversold: config.buy_rsi,
            overbought: config.sell_rsi,
            ..Default::default()
        });

        Self {
            source,
            sink,
            board,
            ledger,
            rsi,
            config,
        }
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    /// One polling step for one symbol at `now`
    ///
    /// Returns the booked trade, if any. Errors leave the symbol in the
    /// `Error` state and are returned to the caller for logging.
    pub async fn tick(&self, symbol: &str, now: DateTime<Utc>) -> Result<Option<TradeRecord>> {
        match self.try_tick(symbol, now).await {
            Ok(record) => Ok(record),
            Err(e) => {
                if let Err(board_err) = self.board.set_status(symbol, SymbolStatus::Error) {
                    tracing::error!("Status board unavailable: {}", board_err);
                }
                Err(e)
            }
        }
    }

    async fn try_tick(&self, symbol: &str, now: DateTime<Utc>) -> Result<Option<TradeRecord>> {
        let bars = self
            .source
            .fetch_bars(symbol, &self.config.timeframe, self.config.bar_limit)
            .await
            .with_context(|| format!("Failed to fetch bars for {}", symbol))?;

        let price = bars
            .last()
            .map(|b| b.close)
            .with_context(|| format!("No bars returned for {}", symbol))?;

        let rsi = match self.rsi.saturated_value(&bars) {
            Ok(value) => Some(value),
            Err(reason) => {
                tracing::debug!(symbol, %reason, "RSI unavailable");
                None
            }
        };

        self.board
            .update(symbol, |state| {
                state.last_price = Some(price);
                state.last_rsi = rsi;
            })
            .map_err(anyhow::Error::msg)?;

        let bias = self.config.window.bias(now);
        let Some(decision) = decide(bias, rsi, self.config.thresholds()) else {
            tracing::debug!(symbol, price, ?rsi, ?bias, "Waiting");
            self.board
                .set_status(symbol, SymbolStatus::Waiting)
                .map_err(anyhow::Error::msg)?;
            return Ok(None);
        };

        let order = OrderRequest::sized(symbol, decision.side, self.config.trade_amount_usd, price)?;
        let confirmation = self.sink.place_order(&order).await?;

        let record = self
            .ledger
            .lock()
            .map_err(|e| anyhow::anyhow!("Trade ledger poisoned: {}", e))?
            .record(&confirmation);

        let status = match decision.side {
            TradeSide::Buy => SymbolStatus::Bought(decision.trigger),
            TradeSide::Sell => SymbolStatus::Sold(decision.trigger),
        };
        self.board
            .set_status(symbol, status)
            .map_err(anyhow::Error::msg)?;

        tracing::info!(
            "💱 {} {:.6} {} @ {:.4} ({})",
            decision.side,
            record.amount,
            symbol,
            price,
            decision.trigger
        );

        Ok(Some(record))
    }

    /// Poll one symbol forever
    pub async fn run(self: Arc<Self>, symbol: String) {
        let mut ticker = interval(Duration::from_secs(self.config.poll_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("🤖 Trading worker started for {}", symbol);

        loop {
            ticker.tick().await;
            if let Err(e) = self.tick(&symbol, Utc::now()).await {
                tracing::error!("Trading tick failed for {}: {:#}", symbol, e);
            }
        }
    }
}
