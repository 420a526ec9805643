//! Scan variant: fetch, assess and notify for every symbol once per cycle

use crate::api::{BarSource, Notifier};
use crate::execution::{StatusBoard, SymbolStatus};
use crate::models::SymbolAssessment;
use crate::strategy::{SignalEngine, Strategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

pub const DEFAULT_SYMBOLS: &[&str] = &[
    "BTC/USDT",
    "ETH/USDT",
    "BNB/USDT",
    "ADA/USDT",
    "XRP/USDT",
    "SOL/USDT",
    "DOT/USDT",
    "LTC/USDT",
    "LINK/USDT",
    "MATIC/USDT",
];

/// `[scan]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub symbols: Vec<String>,
    pub timeframe: String,
    pub bar_limit: usize,
    pub interval_minutes: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            timeframe: "1h".to_string(),
            bar_limit: 100,
            interval_minutes: 15,
        }
    }
}

/// Per-cycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Symbols that reached the engine and were assessed
    pub evaluated: usize,
    /// Actionable assessments delivered to the notifier
    pub notified: usize,
    /// Evaluated symbols with no actionable signal
    pub no_signal: usize,
    /// Series too short for the longest indicator
    pub skipped: usize,
    /// Fetch, validation or notification failures
    pub failed: usize,
}

pub struct Scanner {
    source: Arc<dyn BarSource>,
    engine: Arc<SignalEngine>,
    notifier: Arc<dyn Notifier>,
    board: StatusBoard,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(
        source: Arc<dyn BarSource>,
        engine: Arc<SignalEngine>,
        notifier: Arc<dyn Notifier>,
        board: StatusBoard,
        config: ScanConfig,
    ) -> Self {
        Self {
            source,
            engine,
            notifier,
            board,
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Process every symbol once, sequentially
    ///
    /// A failure on one symbol is logged and counted; it never stops the
    /// remaining symbols.
    pub async fn run_cycle(&self, symbols: &[String]) -> CycleReport {
        tracing::info!("🔍 Starting market check ({} symbols)", symbols.len());

        let mut report = CycleReport::default();
        let min_bars = self.engine.min_bars_required();

        for symbol in symbols {
            let bars = match self
                .source
                .fetch_bars(symbol, &self.config.timeframe, self.config.bar_limit)
                .await
            {
                Ok(bars) => bars,
                Err(e) => {
                    tracing::warn!("Failed to fetch bars for {}: {:#}", symbol, e);
                    self.mark(symbol, SymbolStatus::Error);
                    report.failed += 1;
                    continue;
                }
            };

            if bars.len() < min_bars {
                tracing::info!(
                    "⏭️  Skipping {}: {} bars, need {}",
                    symbol,
                    bars.len(),
                    min_bars
                );
                report.skipped += 1;
                continue;
            }

            let assessment = match self.engine.assess(symbol, &bars) {
                Ok(assessment) => assessment,
                Err(e) => {
                    tracing::warn!("Rejected bars for {}: {}", symbol, e);
                    self.mark(symbol, SymbolStatus::Error);
                    report.failed += 1;
                    continue;
                }
            };
            report.evaluated += 1;

            let price = bars.last().map(|b| b.close);
            let rsi = self
                .engine
                .registry()
                .get("rsi")
                .and_then(|rsi| rsi.evaluate(&bars).ok())
                .map(|reading| reading.raw_value);
            tracing::debug!(symbol = %symbol, ?price, ?rsi, bars = bars.len(), "Evaluated");

            let actionable = assessment
                .as_ref()
                .filter(|a| self.engine.is_actionable(a))
                .cloned();

            let status = match &actionable {
                Some(a) => SymbolStatus::Signal(a.direction),
                None => SymbolStatus::Waiting,
            };
            if let Err(e) = self.board.update(symbol, |state| {
                state.last_price = price;
                state.last_rsi = rsi;
                state.last_assessment = assessment.clone();
                state.status = status;
            }) {
                tracing::error!("Status board unavailable: {}", e);
            }

            match actionable {
                Some(a) => match self.notify(&a).await {
                    Ok(()) => report.notified += 1,
                    Err(e) => {
                        tracing::error!("Error sending notification for {}: {:#}", symbol, e);
                        report.failed += 1;
                    }
                },
                None => report.no_signal += 1,
            }
        }

        tracing::info!(
            "✅ Market check done: {} evaluated, {} notified, {} no signal, {} skipped, {} failed",
            report.evaluated,
            report.notified,
            report.no_signal,
            report.skipped,
            report.failed
        );

        report
    }

    async fn notify(&self, assessment: &SymbolAssessment) -> anyhow::Result<()> {
        tracing::info!(
            "📣 {} signal for {} ({:.2}%, {} indicators)",
            assessment.direction,
            assessment.symbol,
            assessment.strength,
            assessment.contributing.len()
        );
        self.notifier.notify(assessment).await
    }

    fn mark(&self, symbol: &str, status: SymbolStatus) {
        if let Err(e) = self.board.set_status(symbol, status) {
            tracing::error!("Status board unavailable: {}", e);
        }
    }

    /// Run cycles on a fixed interval forever. Missed ticks are skipped.
    pub async fn run(self: Arc<Self>) {
        let period = Duration::from_secs(self.config.interval_minutes * 60);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let symbols = self.config.symbols.clone();
            self.run_cycle(&symbols).await;
        }
    }
}
