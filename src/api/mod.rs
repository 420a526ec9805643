pub mod binance;
pub mod telegram;

use crate::models::{Bar, SymbolAssessment};
use async_trait::async_trait;

pub use binance::{BinanceClient, ExchangeConfig};
pub use telegram::{format_message, LogNotifier, TelegramConfig, TelegramNotifier};

/// Source of OHLCV bars for a symbol, oldest first
#[async_trait]
pub trait BarSource: Send + Sync {
    async fn fetch_bars(&self, symbol: &str, timeframe: &str, limit: usize)
        -> anyhow::Result<Vec<Bar>>;
}

/// Delivers actionable assessments to a human
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, assessment: &SymbolAssessment) -> anyhow::Result<()>;
}
