use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use cryptosignal::api::{BarSource, Notifier};
use cryptosignal::config::Settings;
use cryptosignal::execution::{PaperExchange, StatusBoard, SymbolStatus, Trader, Trigger};
use cryptosignal::indicators::IndicatorRegistry;
use cryptosignal::scanner::{ScanConfig, Scanner};
use cryptosignal::strategy::{SignalAggregator, SignalEngine};
use cryptosignal::synthetic::{Scenario, SyntheticBars};
use cryptosignal::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct CannedSource {
    bars: HashMap<String, Vec<Bar>>,
}

#[async_trait]
impl BarSource for CannedSource {
    async fn fetch_bars(&self, symbol: &str, _: &str, _: usize) -> anyhow::Result<Vec<Bar>> {
        self.bars
            .get(symbol)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown symbol {}", symbol))
    }
}

#[derive(Default)]
struct CollectingNotifier {
    sent: Mutex<Vec<SymbolAssessment>>,
}

#[async_trait]
impl Notifier for CollectingNotifier {
    async fn notify(&self, assessment: &SymbolAssessment) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(assessment.clone());
        Ok(())
    }
}

fn engine(settings: &Settings) -> SignalEngine {
    let registry = IndicatorRegistry::from_settings(&settings.indicators).unwrap();
    SignalEngine::new(registry, SignalAggregator::new(settings.aggregator.clone()))
}

#[test]
fn test_crash_produces_strong_buy() {
    let _ = tracing_subscriber::fmt::try_init();

    let settings = Settings::from_toml_str("").unwrap();
    let engine = engine(&settings);
    let bars = SyntheticBars::new(7).generate(Scenario::Crash, 100, 60);

    let readings: HashMap<_, _> = engine.readings("CRASH/USDT", &bars).into_iter().collect();

    let rsi = readings.get("rsi").expect("rsi reading");
    assert!(rsi.raw_value < 30.0, "RSI after a crash: {}", rsi.raw_value);
    assert_eq!(rsi.direction, Direction::Buy);

    let bollinger = readings.get("bollinger").expect("bollinger reading");
    assert_eq!(bollinger.direction, Direction::Buy);

    let assessment = engine
        .assess("CRASH/USDT", &bars)
        .unwrap()
        .expect("crash should produce a signal");

    assert_eq!(assessment.direction, TradeSide::Buy);
    assert!(assessment.strength > 60.0, "strength {}", assessment.strength);
    assert_eq!(assessment.price, bars.last().unwrap().close);
    assert!(engine.is_actionable(&assessment));
}

#[tokio::test]
async fn test_scan_cycle_notifies_and_updates_board() {
    let mut generator = SyntheticBars::new(7);
    let mut bars = HashMap::new();
    bars.insert(
        "CRASH/USDT".to_string(),
        generator.generate(Scenario::Crash, 100, 60),
    );

    let symbols = vec!["CRASH/USDT".to_string(), "DELISTED/USDT".to_string()];
    let board = StatusBoard::new(&symbols);
    let notifier = Arc::new(CollectingNotifier::default());

    let settings = Settings::from_toml_str("").unwrap();
    let scanner = Scanner::new(
        Arc::new(CannedSource { bars }),
        Arc::new(engine(&settings)),
        notifier.clone(),
        board.clone(),
        ScanConfig {
            symbols: symbols.clone(),
            ..Default::default()
        },
    );

    let report = scanner.run_cycle(&symbols).await;

    assert_eq!(report.evaluated, 1);
    assert_eq!(report.notified, 1);
    assert_eq!(report.failed, 1);

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].symbol, "CRASH/USDT");

    let message = cryptosignal::api::format_message(&sent[0]);
    assert!(message.starts_with("📈 Buy Signal for CRASH/USDT"));
    assert!(message.contains("rsi: "));

    let crash = board.get("CRASH/USDT").unwrap().unwrap();
    assert_eq!(crash.status, SymbolStatus::Signal(TradeSide::Buy));
    assert!(crash.last_rsi.unwrap() < 30.0);

    let delisted = board.get("DELISTED/USDT").unwrap().unwrap();
    assert_eq!(delisted.status, SymbolStatus::Error);
}

#[tokio::test]
async fn test_paper_trading_week() {
    let mut generator = SyntheticBars::new(11);
    let mut bars = HashMap::new();
    bars.insert(
        "BTC/USDT".to_string(),
        generator.generate(Scenario::Crash, 100, 60),
    );
    bars.insert(
        "ETH/USDT".to_string(),
        generator.generate(Scenario::Rally, 100, 60),
    );

    let settings = Settings::from_toml_str("").unwrap();
    let config = settings.trading.clone();
    let board = StatusBoard::new(&["BTC/USDT", "ETH/USDT"]);
    let ledger = config.ledger().shared();
    let exchange = Arc::new(PaperExchange::new());

    let trader = Trader::new(
        Arc::new(CannedSource { bars }),
        exchange.clone(),
        board.clone(),
        ledger.clone(),
        config,
    );

    // Monday 06:00 at UTC+3, oversold: window buy
    let monday = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
    let bought = trader.tick("BTC/USDT", monday).await.unwrap().unwrap();
    assert_eq!(bought.side, TradeSide::Buy);
    assert_eq!(
        board.get("BTC/USDT").unwrap().unwrap().status,
        SymbolStatus::Bought(Trigger::Window)
    );

    // Wednesday 16:00 at UTC+3, overbought: window sell
    let wednesday = Utc.with_ymd_and_hms(2024, 1, 3, 13, 0, 0).unwrap();
    let sold = trader.tick("ETH/USDT", wednesday).await.unwrap().unwrap();
    assert_eq!(sold.side, TradeSide::Sell);
    assert_eq!(
        board.get("ETH/USDT").unwrap().unwrap().status,
        SymbolStatus::Sold(Trigger::Window)
    );

    let summary = ledger.lock().unwrap().summary();
    assert_eq!(summary.trade_count, 2);
    assert!((summary.balance_usdt - 9.85).abs() < 1e-9);
    assert_eq!(summary.recent_trades[0].side, TradeSide::Sell);
    assert_eq!(exchange.orders().len(), 2);
}
