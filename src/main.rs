use clap::{Parser, Subcommand};
use cryptosignal::api::{BarSource, BinanceClient, LogNotifier, Notifier, TelegramNotifier};
use cryptosignal::config::Settings;
use cryptosignal::dashboard::{self, AppState};
use cryptosignal::execution::{PaperExchange, StatusBoard, Trader};
use cryptosignal::indicators::IndicatorRegistry;
use cryptosignal::scanner::Scanner;
use cryptosignal::strategy::{SignalAggregator, SignalEngine, Strategy};
use cryptosignal::synthetic::{Scenario, SyntheticBars};
use cryptosignal::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "cryptosignal", version, about = "Multi-indicator crypto signal bot")]
struct Cli {
    /// Settings file (default: cryptosignal.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan symbols periodically and notify on strong signals
    Scan {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Paper-trade on the weekly window and RSI
    Trade,
    /// Run the engine offline over synthetic bars
    Demo {
        #[arg(long, value_enum, default_value = "crash")]
        scenario: Scenario,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Scan { once } => run_scan(settings, once).await,
        Command::Trade => run_trade(settings).await,
        Command::Demo { scenario, seed } => run_demo(settings, scenario, seed),
    }
}

// ============================================================================
// Initialization Functions
// ============================================================================

fn setup_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cryptosignal=info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}

fn build_engine(settings: &Settings) -> anyhow::Result<SignalEngine> {
    let registry = IndicatorRegistry::from_settings(&settings.indicators)?;
    let aggregator = SignalAggregator::new(settings.aggregator.clone());

    tracing::info!("  Indicators: {}", registry.names().join(", "));
    tracing::info!(
        "  Thresholds: confidence > {}, action > {}",
        settings.aggregator.confidence_threshold,
        settings.aggregator.action_threshold
    );

    Ok(SignalEngine::new(registry, aggregator))
}

fn build_notifier(settings: &Settings) -> anyhow::Result<Arc<dyn Notifier>> {
    match settings.telegram.credentials() {
        Some((token, chat_id)) => {
            tracing::info!("  Notifier: Telegram");
            Ok(Arc::new(TelegramNotifier::new(token, chat_id)?))
        }
        None => {
            tracing::warn!("TELEGRAM_TOKEN/TELEGRAM_CHAT_ID not set, signals will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

fn spawn_dashboard(settings: &Settings, state: AppState) -> Option<JoinHandle<()>> {
    if !settings.dashboard.enabled {
        return None;
    }
    let port = settings.dashboard.port;
    let state = state.with_refresh_secs(settings.dashboard.refresh_secs);
    Some(tokio::spawn(async move {
        if let Err(e) = dashboard::serve(state, port).await {
            tracing::error!("Dashboard stopped: {:#}", e);
        }
    }))
}

// ============================================================================
// Commands
// ============================================================================

async fn run_scan(settings: Settings, once: bool) -> Result<()> {
    tracing::info!("🚀 Signal scanner starting");
    tracing::info!("  Symbols: {}", settings.scan.symbols.join(", "));
    tracing::info!(
        "  Timeframe: {} ({} bars), every {} min",
        settings.scan.timeframe,
        settings.scan.bar_limit,
        settings.scan.interval_minutes
    );

    let engine = Arc::new(build_engine(&settings)?);
    let notifier = build_notifier(&settings)?;
    let source: Arc<dyn BarSource> = Arc::new(BinanceClient::from_config(&settings.exchange)?);
    let board = StatusBoard::new(&settings.scan.symbols);

    let scanner = Arc::new(Scanner::new(
        source,
        engine,
        notifier,
        board.clone(),
        settings.scan.clone(),
    ));

    if once {
        let report = scanner.run_cycle(&settings.scan.symbols).await;
        tracing::info!("{:?}", report);
        return Ok(());
    }

    let dashboard_task = spawn_dashboard(&settings, AppState::scan(board));
    let scan_task = tokio::spawn(scanner.run());

    tracing::info!("Press Ctrl+C to stop...");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("⚠️  Received Ctrl+C, shutting down...");
        }
        result = scan_task => {
            tracing::error!("Scan loop exited: {:?}", result);
        }
    }

    if let Some(task) = dashboard_task {
        task.abort();
    }
    tracing::info!("👋 Scanner stopped");
    Ok(())
}

async fn run_trade(settings: Settings) -> Result<()> {
    let config = settings.trading.clone();

    tracing::info!("🚀 Paper trader starting");
    tracing::info!("  Symbols: {}", config.symbols.join(", "));
    tracing::info!(
        "  Trade size: {:.2} USDT, starting balance {:.2} USDT",
        config.trade_amount_usd,
        config.starting_balance_usdt
    );
    tracing::info!(
        "  Buy window: {:?} {}:00-{}:00, sell window: {:?} {}:00-{}:00 (UTC{:+})",
        config.window.buy_days,
        config.window.buy_hours.start,
        config.window.buy_hours.end,
        config.window.sell_days,
        config.window.sell_hours.start,
        config.window.sell_hours.end,
        config.window.utc_offset_hours
    );

    let source: Arc<dyn BarSource> = Arc::new(BinanceClient::from_config(&settings.exchange)?);
    let board = StatusBoard::new(&config.symbols);
    let ledger = config.ledger().shared();
    let window = config.window.clone();

    let trader = Arc::new(Trader::new(
        source,
        Arc::new(PaperExchange::new()),
        board.clone(),
        ledger.clone(),
        config.clone(),
    ));

    let workers: Vec<JoinHandle<()>> = config
        .symbols
        .iter()
        .map(|symbol| tokio::spawn(trader.clone().run(symbol.clone())))
        .collect();

    let dashboard_task = spawn_dashboard(&settings, AppState::trading(board, ledger, window));

    tracing::info!("Press Ctrl+C to stop...");
    tokio::signal::ctrl_c().await?;
    tracing::info!("⚠️  Received Ctrl+C, shutting down...");

    for worker in workers {
        worker.abort();
    }
    if let Some(task) = dashboard_task {
        task.abort();
    }
    tracing::info!("👋 Trader stopped");
    Ok(())
}

fn run_demo(settings: Settings, scenario: Scenario, seed: u64) -> Result<()> {
    let engine = build_engine(&settings)?;
    let count = settings.scan.bar_limit.max(engine.min_bars_required());
    let bars = SyntheticBars::new(seed).generate(scenario, count, 60);
    let symbol = format!("DEMO-{:?}/USDT", scenario).to_uppercase();

    println!("\n═══════════════════════════════════════════════════════");
    println!("  {} ({} hourly bars, seed {})", symbol, bars.len(), seed);
    println!("═══════════════════════════════════════════════════════\n");

    for (name, reading) in engine.readings(&symbol, &bars) {
        println!(
            "  {:<11} {:<8} strength {:>6.2}  raw {:.4}",
            name,
            format!("{:?}", reading.direction),
            reading.strength,
            reading.raw_value
        );
    }

    match engine.assess(&symbol, &bars)? {
        Some(assessment) => {
            let verdict = if engine.is_actionable(&assessment) {
                "ACTIONABLE"
            } else {
                "below action threshold"
            };
            println!(
                "\n  => {} {:.2}% ({} contributing, {})",
                assessment.direction.as_str().to_uppercase(),
                assessment.strength,
                assessment.contributing.len(),
                verdict
            );
        }
        None => println!("\n  => no signal"),
    }

    Ok(())
}
