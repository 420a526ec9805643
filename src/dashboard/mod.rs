//! Status dashboard served with Axum

use crate::execution::{LedgerSummary, StatusBoard, SymbolState, TradeLedger, TradingWindow};
use crate::models::TradeSide;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// `[dashboard]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
    /// Seconds between automatic page reloads
    pub refresh_secs: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
            refresh_secs: 10,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub mode: &'static str,
    pub board: StatusBoard,
    pub ledger: Option<Arc<Mutex<TradeLedger>>>,
    pub window: Option<TradingWindow>,
    pub refresh_secs: u32,
}

impl AppState {
    /// State for the scan variant: symbols only
    pub fn scan(board: StatusBoard) -> Self {
        Self {
            mode: "scan",
            board,
            ledger: None,
            window: None,
            refresh_secs: DashboardConfig::default().refresh_secs,
        }
    }

    /// State for the trading variant: symbols, ledger and window
    pub fn trading(board: StatusBoard, ledger: Arc<Mutex<TradeLedger>>, window: TradingWindow) -> Self {
        Self {
            mode: "trade",
            board,
            ledger: Some(ledger),
            window: Some(window),
            refresh_secs: DashboardConfig::default().refresh_secs,
        }
    }

    pub fn with_refresh_secs(mut self, refresh_secs: u32) -> Self {
        self.refresh_secs = refresh_secs;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub mode: &'static str,
    pub generated_at: DateTime<Utc>,
    pub symbols: BTreeMap<String, SymbolState>,
    pub ledger: Option<LedgerSummary>,
    pub window_bias: Option<TradeSide>,
    pub local_time: Option<String>,
}

fn snapshot(state: &AppState) -> Result<StatusSnapshot, StatusCode> {
    let now = Utc::now();

    let symbols = state.board.snapshot().map_err(|e| {
        tracing::error!("Status board unavailable: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let ledger = match &state.ledger {
        Some(ledger) => Some(
            ledger
                .lock()
                .map_err(|e| {
                    tracing::error!("Trade ledger unavailable: {}", e);
                    StatusCode::INTERNAL_SERVER_ERROR
                })?
                .summary(),
        ),
        None => None,
    };

    Ok(StatusSnapshot {
        mode: state.mode,
        generated_at: now,
        symbols,
        ledger,
        window_bias: state.window.as_ref().and_then(|w| w.bias(now)),
        local_time: state
            .window
            .as_ref()
            .map(|w| w.local_time(now).format("%Y-%m-%d %H:%M:%S %:z").to_string()),
    })
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusSnapshot>, StatusCode> {
    snapshot(&state).map(Json)
}

pub async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let snapshot = snapshot(&state)?;
    Ok(Html(render_html(&snapshot, state.refresh_secs)))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_check))
        .route("/api/status", get(status_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .with_state(state)
}

/// Bind `0.0.0.0:port` and serve until the task is dropped
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("🌐 Dashboard listening on http://0.0.0.0:{}", port);
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_html(snapshot: &StatusSnapshot, refresh_secs: u32) -> String {
    let mut html = String::new();

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta http-equiv=\"refresh\" content=\"{}\">\n<title>Crypto Signal Bot</title>\n\
         <style>body{{font-family:Arial,sans-serif;margin:20px}}table{{border-collapse:collapse}}\
         td,th{{padding:6px 12px;border-bottom:1px solid #ddd;text-align:center}}\
         .buy{{color:#155724}}.sell{{color:#721c24}}</style>\n</head>\n<body>\n\
         <h1>Crypto Signal Bot ({})</h1>\n<p>Updated {}</p>\n",
        refresh_secs,
        snapshot.mode,
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if let Some(local_time) = &snapshot.local_time {
        let bias = snapshot
            .window_bias
            .map(|side| side.to_string())
            .unwrap_or_else(|| "none".to_string());
        let _ = write!(
            html,
            "<p>Strategy time: {} | active window: {}</p>\n",
            escape(local_time),
            bias
        );
    }

    if let Some(ledger) = &snapshot.ledger {
        let _ = write!(
            html,
            "<p>Balance: {:.2} USDT | Profit: {:.2} USDT | Trade size: {:.2} USDT | Trades: {}</p>\n",
            ledger.balance_usdt, ledger.profits_usdt, ledger.trade_amount_usd, ledger.trade_count
        );
    }

    html.push_str(
        "<table>\n<tr><th>Symbol</th><th>Price</th><th>RSI</th><th>Status</th>\
         <th>Signal</th><th>Updated</th></tr>\n",
    );
    for (symbol, state) in &snapshot.symbols {
        let price = state
            .last_price
            .map(|p| format!("{:.4}", p))
            .unwrap_or_else(|| "loading".to_string());
        let rsi = state
            .last_rsi
            .map(|r| format!("{:.2}", r))
            .unwrap_or_else(|| "n/a".to_string());
        let signal = state
            .last_assessment
            .as_ref()
            .map(|a| {
                format!(
                    "<span class=\"{}\">{} {:.2}%</span>",
                    a.direction, a.direction, a.strength
                )
            })
            .unwrap_or_else(|| "-".to_string());
        let updated = state
            .updated_at
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(symbol),
            price,
            rsi,
            state.status,
            signal,
            updated
        );
    }
    html.push_str("</table>\n");

    if let Some(ledger) = &snapshot.ledger {
        html.push_str(
            "<h2>Trade history</h2>\n<table>\n<tr><th>Time</th><th>Symbol</th><th>Side</th>\
             <th>Amount</th><th>Price</th></tr>\n",
        );
        if ledger.recent_trades.is_empty() {
            html.push_str("<tr><td colspan=\"5\">No trades yet</td></tr>\n");
        }
        for trade in &ledger.recent_trades {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{:.6}</td><td>{:.4}</td></tr>\n",
                trade.timestamp.format("%Y-%m-%d %H:%M:%S"),
                escape(&trade.symbol),
                trade.side,
                trade.side,
                trade.amount,
                trade.price
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}
