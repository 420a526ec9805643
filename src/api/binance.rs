use super::BarSource;
use crate::models::Bar;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

pub const BINANCE_API_BASE: &str = "https://api.binance.com";
const RATE_LIMIT_RPM: u32 = 1200; // Binance request weight per minute
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// `[exchange]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub rate_limit_rpm: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: BINANCE_API_BASE.to_string(),
            timeout_secs: REQUEST_TIMEOUT_SECS,
            rate_limit_rpm: RATE_LIMIT_RPM,
        }
    }
}

type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Binance spot market data client
///
/// Cloneable; all clones share the same rate limiter.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<BinanceRateLimiter>,
    initial_backoff_ms: u64,
}

impl BinanceClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BINANCE_API_BASE)
    }

    /// Point the client at another host (testnet, mock server)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::with_options(base_url, REQUEST_TIMEOUT_SECS, RATE_LIMIT_RPM)
    }

    pub fn from_config(config: &ExchangeConfig) -> Result<Self> {
        Self::with_options(&config.base_url, config.timeout_secs, config.rate_limit_rpm)
    }

    pub fn with_options(
        base_url: impl Into<String>,
        timeout_secs: u64,
        rate_limit_rpm: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let rpm = NonZeroU32::new(rate_limit_rpm).context("Rate limit must be non-zero")?;
        let quota = Quota::per_minute(rpm);

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            initial_backoff_ms: INITIAL_BACKOFF_MS,
        })
    }

    /// Shorten retry backoff, mainly for tests
    pub fn with_initial_backoff(mut self, backoff_ms: u64) -> Self {
        self.initial_backoff_ms = backoff_ms;
        self
    }

    /// Fetch klines with retry on rate limiting and server errors
    pub async fn get_klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Bar>> {
        let pair = exchange_symbol(symbol);
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url, pair, interval, limit
        );

        for attempt in 1..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;
            let backoff_ms = self.initial_backoff_ms * 2_u64.pow(attempt - 1);

            match self.client.get(&url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let payload: Value = response
                            .json()
                            .await
                            .context("Failed to parse klines response")?;
                        if attempt > 1 {
                            tracing::info!(
                                "✓ Fetched {} klines for {} after {} attempts",
                                interval,
                                symbol,
                                attempt
                            );
                        }
                        return parse_klines(&payload);
                    }

                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if retryable && attempt < MAX_RETRIES {
                        tracing::warn!(
                            "Binance returned {} for {}, retrying in {}ms (attempt {}/{})",
                            status,
                            symbol,
                            backoff_ms,
                            attempt,
                            MAX_RETRIES
                        );
                        sleep(Duration::from_millis(backoff_ms)).await;
                        continue;
                    }

                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    anyhow::bail!("Binance API error ({}) for {}: {}", status, symbol, error_text);
                }
                Err(e) if attempt < MAX_RETRIES => {
                    tracing::warn!(
                        "Network error fetching {}: {}, retrying in {}ms (attempt {}/{})",
                        symbol,
                        e,
                        backoff_ms,
                        attempt,
                        MAX_RETRIES
                    );
                    sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => anyhow::bail!("Network error after {} retries: {}", MAX_RETRIES, e),
            }
        }

        anyhow::bail!("Failed after {} retries", MAX_RETRIES)
    }
}

#[async_trait]
impl BarSource for BinanceClient {
    async fn fetch_bars(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<Vec<Bar>> {
        self.get_klines(symbol, timeframe, limit).await
    }
}

/// "BTC/USDT" -> "BTCUSDT"
pub fn exchange_symbol(symbol: &str) -> String {
    symbol.replace('/', "").to_uppercase()
}

/// Parse the kline array format:
/// `[open_time_ms, "open", "high", "low", "close", "volume", close_time_ms, ...]`
pub fn parse_klines(payload: &Value) -> Result<Vec<Bar>> {
    let rows = payload
        .as_array()
        .context("Klines response is not an array")?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| parse_kline_row(row).with_context(|| format!("Malformed kline {}", i)))
        .collect()
}

fn parse_kline_row(row: &Value) -> Result<Bar> {
    let fields = row.as_array().context("kline is not an array")?;
    if fields.len() < 6 {
        anyhow::bail!("kline has {} fields, expected at least 6", fields.len());
    }

    let open_time_ms = fields[0].as_i64().context("open time is not an integer")?;
    let timestamp = Utc
        .timestamp_millis_opt(open_time_ms)
        .single()
        .context("open time out of range")?;

    Ok(Bar {
        timestamp,
        open: number(&fields[1], "open")?,
        high: number(&fields[2], "high")?,
        low: number(&fields[3], "low")?,
        close: number(&fields[4], "close")?,
        volume: number(&fields[5], "volume")?,
    })
}

/// Binance sends prices as strings; accept plain numbers too
fn number(value: &Value, field: &str) -> Result<f64> {
    match value {
        Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("{} is not a number: {}", field, s)),
        Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("{} is not representable as f64", field)),
        other => anyhow::bail!("{} has unexpected type: {}", field, other),
    }
}
