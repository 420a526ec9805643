use super::Notifier;
use crate::models::{Direction, SymbolAssessment, TradeSide};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// `[telegram]` configuration section. Both values must be set to notify.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.token.as_deref(), self.chat_id.as_deref()) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some((token, chat_id))
            }
            _ => None,
        }
    }
}

/// Telegram Bot API notifier
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    token: String,
    chat_id: String,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self> {
        Self::with_base_url(TELEGRAM_API_BASE, token, chat_id)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }

    pub async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await
            .context("Failed to reach Telegram")?;

        let status = response.status();
        let body: TelegramResponse = response
            .json()
            .await
            .with_context(|| format!("Unexpected Telegram response ({})", status))?;

        if !status.is_success() || !body.ok {
            anyhow::bail!(
                "Telegram API error ({}): {}",
                status,
                body.description.unwrap_or_else(|| "no description".to_string())
            );
        }

        tracing::info!("📨 Telegram message sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, assessment: &SymbolAssessment) -> Result<()> {
        self.send_message(&format_message(assessment)).await
    }
}

/// Notifier used when no Telegram credentials are configured
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, assessment: &SymbolAssessment) -> Result<()> {
        tracing::info!("{}", format_message(assessment));
        Ok(())
    }
}

/// Human-readable alert text. Details list the readings that agree with
/// the overall direction, followed by the ones against it.
pub fn format_message(assessment: &SymbolAssessment) -> String {
    let header = match assessment.direction {
        TradeSide::Buy => "📈 Buy Signal for",
        TradeSide::Sell => "📉 Sell Signal for",
    };

    let mut message = format!(
        "{} {}\nTotal Strength: {:.2}%\nDetails:\n",
        header, assessment.symbol, assessment.strength
    );

    let agreeing = Direction::from(assessment.direction);
    let (with, against): (Vec<_>, Vec<_>) = assessment
        .contributing
        .iter()
        .partition(|(_, reading)| reading.direction == agreeing);

    for (name, reading) in with {
        message.push_str(&format!("{}: {:.2}%\n", name, reading.strength));
    }

    // Dissenters count toward the total strength
    if !against.is_empty() {
        message.push_str("Against:\n");
        for (name, reading) in against {
            message.push_str(&format!("{}: {:.2}%\n", name, reading.strength));
        }
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IndicatorReading;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn assessment() -> SymbolAssessment {
        let mut contributing = BTreeMap::new();
        contributing.insert(
            "rsi".to_string(),
            IndicatorReading {
                direction: Direction::Buy,
                strength: 70.0,
                raw_value: 9.0,
            },
        );
        contributing.insert(
            "macd".to_string(),
            IndicatorReading {
                direction: Direction::Buy,
                strength: 90.0,
                raw_value: 0.4,
            },
        );
        contributing.insert(
            "bollinger".to_string(),
            IndicatorReading {
                direction: Direction::Sell,
                strength: 60.0,
                raw_value: 0.2,
            },
        );

        SymbolAssessment {
            symbol: "BTC/USDT".to_string(),
            direction: TradeSide::Buy,
            strength: 220.0 / 3.0,
            contributing,
            price: 42000.0,
            evaluated_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_message() {
        let text = format_message(&assessment());

        assert!(text.starts_with("📈 Buy Signal for BTC/USDT\n"));
        assert!(text.contains("Total Strength: 73.33%"));
        assert!(text.contains("macd: 90.00%\n"));
        assert!(text.contains("rsi: 70.00%\n"));
        assert!(text.ends_with("Against:\nbollinger: 60.00%\n"));
    }

    #[test]
    fn test_format_sell_message() {
        let mut sell = assessment();
        sell.direction = TradeSide::Sell;

        let text = format_message(&sell);
        assert!(text.starts_with("📉 Sell Signal for BTC/USDT"));
        assert!(text.contains("Details:\nbollinger: 60.00%\nAgainst:\n"));
        assert!(text.ends_with("macd: 90.00%\nrsi: 70.00%\n"));
    }

    #[test]
    fn test_unanimous_message_has_no_against_section() {
        let mut unanimous = assessment();
        unanimous.contributing.remove("bollinger");

        assert!(!format_message(&unanimous).contains("Against:"));
    }

    #[tokio::test]
    async fn test_notify_posts_to_send_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bottest-token/sendMessage")
            .match_body(mockito::Matcher::PartialJson(json!({ "chat_id": "42" })))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{}}"#)
            .create_async()
            .await;

        let notifier = TelegramNotifier::with_base_url(server.url(), "test-token", "42").unwrap();
        notifier.notify(&assessment()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notify_surfaces_api_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/botbad/sendMessage")
            .with_status(401)
            .with_body(r#"{"ok":false,"description":"Unauthorized"}"#)
            .create_async()
            .await;

        let notifier = TelegramNotifier::with_base_url(server.url(), "bad", "42").unwrap();
        let err = notifier.notify(&assessment()).await.unwrap_err();

        assert!(err.to_string().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.notify(&assessment()).await.is_ok());
    }
}
