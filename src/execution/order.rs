use crate::models::TradeSide;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("invalid order price {0}")]
    InvalidPrice(f64),

    #[error("invalid order amount {0}")]
    InvalidAmount(f64),

    #[error("order rejected: {0}")]
    Rejected(String),
}

/// Limit order at a fixed price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: TradeSide,
    pub amount: f64,
    pub price: f64,
}

impl OrderRequest {
    /// Size an order so that `amount * price == notional_usd`
    pub fn sized(
        symbol: impl Into<String>,
        side: TradeSide,
        notional_usd: f64,
        price: f64,
    ) -> Result<Self, ExecutionError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(ExecutionError::InvalidPrice(price));
        }
        let request = Self {
            symbol: symbol.into(),
            side,
            amount: notional_usd / price,
            price,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ExecutionError> {
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(ExecutionError::InvalidPrice(self.price));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ExecutionError::InvalidAmount(self.amount));
        }
        Ok(())
    }

    pub fn notional(&self) -> f64 {
        self.amount * self.price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub request: OrderRequest,
    pub filled_at: DateTime<Utc>,
}

/// Destination for orders produced by the trading variant
#[async_trait]
pub trait OrderSink: Send + Sync {
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, ExecutionError>;
}
