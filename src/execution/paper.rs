use super::order::{ExecutionError, OrderConfirmation, OrderRequest, OrderSink};
use crate::models::{TradeRecord, TradeSide};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const DEFAULT_STARTING_BALANCE: f64 = 9.85;
pub const DEFAULT_TRADE_AMOUNT_USD: f64 = 3.0;
pub const MAX_TRADE_HISTORY: usize = 50;

/// Running USDT balance, realized profit and recent trades
#[derive(Debug, Clone)]
pub struct TradeLedger {
    balance_usdt: f64,
    profits_usdt: f64,
    trade_amount_usd: f64,
    history: VecDeque<TradeRecord>,
    max_history: usize,
}

/// Snapshot for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub balance_usdt: f64,
    pub profits_usdt: f64,
    pub trade_amount_usd: f64,
    pub trade_count: usize,
    pub recent_trades: Vec<TradeRecord>,
}

impl TradeLedger {
    pub fn new(starting_balance: f64, trade_amount_usd: f64) -> Self {
        Self {
            balance_usdt: starting_balance,
            profits_usdt: 0.0,
            trade_amount_usd,
            history: VecDeque::new(),
            max_history: MAX_TRADE_HISTORY,
        }
    }

    pub fn shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    pub fn balance(&self) -> f64 {
        self.balance_usdt
    }

    pub fn profits(&self) -> f64 {
        self.profits_usdt
    }

    pub fn trade_amount(&self) -> f64 {
        self.trade_amount_usd
    }

    /// Oldest first
    pub fn history(&self) -> impl Iterator<Item = &TradeRecord> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Book a filled order
    ///
    /// Buys debit the trade amount. Sells credit it back and realize
    /// `price * amount - trade_amount` as profit.
    pub fn record(&mut self, confirmation: &OrderConfirmation) -> TradeRecord {
        let order = &confirmation.request;

        match order.side {
            TradeSide::Buy => {
                self.balance_usdt -= self.trade_amount_usd;
            }
            TradeSide::Sell => {
                let profit = order.notional() - self.trade_amount_usd;
                self.balance_usdt += self.trade_amount_usd;
                self.profits_usdt += profit;
            }
        }

        let record = TradeRecord {
            id: confirmation.order_id,
            symbol: order.symbol.clone(),
            side: order.side,
            price: order.price,
            amount: order.amount,
            timestamp: confirmation.filled_at,
        };

        self.history.push_back(record.clone());
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }

        record
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            balance_usdt: self.balance_usdt,
            profits_usdt: self.profits_usdt,
            trade_amount_usd: self.trade_amount_usd,
            trade_count: self.history.len(),
            recent_trades: self.history.iter().rev().cloned().collect(),
        }
    }
}

impl Default for TradeLedger {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_BALANCE, DEFAULT_TRADE_AMOUNT_USD)
    }
}

/// Order sink that fills every valid limit order at its own price
#[derive(Clone, Default)]
pub struct PaperExchange {
    orders: Arc<Mutex<Vec<OrderConfirmation>>>,
}

impl PaperExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every order filled so far
    pub fn orders(&self) -> Vec<OrderConfirmation> {
        self.orders
            .lock()
            .map(|orders| orders.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl OrderSink for PaperExchange {
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, ExecutionError> {
        order.validate()?;

        let confirmation = OrderConfirmation {
            order_id: Uuid::new_v4(),
            request: order.clone(),
            filled_at: Utc::now(),
        };

        self.orders
            .lock()
            .map_err(|e| ExecutionError::Rejected(e.to_string()))?
            .push(confirmation.clone());

        tracing::info!(
            "📝 Paper {} {:.6} {} @ {:.4}",
            order.side,
            order.amount,
            order.symbol,
            order.price
        );

        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirm(side: TradeSide, price: f64) -> OrderConfirmation {
        OrderConfirmation {
            order_id: Uuid::new_v4(),
            request: OrderRequest::sized("ETH/USDT", side, DEFAULT_TRADE_AMOUNT_USD, price).unwrap(),
            filled_at: Utc::now(),
        }
    }

    #[test]
    fn test_buy_debits_balance() {
        let mut ledger = TradeLedger::default();
        ledger.record(&confirm(TradeSide::Buy, 2000.0));

        assert!((ledger.balance() - 6.85).abs() < 1e-9);
        assert_eq!(ledger.profits(), 0.0);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_sell_credits_and_books_profit() {
        let mut ledger = TradeLedger::default();
        ledger.record(&confirm(TradeSide::Buy, 2000.0));
        ledger.record(&confirm(TradeSide::Sell, 2200.0));

        assert!((ledger.balance() - 9.85).abs() < 1e-9);
        // Amount is sized at the sell price, so notional equals the trade amount
        assert!(ledger.profits().abs() < 1e-9);
    }

    #[test]
    fn test_sell_profit_uses_order_notional() {
        let mut ledger = TradeLedger::default();
        let confirmation = OrderConfirmation {
            order_id: Uuid::new_v4(),
            request: OrderRequest {
                symbol: "BTC/USDT".to_string(),
                side: TradeSide::Sell,
                amount: 0.0001,
                price: 40_000.0,
            },
            filled_at: Utc::now(),
        };
        ledger.record(&confirmation);

        assert!((ledger.profits() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_keeps_last_fifty() {
        let mut ledger = TradeLedger::new(1_000.0, 3.0);
        for i in 0..60 {
            ledger.record(&confirm(TradeSide::Buy, 100.0 + i as f64));
        }

        assert_eq!(ledger.len(), MAX_TRADE_HISTORY);
        assert_eq!(ledger.history().next().unwrap().price, 110.0);

        let summary = ledger.summary();
        assert_eq!(summary.trade_count, 50);
        assert_eq!(summary.recent_trades[0].price, 159.0);
    }

    #[tokio::test]
    async fn test_paper_exchange_fills_valid_orders() {
        let exchange = PaperExchange::new();
        let order = OrderRequest::sized("BTC/USDT", TradeSide::Buy, 3.0, 50_000.0).unwrap();

        let confirmation = exchange.place_order(&order).await.unwrap();
        assert_eq!(confirmation.request, order);
        assert_eq!(exchange.orders().len(), 1);
    }

    #[test]
    fn test_paper_exchange_rejects_invalid_orders() {
        let exchange = PaperExchange::new();
        let order = OrderRequest {
            symbol: "BTC/USDT".to_string(),
            side: TradeSide::Buy,
            amount: f64::NAN,
            price: 50_000.0,
        };

        assert!(matches!(
            tokio_test::block_on(exchange.place_order(&order)),
            Err(ExecutionError::InvalidAmount(_))
        ));
        assert!(exchange.orders().is_empty());
    }
}
