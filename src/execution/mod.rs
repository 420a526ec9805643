// Trading variant: schedule, orders, paper fills and shared per-symbol state
pub mod order;
pub mod paper;
pub mod state;
pub mod trader;
pub mod window;

pub use order::{ExecutionError, OrderConfirmation, OrderRequest, OrderSink};
pub use paper::{LedgerSummary, PaperExchange, TradeLedger};
pub use state::{StatusBoard, SymbolState, SymbolStatus};
pub use trader::{decide, RsiThresholds, TradeDecision, Trader, TradingConfig, Trigger};
pub use window::{HourRange, TradingWindow};
