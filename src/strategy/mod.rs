// Signal strategy module
pub mod aggregator;
pub mod engine;
pub mod signals;

use crate::models::{Bar, SymbolAssessment};

pub use aggregator::{AggregatorConfig, SignalAggregator, StrengthCombine, TieBreak};
pub use engine::SignalEngine;
pub use signals::{validate_bars, SeriesError};

/// Base trait for anything that turns a bar series into a recommendation
pub trait Strategy: Send + Sync {
    /// Assess one symbol. `Ok(None)` means no signal this cycle.
    fn assess(&self, symbol: &str, bars: &[Bar]) -> Result<Option<SymbolAssessment>, SeriesError>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum bars required before the strategy is worth running
    fn min_bars_required(&self) -> usize;
}
