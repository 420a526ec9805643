use crate::execution::trader::Trigger;
use crate::models::{SymbolAssessment, TradeSide};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// What the bot last did for a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SymbolStatus {
    Waiting,
    Signal(TradeSide),
    Bought(Trigger),
    Sold(Trigger),
    Error,
}

impl fmt::Display for SymbolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolStatus::Waiting => write!(f, "waiting"),
            SymbolStatus::Signal(side) => write!(f, "{} signal", side),
            SymbolStatus::Bought(trigger) => write!(f, "bought ({})", trigger),
            SymbolStatus::Sold(trigger) => write!(f, "sold ({})", trigger),
            SymbolStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolState {
    pub last_price: Option<f64>,
    pub last_rsi: Option<f64>,
    pub status: SymbolStatus,
    pub last_assessment: Option<SymbolAssessment>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SymbolState {
    fn default() -> Self {
        Self {
            last_price: None,
            last_rsi: None,
            status: SymbolStatus::Waiting,
            last_assessment: None,
            updated_at: None,
        }
    }
}

/// Thread-safe per-symbol state shared by workers and the dashboard
///
/// Cloning yields another handle to the same board.
#[derive(Clone, Default)]
pub struct StatusBoard {
    data: Arc<RwLock<BTreeMap<String, SymbolState>>>,
}

impl StatusBoard {
    /// Create a board with every symbol in the `Waiting` state
    pub fn new<S: AsRef<str>>(symbols: &[S]) -> Self {
        let data = symbols
            .iter()
            .map(|s| (s.as_ref().to_string(), SymbolState::default()))
            .collect();
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Apply `f` to a symbol's state, creating it if missing
    pub fn update<F>(&self, symbol: &str, f: F) -> Result<(), String>
    where
        F: FnOnce(&mut SymbolState),
    {
        let mut data = self.data.write().map_err(|e| e.to_string())?;
        let state = data.entry(symbol.to_string()).or_default();
        f(state);
        state.updated_at = Some(Utc::now());
        Ok(())
    }

    pub fn set_status(&self, symbol: &str, status: SymbolStatus) -> Result<(), String> {
        self.update(symbol, |state| state.status = status)
    }

    pub fn get(&self, symbol: &str) -> Result<Option<SymbolState>, String> {
        let data = self.data.read().map_err(|e| e.to_string())?;
        Ok(data.get(symbol).cloned())
    }

    /// Every tracked symbol, sorted by name
    pub fn snapshot(&self) -> Result<BTreeMap<String, SymbolState>, String> {
        let data = self.data.read().map_err(|e| e.to_string())?;
        Ok(data.clone())
    }

    pub fn symbols(&self) -> Result<Vec<String>, String> {
        let data = self.data.read().map_err(|e| e.to_string())?;
        Ok(data.keys().cloned().collect())
    }
}
