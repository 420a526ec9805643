use crate::models::TradeSide;
use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Half-open hour range `[start, end)` in local time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub start: u32,
    pub end: u32,
}

impl HourRange {
    pub fn contains(&self, hour: u32) -> bool {
        self.start <= hour && hour < self.end
    }
}

/// Weekly schedule that biases the trading variant toward buying or selling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingWindow {
    pub utc_offset_hours: i32,
    pub buy_hours: HourRange,
    pub sell_hours: HourRange,
    pub buy_days: Vec<Weekday>,
    pub sell_days: Vec<Weekday>,
}

impl Default for TradingWindow {
    fn default() -> Self {
        Self {
            utc_offset_hours: 3,
            buy_hours: HourRange { start: 5, end: 9 },
            sell_hours: HourRange { start: 15, end: 21 },
            buy_days: vec![Weekday::Mon, Weekday::Tue],
            sell_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

impl TradingWindow {
    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    /// `now` shifted into the window's local time
    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset())
    }

    pub fn is_buy_window(&self, now: DateTime<Utc>) -> bool {
        let local = self.local_time(now);
        self.buy_days.contains(&local.weekday()) && self.buy_hours.contains(local.hour())
    }

    pub fn is_sell_window(&self, now: DateTime<Utc>) -> bool {
        let local = self.local_time(now);
        self.sell_days.contains(&local.weekday()) && self.sell_hours.contains(local.hour())
    }

    /// Active bias at `now`. The buy window wins when both would match.
    pub fn bias(&self, now: DateTime<Utc>) -> Option<TradeSide> {
        if self.is_buy_window(now) {
            Some(TradeSide::Buy)
        } else if self.is_sell_window(now) {
            Some(TradeSide::Sell)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(format!("utc_offset_hours {} out of range", self.utc_offset_hours));
        }
        for (name, range) in [("buy_hours", self.buy_hours), ("sell_hours", self.sell_hours)] {
            if range.start >= range.end || range.end > 24 {
                return Err(format!("{} must satisfy start < end <= 24", name));
            }
        }
        Ok(())
    }
}
