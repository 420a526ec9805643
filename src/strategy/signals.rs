use crate::models::Bar;
use thiserror::Error;

/// Malformed bar input. Distinct from "no signal", which is never an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("bars are not sorted by timestamp (index {index})")]
    Unsorted { index: usize },

    #[error("duplicate timestamp at index {index}")]
    DuplicateTimestamp { index: usize },

    #[error("invalid value in bar {index}: {field} = {value}")]
    InvalidValue {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("bar {index} has high {high} below low {low}")]
    HighBelowLow { index: usize, high: f64, low: f64 },

    #[error("data gap detected: {gap_secs}s after bar {index} (expected ~{expected_secs}s)")]
    Gap {
        index: usize,
        gap_secs: i64,
        expected_secs: u64,
    },
}

/// Validate the shape of a bar series before any indicator sees it
///
/// # Arguments
/// * `bars` - The bars to validate, oldest first
/// * `expected_interval_secs` - When given, also reject gaps larger than 1.5x this interval
pub fn validate_bars(bars: &[Bar], expected_interval_secs: Option<u64>) -> Result<(), SeriesError> {
    for (index, bar) in bars.iter().enumerate() {
        let fields = [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
            ("volume", bar.volume),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(SeriesError::InvalidValue {
                    index,
                    field,
                    value,
                });
            }
        }

        if bar.high < bar.low {
            return Err(SeriesError::HighBelowLow {
                index,
                high: bar.high,
                low: bar.low,
            });
        }
    }

    // Allow 50% tolerance for slight timing variations
    let max_gap_secs = expected_interval_secs.map(|secs| secs + secs / 2);

    for (index, window) in bars.windows(2).enumerate() {
        let time_diff = (window[1].timestamp - window[0].timestamp).num_seconds();

        if window[1].timestamp < window[0].timestamp {
            return Err(SeriesError::Unsorted { index: index + 1 });
        }
        if window[1].timestamp == window[0].timestamp {
            return Err(SeriesError::DuplicateTimestamp { index: index + 1 });
        }

        if let (Some(max_gap), Some(expected)) = (max_gap_secs, expected_interval_secs) {
            if time_diff as u64 > max_gap {
                return Err(SeriesError::Gap {
                    index,
                    gap_secs: time_diff,
                    expected_secs: expected,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn create_test_bar(minutes_ago: i64) -> Bar {
        Bar {
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_uniform_bars_pass() {
        let bars = vec![create_test_bar(10), create_test_bar(5), create_test_bar(0)];
        assert!(validate_bars(&bars, Some(300)).is_ok());
    }

    #[test]
    fn test_empty_and_single_bar_pass() {
        assert!(validate_bars(&[], Some(300)).is_ok());
        assert!(validate_bars(&[create_test_bar(0)], Some(300)).is_ok());
    }

    #[test]
    fn test_unsorted_bars_fail() {
        let bars = vec![create_test_bar(0), create_test_bar(5)];
        assert_eq!(
            validate_bars(&bars, None),
            Err(SeriesError::Unsorted { index: 1 })
        );
    }

    #[test]
    fn test_duplicate_timestamp_fails() {
        let bar = create_test_bar(5);
        let bars = vec![bar.clone(), bar];
        assert_eq!(
            validate_bars(&bars, None),
            Err(SeriesError::DuplicateTimestamp { index: 1 })
        );
    }

    #[test]
    fn test_gap_detected() {
        let bars = vec![create_test_bar(30), create_test_bar(5), create_test_bar(0)];
        let err = validate_bars(&bars, Some(300)).unwrap_err();
        assert!(matches!(err, SeriesError::Gap { index: 0, .. }));
        assert!(err.to_string().contains("data gap detected"));

        // Without an expected interval, gaps are allowed
        assert!(validate_bars(&bars, None).is_ok());
    }

    #[test]
    fn test_small_variation_allowed() {
        // 7 minutes on a 5 minute interval is inside the 1.5x tolerance
        let bars = vec![create_test_bar(12), create_test_bar(5), create_test_bar(0)];
        assert!(validate_bars(&bars, Some(300)).is_ok());
    }

    #[test]
    fn test_nan_close_fails() {
        let mut bar = create_test_bar(0);
        bar.close = f64::NAN;
        assert!(matches!(
            validate_bars(&[bar], None),
            Err(SeriesError::InvalidValue { field: "close", .. })
        ));
    }

    #[test]
    fn test_high_below_low_fails() {
        let mut bar = create_test_bar(0);
        bar.high = 98.0;
        assert!(matches!(
            validate_bars(&[bar], None),
            Err(SeriesError::HighBelowLow { index: 0, .. })
        ));
    }
}
