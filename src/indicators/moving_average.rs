/// Calculate Simple Moving Average (SMA) of the last `period` values
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Calculate Exponential Moving Average (EMA) at the last value
pub fn calculate_ema(prices: &[f64], period: usize) -> Option<f64> {
    calculate_ema_series(prices, period).last().copied()
}

/// EMA for every index from `period - 1` onwards, seeded with the SMA of the first window
///
/// Returned values align with `prices[period - 1..]`.
pub fn calculate_ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);

    let seed = prices[..period].iter().sum::<f64>() / period as f64;
    let mut series = Vec::with_capacity(prices.len() - period + 1);
    series.push(seed);

    let mut ema = seed;
    for price in &prices[period..] {
        ema = (price - ema) * multiplier + ema;
        series.push(ema);
    }

    series
}

/// Population standard deviation of the last `period` values
pub fn calculate_std_dev(prices: &[f64], period: usize) -> Option<f64> {
    let mean = calculate_sma(prices, period)?;
    let variance = prices
        .iter()
        .rev()
        .take(period)
        .map(|p| (p - mean).powi(2))
        .sum::<f64>()
        / period as f64;
    Some(variance.sqrt())
}
