/// Small epsilon added to the average loss so a loss-free window cannot divide by zero
pub const RSI_EPSILON: f64 = 1e-9;

/// RSI reported when there is not enough history
pub const NEUTRAL_RSI: f64 = 50.0;

/// Calculate Relative Strength Index (RSI) at the latest price
///
/// Gains and losses are averaged with a simple rolling mean over the last
/// `period` price changes.
///
/// Values:
/// - RSI > 65: Overbought (sell pressure in the scorer)
/// - RSI < 35: Oversold (buy pressure in the scorer)
///
/// Returns `None` with fewer than `period + 1` prices.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let recent = &changes[changes.len() - period..];

    let avg_gain: f64 = recent.iter().map(|c| c.max(0.0)).sum::<f64>() / period as f64;
    let avg_loss: f64 = recent.iter().map(|c| (-c).max(0.0)).sum::<f64>() / period as f64;

    let rs = avg_gain / (avg_loss + RSI_EPSILON);
    Some(100.0 - (100.0 / (1.0 + rs)))
}

/// RSI with the neutral fallback applied
pub fn rsi_or_neutral(prices: &[f64], period: usize) -> f64 {
    calculate_rsi(prices, period).unwrap_or(NEUTRAL_RSI)
}
