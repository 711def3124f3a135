use crate::models::Candle;

/// Mean volume over the last `period` candles
///
/// Uses every available candle when fewer than `period` exist, so the
/// average is defined as soon as there is one bar.
pub fn calculate_average_volume(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.is_empty() || period == 0 {
        return None;
    }

    let start_idx = candles.len().saturating_sub(period);
    let recent_candles = &candles[start_idx..];

    let total_volume: f64 = recent_candles.iter().map(|c| c.volume).sum();
    Some(total_volume / recent_candles.len() as f64)
}
