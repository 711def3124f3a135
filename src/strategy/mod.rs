// Trading strategy module
pub mod decision;
pub mod scorer;

pub use decision::DecisionEngine;
pub use scorer::{score_candles, IndicatorScorer, ScoreBreakdown};

/// Configuration for candle scoring and decision thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub rsi_period: usize,
    pub score_threshold: i32, // |score| needed to act
    pub window_capacity: usize,
    pub volume_period: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            score_threshold: 60,
            window_capacity: 100,
            volume_period: 10,
        }
    }
}

impl ScoringConfig {
    /// Minimum candles before the score is anything but neutral
    pub fn min_candles_required(&self) -> usize {
        self.rsi_period + 1
    }
}
