use super::{IndicatorScorer, ScoreBreakdown, ScoringConfig};
use crate::models::{Action, Candle};

/// Turns the indicator score into a buy/sell/hold action
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    scorer: IndicatorScorer,
    threshold: i32,
}

impl DecisionEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            threshold: config.score_threshold,
            scorer: IndicatorScorer::new(config),
        }
    }

    /// Feed a finalized candle into the rolling window
    pub fn update(&mut self, candle: Candle) {
        self.scorer.update(candle);
    }

    /// Map a score to an action; the threshold itself is inclusive
    pub fn classify(&self, score: i32) -> Action {
        if score >= self.threshold {
            Action::Buy
        } else if score <= -self.threshold {
            Action::Sell
        } else {
            Action::Hold
        }
    }

    /// Current (action, score); pure over the window state
    pub fn decide(&self) -> (Action, i32) {
        let breakdown = self.scorer.breakdown();
        let score = breakdown.total();
        let action = self.classify(score);

        match action {
            Action::Buy => tracing::debug!(score, rsi = breakdown.rsi, "Buy signal detected"),
            Action::Sell => tracing::debug!(score, rsi = breakdown.rsi, "Sell signal detected"),
            Action::Hold => {}
        }

        (action, score)
    }

    pub fn breakdown(&self) -> ScoreBreakdown {
        self.scorer.breakdown()
    }

    pub fn scorer(&self) -> &IndicatorScorer {
        &self.scorer
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}
